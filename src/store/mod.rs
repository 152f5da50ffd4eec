//! VectorStore trait — abstract interface for the corpus index.
//!
//! The production implementation is `SqliteVectorStore`: chunk text and
//! metadata in SQLite with brute-force cosine search over stored vectors.

mod sqlite;

pub use sqlite::SqliteVectorStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::AssistantError;

/// A chunk as persisted in the corpus index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Document title from the filename.
    pub title: String,
    /// Content type label ("essay", "reflection", ...).
    pub content_type: String,
    /// Tags from the filename tag block.
    pub tags: Vec<String>,
    /// File the chunk came from.
    pub source_file: String,
    /// Position of the chunk within its source.
    pub chunk_index: usize,
    pub word_count: usize,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Aggregate corpus statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_chunks: usize,
    pub source_files: usize,
    pub chunks_by_type: BTreeMap<String, usize>,
}

/// Abstract interface over the corpus index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks with their embedding vectors.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), AssistantError>;

    /// Search for chunks similar to the query embedding, optionally
    /// restricted to one content type.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        content_type: Option<&str>,
    ) -> Result<Vec<ChunkSearchResult>, AssistantError>;

    /// Delete all chunks belonging to a source file. Returns the count.
    async fn delete_source(&self, source_file: &str) -> Result<usize, AssistantError>;

    /// Total stored chunk count.
    async fn count(&self) -> Result<usize, AssistantError>;

    /// Corpus statistics grouped by content type.
    async fn stats(&self) -> Result<CorpusStats, AssistantError>;

    /// Snapshot of all stored chunks, without vectors.
    async fn export(&self) -> Result<Vec<StoredChunk>, AssistantError>;

    /// Drop all chunks. Used when the embedding model changes and stored
    /// vectors are invalidated.
    async fn clear(&self) -> Result<(), AssistantError>;
}
