//! Corpus ingestion: reading text files, extracting filename metadata,
//! and splitting content into paragraph-aligned chunks.

mod chunker;
mod metadata;
mod processor;

pub use chunker::{chunk_text, ChunkerConfig};
pub use metadata::{metadata_from_filename, ContentType, DocumentMetadata};
pub use processor::CorpusProcessor;

use serde::{Deserialize, Serialize};

/// A chunk of corpus text with its document metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusChunk {
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Sequential index of the chunk within its source document.
    pub chunk_index: usize,
    pub word_count: usize,
}
