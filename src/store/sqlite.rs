use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::config::AppPaths;
use crate::core::errors::AssistantError;

use super::{ChunkSearchResult, CorpusStats, StoredChunk, VectorStore};

/// SQLite-backed corpus index.
///
/// Chunk text and metadata live in one table, with embeddings serialized as
/// little-endian f32 blobs and scored by brute-force cosine similarity.
/// Plenty for a personal corpus; no external vector server required.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open the store at the default index location.
    pub async fn new(paths: &AppPaths) -> Result<Self, AssistantError> {
        Self::with_path(paths.index_path.clone()).await
    }

    /// Open with a custom path (used by tests).
    pub async fn with_path(db_path: PathBuf) -> Result<Self, AssistantError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(AssistantError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), AssistantError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS corpus_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                content_type TEXT NOT NULL DEFAULT 'general',
                tags TEXT NOT NULL DEFAULT '[]',
                source_file TEXT NOT NULL DEFAULT '',
                chunk_index INTEGER NOT NULL DEFAULT 0,
                word_count INTEGER NOT NULL DEFAULT 0,
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(AssistantError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_corpus_source ON corpus_chunks(source_file)",
        )
        .execute(&self.pool)
        .await
        .map_err(AssistantError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_corpus_type ON corpus_chunks(content_type)",
        )
        .execute(&self.pool)
        .await
        .map_err(AssistantError::internal)?;

        Ok(())
    }

    /// Serialize embedding to bytes (little-endian f32).
    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let tags_str: String = row.get("tags");
        let tags: Vec<String> = serde_json::from_str(&tags_str).unwrap_or_default();
        let chunk_index: i64 = row.get("chunk_index");
        let word_count: i64 = row.get("word_count");

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            title: row.get("title"),
            content_type: row.get("content_type"),
            tags,
            source_file: row.get("source_file"),
            chunk_index: chunk_index as usize,
            word_count: word_count as usize,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), AssistantError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(AssistantError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let tags_str =
                serde_json::to_string(&chunk.tags).map_err(AssistantError::internal)?;

            sqlx::query(
                "INSERT OR REPLACE INTO corpus_chunks
                 (chunk_id, content, title, content_type, tags, source_file, chunk_index, word_count, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.title)
            .bind(&chunk.content_type)
            .bind(&tags_str)
            .bind(&chunk.source_file)
            .bind(chunk.chunk_index as i64)
            .bind(chunk.word_count as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(AssistantError::internal)?;
        }

        tx.commit().await.map_err(AssistantError::internal)?;
        tracing::debug!("Indexed {} chunks", items.len());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        content_type: Option<&str>,
    ) -> Result<Vec<ChunkSearchResult>, AssistantError> {
        let rows = if let Some(kind) = content_type {
            sqlx::query(
                "SELECT chunk_id, content, title, content_type, tags, source_file, chunk_index, word_count, embedding
                 FROM corpus_chunks WHERE content_type = ?1",
            )
            .bind(kind)
            .fetch_all(&self.pool)
            .await
            .map_err(AssistantError::internal)?
        } else {
            sqlx::query(
                "SELECT chunk_id, content, title, content_type, tags, source_file, chunk_index, word_count, embedding
                 FROM corpus_chunks",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(AssistantError::internal)?
        };

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn delete_source(&self, source_file: &str) -> Result<usize, AssistantError> {
        let result = sqlx::query("DELETE FROM corpus_chunks WHERE source_file = ?1")
            .bind(source_file)
            .execute(&self.pool)
            .await
            .map_err(AssistantError::internal)?;

        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize, AssistantError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM corpus_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(AssistantError::internal)?;

        Ok(count as usize)
    }

    async fn stats(&self) -> Result<CorpusStats, AssistantError> {
        let total_chunks = self.count().await?;

        let source_files: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT source_file) FROM corpus_chunks")
                .fetch_one(&self.pool)
                .await
                .map_err(AssistantError::internal)?;

        let rows = sqlx::query(
            "SELECT content_type, COUNT(*) as n FROM corpus_chunks GROUP BY content_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AssistantError::internal)?;

        let mut chunks_by_type = BTreeMap::new();
        for row in rows {
            let kind: String = row.get("content_type");
            let n: i64 = row.get("n");
            chunks_by_type.insert(kind, n as usize);
        }

        Ok(CorpusStats {
            total_chunks,
            source_files: source_files as usize,
            chunks_by_type,
        })
    }

    async fn export(&self) -> Result<Vec<StoredChunk>, AssistantError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, title, content_type, tags, source_file, chunk_index, word_count
             FROM corpus_chunks ORDER BY source_file, chunk_index",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AssistantError::internal)?;

        Ok(rows.iter().map(Self::row_to_chunk).collect())
    }

    async fn clear(&self) -> Result<(), AssistantError> {
        sqlx::query("DELETE FROM corpus_chunks")
            .execute(&self.pool)
            .await
            .map_err(AssistantError::internal)?;

        tracing::info!("Cleared corpus index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteVectorStore {
        let tmp = std::env::temp_dir().join(format!(
            "quillwright-index-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteVectorStore::with_path(tmp).await.unwrap()
    }

    fn chunk(id: &str, content_type: &str, source: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: format!("content of {}", id),
            title: "Test".to_string(),
            content_type: content_type.to_string(),
            tags: vec!["tag".to_string()],
            source_file: source.to_string(),
            chunk_index: 0,
            word_count: 3,
        }
    }

    #[tokio::test]
    async fn insert_and_search() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (chunk("c1", "essay", "a.txt"), vec![1.0, 0.0, 0.0]),
                (chunk("c2", "essay", "a.txt"), vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert!(results[0].score > 0.99);
        assert!(results[1].score < 0.01);
    }

    #[tokio::test]
    async fn content_type_filter() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (chunk("c1", "essay", "a.txt"), vec![1.0, 0.0]),
                (chunk("c2", "podcast", "b.txt"), vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store
            .search(&[1.0, 0.0], 10, Some("podcast"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "c2");
    }

    #[tokio::test]
    async fn delete_source_removes_its_chunks() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (chunk("c1", "essay", "a.txt"), vec![1.0]),
                (chunk("c2", "essay", "a.txt"), vec![1.0]),
                (chunk("c3", "essay", "b.txt"), vec![1.0]),
            ])
            .await
            .unwrap();

        let deleted = store.delete_source("a.txt").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stats_group_by_content_type() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (chunk("c1", "essay", "a.txt"), vec![1.0]),
                (chunk("c2", "essay", "b.txt"), vec![1.0]),
                (chunk("c3", "reflection", "c.txt"), vec![1.0]),
            ])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.source_files, 3);
        assert_eq!(stats.chunks_by_type.get("essay"), Some(&2));
        assert_eq!(stats.chunks_by_type.get("reflection"), Some(&1));
    }

    #[tokio::test]
    async fn export_preserves_metadata_and_order() {
        let store = test_store().await;

        let mut second = chunk("c2", "essay", "a.txt");
        second.chunk_index = 1;
        store
            .insert_batch(vec![
                (second, vec![1.0]),
                (chunk("c1", "essay", "a.txt"), vec![1.0]),
            ])
            .await
            .unwrap();

        let exported = store.export().await.unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].chunk_id, "c1");
        assert_eq!(exported[1].chunk_id, "c2");
        assert_eq!(exported[0].tags, vec!["tag"]);
    }

    #[tokio::test]
    async fn clear_empties_index() {
        let store = test_store().await;

        store
            .insert_batch(vec![(chunk("c1", "essay", "a.txt"), vec![1.0])])
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
