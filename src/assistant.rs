//! The assistant orchestrator: wires corpus processing, embeddings, the
//! vector store, and the language model into the ingest → retrieve →
//! generate flow.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::config::service::AssistantConfig;
use crate::core::config::ConfigService;
use crate::core::errors::AssistantError;
use crate::corpus::{CorpusChunk, CorpusProcessor};
use crate::embeddings::{EmbeddingProvider, OpenAiEmbeddings};
use crate::llm::{AnthropicChat, LlmProvider, OpenAiChat};
use crate::prompt;
use crate::store::{ChunkSearchResult, CorpusStats, SqliteVectorStore, StoredChunk, VectorStore};

/// Serialized corpus snapshot written by `export_state`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    pub exported_at: String,
    pub embedding_model: String,
    pub chunks: Vec<StoredChunk>,
}

pub struct WritingAssistant {
    processor: CorpusProcessor,
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    config: AssistantConfig,
}

impl WritingAssistant {
    /// Assemble an assistant from explicit components (tests use this with
    /// stub providers).
    pub fn new(
        processor: CorpusProcessor,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            processor,
            embeddings,
            store,
            llm,
            config,
        }
    }

    /// Assemble the production assistant from the loaded configuration.
    pub async fn from_config(config_service: &ConfigService) -> Result<Self, AssistantError> {
        let config = config_service.load();

        let openai_key = config_service.api_key("openai");
        let embed_key = openai_key.clone().ok_or_else(|| {
            AssistantError::BadRequest(
                "no OpenAI API key configured (set OPENAI_API_KEY or add openai_api_key to secrets.yaml)"
                    .to_string(),
            )
        })?;

        let embeddings = Arc::new(OpenAiEmbeddings::new(
            config.embedding.base_url.clone(),
            embed_key,
            config.embedding.model.clone(),
            config.embedding.dimensions,
        ));

        let llm: Arc<dyn LlmProvider> = match config.llm.provider.as_str() {
            "openai" => {
                let key = openai_key.ok_or_else(|| {
                    AssistantError::BadRequest("no OpenAI API key configured".to_string())
                })?;
                let base_url = config
                    .llm
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com".to_string());
                Arc::new(OpenAiChat::new(base_url, key, config.llm.model.clone()))
            }
            "anthropic" => {
                let key = config_service.api_key("anthropic").ok_or_else(|| {
                    AssistantError::BadRequest(
                        "no Anthropic API key configured (set ANTHROPIC_API_KEY or add anthropic_api_key to secrets.yaml)"
                            .to_string(),
                    )
                })?;
                Arc::new(AnthropicChat::new(
                    config.llm.base_url.clone(),
                    key,
                    config.llm.model.clone(),
                ))
            }
            other => {
                return Err(AssistantError::BadRequest(format!(
                    "unsupported llm provider: {}",
                    other
                )))
            }
        };

        let store = Arc::new(SqliteVectorStore::new(config_service.paths()).await?);
        let processor = CorpusProcessor::new(config.chunking.clone().into());

        tracing::info!(
            "Assistant ready (embedding={}, llm={}/{})",
            config.embedding.model,
            config.llm.provider,
            config.llm.model
        );

        Ok(Self::new(processor, embeddings, store, llm, config))
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Ingest every `.txt` file in a directory. With `reprocess`, the index
    /// is cleared first; otherwise each file replaces its previous chunks.
    /// Returns the number of chunks indexed.
    pub async fn ingest_directory(
        &self,
        dir: &Path,
        reprocess: bool,
    ) -> Result<usize, AssistantError> {
        if reprocess {
            self.store.clear().await?;
        } else {
            // Replace from the discovered file list, not from the chunks
            // produced: a file that now yields zero chunks still sheds its
            // previously indexed ones.
            for path in self.processor.discover_files(dir)? {
                if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                    self.store.delete_source(filename).await?;
                }
            }
        }

        let chunks = self.processor.process_directory(dir)?;
        if chunks.is_empty() {
            tracing::warn!("No chunks produced from {}", dir.display());
            return Ok(0);
        }

        self.index_chunks(chunks).await
    }

    /// Ingest a single file, replacing any chunks it previously produced.
    pub async fn add_file(&self, path: &Path) -> Result<usize, AssistantError> {
        let chunks = self.processor.process_file(path)?;
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            self.store.delete_source(filename).await?;
        }
        self.index_chunks(chunks).await
    }

    /// Embed and index a chunk batch.
    async fn index_chunks(&self, chunks: Vec<CorpusChunk>) -> Result<usize, AssistantError> {
        let total = chunks.len();
        let batch_size = self.config.embedding.batch_size.max(1);

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embeddings.embed(&texts).await?;

            let items = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| (stored_from_corpus(chunk), vector))
                .collect();
            self.store.insert_batch(items).await?;
        }

        tracing::info!("Indexed {} chunks", total);
        Ok(total)
    }

    /// Embed the query and return the most similar chunks.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
        content_type: Option<&str>,
    ) -> Result<Vec<ChunkSearchResult>, AssistantError> {
        let limit = top_k.unwrap_or(self.config.retrieval.top_k);
        let query_vectors = self.embeddings.embed(&[query.to_string()]).await?;
        let query_embedding = query_vectors
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Provider("empty query embedding".to_string()))?;

        self.store.search(&query_embedding, limit, content_type).await
    }

    /// Generate content in the user's voice.
    ///
    /// Explicit `style_adjustments` win over inline `make this ...`
    /// directives found in the query.
    pub async fn generate(
        &self,
        query: &str,
        style_adjustments: Option<&str>,
        top_k: Option<usize>,
        content_type: Option<&str>,
    ) -> Result<String, AssistantError> {
        let request = self
            .build_generation_request(query, style_adjustments, top_k, content_type)
            .await?;
        let content = self.llm.chat(request).await?;
        tracing::info!("Generated {} chars for query", content.len());
        Ok(content)
    }

    /// Streaming variant of [`generate`](Self::generate).
    pub async fn generate_streaming(
        &self,
        query: &str,
        style_adjustments: Option<&str>,
        top_k: Option<usize>,
        content_type: Option<&str>,
    ) -> Result<mpsc::Receiver<Result<String, AssistantError>>, AssistantError> {
        let request = self
            .build_generation_request(query, style_adjustments, top_k, content_type)
            .await?;
        self.llm.stream_chat(request).await
    }

    async fn build_generation_request(
        &self,
        query: &str,
        style_adjustments: Option<&str>,
        top_k: Option<usize>,
        content_type: Option<&str>,
    ) -> Result<crate::llm::ChatRequest, AssistantError> {
        let results = self.retrieve(query, top_k, content_type).await?;
        if results.is_empty() {
            tracing::warn!("No corpus examples retrieved; generating without style context");
        }

        let inline = prompt::extract_style_guidance(query);
        let guidance = style_adjustments
            .map(|s| s.to_string())
            .or(inline);

        let request = prompt::build_request(query, &results, guidance.as_deref())
            .with_temperature(self.config.llm.temperature)
            .with_max_tokens(self.config.llm.max_tokens);
        Ok(request)
    }

    pub async fn stats(&self) -> Result<CorpusStats, AssistantError> {
        self.store.stats().await
    }

    pub async fn clear(&self) -> Result<(), AssistantError> {
        self.store.clear().await
    }

    /// Write a JSON snapshot of the indexed corpus (without vectors).
    pub async fn export_state(&self, path: &Path) -> Result<usize, AssistantError> {
        let chunks = self.store.export().await?;
        let snapshot = CorpusSnapshot {
            exported_at: Utc::now().to_rfc3339(),
            embedding_model: self.config.embedding.model.clone(),
            chunks,
        };

        let json = serde_json::to_string_pretty(&snapshot).map_err(AssistantError::internal)?;
        std::fs::write(path, json).map_err(AssistantError::internal)?;

        tracing::info!(
            "Exported {} chunks to {}",
            snapshot.chunks.len(),
            path.display()
        );
        Ok(snapshot.chunks.len())
    }

    /// Load a snapshot, re-embed its chunks, and replace the index.
    pub async fn import_state(&self, path: &Path) -> Result<usize, AssistantError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssistantError::NotFound(format!("snapshot {}", path.display()))
            } else {
                AssistantError::internal(e)
            }
        })?;
        let snapshot: CorpusSnapshot = serde_json::from_str(&json).map_err(|e| {
            AssistantError::BadRequest(format!("invalid snapshot {}: {}", path.display(), e))
        })?;

        if snapshot.embedding_model != self.config.embedding.model {
            tracing::warn!(
                "Snapshot was embedded with {}, re-embedding with {}",
                snapshot.embedding_model,
                self.config.embedding.model
            );
        }

        self.store.clear().await?;

        let total = snapshot.chunks.len();
        let batch_size = self.config.embedding.batch_size.max(1);
        for batch in snapshot.chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embeddings.embed(&texts).await?;
            let items = batch.iter().cloned().zip(vectors).collect();
            self.store.insert_batch(items).await?;
        }

        tracing::info!("Imported {} chunks from {}", total, path.display());
        Ok(total)
    }
}

fn stored_from_corpus(chunk: &CorpusChunk) -> StoredChunk {
    StoredChunk {
        chunk_id: Uuid::new_v4().to_string(),
        content: chunk.text.clone(),
        title: chunk.metadata.title.clone(),
        content_type: chunk.metadata.content_type.as_str().to_string(),
        tags: chunk.metadata.tags.clone(),
        source_file: chunk.metadata.source_file.clone(),
        chunk_index: chunk.chunk_index,
        word_count: chunk.word_count,
    }
}

impl From<crate::core::config::service::ChunkingConfig> for crate::corpus::ChunkerConfig {
    fn from(value: crate::core::config::service::ChunkingConfig) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
        }
    }
}
