//! Embedding provider seam. The production implementation calls an
//! OpenAI-compatible `/v1/embeddings` endpoint.

mod openai;
mod provider;

pub use openai::OpenAiEmbeddings;
pub use provider::EmbeddingProvider;
