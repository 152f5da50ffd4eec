use async_trait::async_trait;

use crate::core::errors::AssistantError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// generate one embedding per input text, in order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AssistantError>;

    /// dimensionality of the vectors this provider produces
    fn dimensions(&self) -> usize;
}
