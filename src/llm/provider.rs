use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::errors::AssistantError;

use super::types::ChatRequest;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai", "anthropic")
    fn name(&self) -> &str;

    /// check if the provider is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool, AssistantError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, AssistantError>;

    /// chat completion (streaming)
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, AssistantError>>, AssistantError>;
}
