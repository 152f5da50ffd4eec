//! Language model adapters. Generation goes through the `LlmProvider`
//! trait; OpenAI and Anthropic implementations ship with the crate.

mod anthropic;
mod openai;
mod provider;
mod types;

pub use anthropic::AnthropicChat;
pub use openai::OpenAiChat;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};
