//! Quillwright — a personal writing-style RAG assistant.
//!
//! Ingests a user's `.txt` corpus, indexes it for semantic search, and
//! generates new text in the user's voice by conditioning a hosted language
//! model on retrieved passages.

pub mod assistant;
pub mod core;
pub mod corpus;
pub mod embeddings;
pub mod llm;
pub mod prompt;
pub mod store;

pub use crate::assistant::WritingAssistant;
pub use crate::core::config::{AppPaths, ConfigService};
pub use crate::core::errors::AssistantError;
