use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AssistantError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        AssistantError::Internal(err.to_string())
    }

    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        AssistantError::Provider(err.to_string())
    }
}
