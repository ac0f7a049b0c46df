use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
/// Enumerates supported `CompletionError` values.
pub enum CompletionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("provider error: {0}")]
    Provider(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Single-shot prompt to text capability.
///
/// Every call is an independent request; no conversation state is carried
/// between calls.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
