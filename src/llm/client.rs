//! Core model trait and error type

use async_trait::async_trait;

use super::response::Response;

/// A language model that turns a rendered prompt into a lazy text stream
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model id as the user selected it (e.g. `llama3.2:latest`, `mock`)
    fn model_id(&self) -> &str;

    /// Send the prompt. The returned response has not been read yet.
    async fn prompt(&self, text: &str) -> Result<Response, LlmError>;
}

/// Errors that can occur while talking to a model
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },

    #[error("Event source error: {0}")]
    EventSource(String),
}
