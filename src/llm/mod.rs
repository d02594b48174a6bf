//! Model Client Layer - streaming text generation behind one trait
//!
//! This module provides:
//! - LanguageModel trait for backend abstraction
//! - Response, a lazy handle over the streamed text
//! - Ollama, Anthropic and mock backends
//! - Model id routing to a backend

pub mod anthropic;
pub mod client;
pub mod mock;
pub mod ollama;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

pub use anthropic::AnthropicClient;
pub use client::{LanguageModel, LlmError};
pub use mock::{MOCK_MODEL_ID, MockModel};
pub use ollama::OllamaClient;
pub use response::{ChunkStream, Response};

use crate::config::LlmConfig;

/// Backend a model id routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Mock,
    Anthropic,
    Ollama,
}

impl Backend {
    /// `mock`, then `anthropic/…` or `claude…`, otherwise Ollama
    pub fn for_model(model_id: &str) -> Self {
        if model_id == MOCK_MODEL_ID {
            Self::Mock
        } else if model_id.starts_with(anthropic::ANTHROPIC_PREFIX) || model_id.starts_with("claude") {
            Self::Anthropic
        } else {
            Self::Ollama
        }
    }
}

/// Build the model client for a model id
pub fn build_model(model_id: &str, config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    let timeout = Duration::from_millis(config.timeout_ms);
    let backend = Backend::for_model(model_id);
    log::info!("Getting the model: {} ({:?})", model_id, backend);

    Ok(match backend {
        Backend::Mock => Arc::new(MockModel::new()),
        Backend::Anthropic => Arc::new(AnthropicClient::new(
            model_id,
            &config.anthropic,
            config.max_tokens,
            timeout,
        )?),
        Backend::Ollama => Arc::new(OllamaClient::new(model_id, &config.ollama, timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_routing() {
        assert_eq!(Backend::for_model("mock"), Backend::Mock);
        assert_eq!(Backend::for_model("anthropic/claude-sonnet-4-20250514"), Backend::Anthropic);
        assert_eq!(Backend::for_model("claude-3-haiku-20240307"), Backend::Anthropic);
        assert_eq!(Backend::for_model("llama3.2:latest"), Backend::Ollama);
        assert_eq!(Backend::for_model("ollama/mistral"), Backend::Ollama);
    }

    #[test]
    fn test_build_mock_model() {
        let model = build_model("mock", &LlmConfig::default()).unwrap();
        assert_eq!(model.model_id(), "mock");
    }

    #[test]
    fn test_build_ollama_model() {
        let model = build_model("llama3.2:latest", &LlmConfig::default()).unwrap();
        assert_eq!(model.model_id(), "llama3.2:latest");
    }
}
