//! Anthropic API client implementation
//!
//! Streams the Messages API over server-sent events. Only text deltas are
//! surfaced; tool use is not requested.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde_json::{Value, json};

use super::client::{LanguageModel, LlmError};
use super::response::Response;
use crate::config::ProviderConfig;

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Prefix that forces the Anthropic backend, e.g. `anthropic/claude-sonnet-4-20250514`
pub const ANTHROPIC_PREFIX: &str = "anthropic/";

/// Anthropic API client
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    base_url: String,
    model_id: String,
    model: String,
    max_tokens: u32,
}

/// What one SSE message means for the text stream
#[derive(Debug, PartialEq)]
enum Delta {
    Text(String),
    Stop,
    Ignore,
}

impl AnthropicClient {
    /// Create a client, reading the API key from the configured environment variable
    pub fn new(
        model_id: &str,
        provider: &ProviderConfig,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let env_var = provider
            .api_key_env
            .clone()
            .unwrap_or_else(|| "ANTHROPIC_API_KEY".to_string());
        let api_key = std::env::var(&env_var).map_err(|_| LlmError::MissingApiKey { env_var })?;
        Self::with_api_key(api_key, model_id, provider, max_tokens, timeout)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(
        api_key: String,
        model_id: &str,
        provider: &ProviderConfig,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build()?;
        let model = model_id.strip_prefix(ANTHROPIC_PREFIX).unwrap_or(model_id).to_string();
        Ok(Self {
            http,
            api_key,
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
            model,
            max_tokens,
        })
    }

    fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "stream": true,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        })
    }
}

/// Interpret one SSE data payload
fn parse_event(data: &str) -> Result<Delta, LlmError> {
    let data: Value = serde_json::from_str(data)?;
    match data["type"].as_str() {
        Some("content_block_delta") => match data["delta"]["text"].as_str() {
            Some(text) => Ok(Delta::Text(text.to_string())),
            None => Ok(Delta::Ignore),
        },
        Some("message_stop") => Ok(Delta::Stop),
        Some("error") => Err(LlmError::InvalidResponse(
            data["error"]["message"].as_str().unwrap_or("unknown error").to_string(),
        )),
        _ => Ok(Delta::Ignore),
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn prompt(&self, text: &str) -> Result<Response, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        log::debug!("prompt: POST {} model={}", url, self.model);

        let request = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.build_request_body(text));

        let es = EventSource::new(request).map_err(|e| LlmError::EventSource(e.to_string()))?;

        let chunks = futures::stream::unfold(Some(es), |state| async move {
            let mut es = state?;
            loop {
                match es.next().await {
                    Some(Ok(Event::Open)) => {
                        log::debug!("stream: Event::Open");
                    }
                    Some(Ok(Event::Message(msg))) => match parse_event(&msg.data) {
                        Ok(Delta::Text(text)) => return Some((Ok(text), Some(es))),
                        Ok(Delta::Stop) => {
                            es.close();
                            return None;
                        }
                        Ok(Delta::Ignore) => continue,
                        Err(e) => {
                            es.close();
                            return Some((Err(e), None));
                        }
                    },
                    Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                        es.close();
                        return None;
                    }
                    Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, response))) => {
                        es.close();
                        let message = response.text().await.unwrap_or_default();
                        return Some((
                            Err(LlmError::ApiError {
                                status: status.as_u16(),
                                message,
                            }),
                            None,
                        ));
                    }
                    Some(Err(e)) => {
                        es.close();
                        return Some((Err(LlmError::EventSource(e.to_string())), None));
                    }
                }
            }
        });

        Ok(Response::new(self.model_id.clone(), chunks.boxed()))
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
