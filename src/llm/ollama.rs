//! Ollama client implementation
//!
//! Uses `/api/generate` with streaming on. Ollama answers with one JSON
//! object per line; each carries a `response` fragment and a `done` flag.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::client::{LanguageModel, LlmError};
use super::response::Response;
use crate::config::ProviderConfig;

/// Prefix that forces the Ollama backend, e.g. `ollama/mistral`
pub const OLLAMA_PREFIX: &str = "ollama/";

/// Ollama client
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model_id: String,
    model: String,
}

/// One line of the streaming reply
#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaClient {
    pub fn new(model_id: &str, provider: &ProviderConfig, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build()?;
        let model = model_id.strip_prefix(OLLAMA_PREFIX).unwrap_or(model_id).to_string();
        Ok(Self {
            http,
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
            model,
        })
    }

    /// Model name sent to the server (prefix stripped)
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": true
        })
    }
}

/// Parse one NDJSON line into (text, done)
fn parse_line(line: &[u8]) -> Result<(String, bool), LlmError> {
    let parsed: GenerateLine = serde_json::from_slice(line)?;
    if let Some(error) = parsed.error {
        return Err(LlmError::InvalidResponse(error));
    }
    Ok((parsed.response, parsed.done))
}

/// Pop the next complete line out of the byte buffer
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=end).collect();
    line.pop();
    Some(line)
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn prompt(&self, text: &str) -> Result<Response, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        log::debug!("prompt: POST {} model={}", url, self.model);

        let response = self.http.post(&url).json(&self.build_request_body(text)).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message });
        }

        let bytes = Box::pin(response.bytes_stream());
        let chunks = futures::stream::unfold(
            (bytes, Vec::new(), false),
            |(mut bytes, mut buffer, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    if let Some(line) = take_line(&mut buffer) {
                        if line.iter().all(u8::is_ascii_whitespace) {
                            continue;
                        }
                        match parse_line(&line) {
                            Ok((chunk, true)) if chunk.is_empty() => return None,
                            Ok((chunk, done)) if !chunk.is_empty() => {
                                return Some((Ok(chunk), (bytes, buffer, done)));
                            }
                            Ok(_) => continue,
                            Err(e) => return Some((Err(e), (bytes, buffer, true))),
                        }
                    }
                    match bytes.next().await {
                        Some(Ok(data)) => buffer.extend_from_slice(&data),
                        Some(Err(e)) => return Some((Err(LlmError::Network(e)), (bytes, buffer, true))),
                        None => {
                            // Server closed without a trailing newline
                            if buffer.iter().all(u8::is_ascii_whitespace) {
                                return None;
                            }
                            let line = std::mem::take(&mut buffer);
                            return match parse_line(&line) {
                                Ok((chunk, _)) if !chunk.is_empty() => Some((Ok(chunk), (bytes, buffer, true))),
                                Ok(_) => None,
                                Err(e) => Some((Err(e), (bytes, buffer, true))),
                            };
                        }
                    }
                }
            },
        );

        Ok(Response::new(self.model_id.clone(), chunks.boxed()))
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}
