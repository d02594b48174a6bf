//! Mock model for tests and dry runs.
//!
//! Selected with `-m mock`. Replies with queued chunk lists in order, then
//! with empty responses once the queue is drained.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{LanguageModel, LlmError};
use super::response::Response;

/// Model id that selects the mock backend
pub const MOCK_MODEL_ID: &str = "mock";

#[derive(Debug, Default)]
pub struct MockModel {
    queue: Mutex<VecDeque<Vec<String>>>,
    history: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the chunks of one future response
    pub fn enqueue<I, S>(&self, chunks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = chunks.into_iter().map(Into::into).collect();
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(chunks);
        }
    }

    /// Prompts received so far
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn model_id(&self) -> &str {
        MOCK_MODEL_ID
    }

    async fn prompt(&self, text: &str) -> Result<Response, LlmError> {
        if let Ok(mut history) = self.history.lock() {
            history.push(text.to_string());
        }
        let chunks = self
            .queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_default();
        Ok(Response::from_chunks(MOCK_MODEL_ID, chunks))
    }
}
