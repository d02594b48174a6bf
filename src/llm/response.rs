//! Lazy, streaming model response.
//!
//! Nothing is read from the model until a consumer asks for a chunk or for
//! the full text. Chunks already read are kept, so `text()` can be called
//! after streaming and repeatedly.

use std::fmt;
use std::io::Write;
use std::path::Path;

use eyre::{Context, Result};
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use super::client::LlmError;

/// Stream of text chunks as produced by a model backend
pub type ChunkStream = BoxStream<'static, Result<String, LlmError>>;

/// Handle to a model response
pub struct Response {
    model_id: String,
    stream: Option<ChunkStream>,
    text: String,
}

impl Response {
    /// Wrap a backend chunk stream
    pub fn new(model_id: impl Into<String>, stream: ChunkStream) -> Self {
        Self {
            model_id: model_id.into(),
            stream: Some(stream),
            text: String::new(),
        }
    }

    /// Response backed by chunks that are already known
    pub fn from_chunks<I, S>(model_id: impl Into<String>, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks: Vec<Result<String, LlmError>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(model_id, stream::iter(chunks).boxed())
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// True once the underlying stream is exhausted
    pub fn is_complete(&self) -> bool {
        self.stream.is_none()
    }

    /// Pull the next chunk from the model, waiting for it if needed
    pub async fn next_chunk(&mut self) -> Option<Result<String, LlmError>> {
        let stream = self.stream.as_mut()?;
        match stream.next().await {
            Some(Ok(chunk)) => {
                self.text.push_str(&chunk);
                Some(Ok(chunk))
            }
            Some(Err(e)) => {
                self.stream = None;
                Some(Err(e))
            }
            None => {
                self.stream = None;
                None
            }
        }
    }

    /// Read the rest of the response and return the full text
    pub async fn text(&mut self) -> Result<&str, LlmError> {
        while let Some(chunk) = self.next_chunk().await {
            chunk?;
        }
        Ok(&self.text)
    }

    /// Write the response to `out` chunk by chunk, flushing as it goes.
    ///
    /// Text that was already read is written first.
    pub async fn stream_to<W: Write + Send>(&mut self, out: &mut W) -> Result<()> {
        if !self.text.is_empty() {
            out.write_all(self.text.as_bytes())?;
            out.flush()?;
        }
        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk.context("Failed to read response from the model")?;
            out.write_all(chunk.as_bytes())?;
            out.flush()?;
        }
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            writeln!(out)?;
        }
        Ok(())
    }

    /// Write the full response text to a file, replacing it
    pub async fn write_to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.text().await.context("Failed to read response from the model")?;
        std::fs::write(path, text).context(format!("Failed to write response to {}", path.display()))?;
        log::info!("Wrote response to {}", path.display());
        Ok(())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("model_id", &self.model_id)
            .field("complete", &self.is_complete())
            .field("bytes_read", &self.text.len())
            .finish()
    }
}
