//! Process steps: act on the model response

use std::io::Write;
use std::process::Stdio;

use eyre::{Context, Result, eyre};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::llm::Response;
use crate::prompt::PromptRenderer;
use crate::runner::Data;

/// One step of a tool's `process` list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStep {
    /// Print chunks as they arrive
    Stream,
    /// Print the full response text
    Print,
    /// Print each gathered entry as `key: value`
    PrintData,
    /// Write the response text to a file
    WriteFile { path: String },
    /// Pipe the response text into a shell command
    Command { run: String },
}

/// Steps used when a tool declares none
pub fn default_steps() -> Vec<ProcessStep> {
    vec![ProcessStep::Stream]
}

/// Run process steps in order, printing to `out`
pub async fn process<W: Write + Send>(
    steps: &[ProcessStep],
    response: &mut Response,
    data: &Data,
    renderer: &PromptRenderer,
    out: &mut W,
) -> Result<()> {
    for step in steps {
        log::debug!("process step: {:?}", step);
        match step {
            ProcessStep::Stream => response.stream_to(out).await?,
            ProcessStep::Print => {
                let text = response.text().await.context("Failed to read response from the model")?;
                out.write_all(text.as_bytes())?;
                if !text.ends_with('\n') {
                    writeln!(out)?;
                }
            }
            ProcessStep::PrintData => {
                for (key, value) in data {
                    writeln!(out, "{}: {}", key, display_value(value))?;
                }
            }
            ProcessStep::WriteFile { path } => {
                let path = renderer.render(path, data)?;
                response.write_to_file(&path).await?;
            }
            ProcessStep::Command { run } => {
                let command = renderer.render(run, data)?;
                let text = response.text().await.context("Failed to read response from the model")?;
                pipe_to_shell(&command, text).await?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Strings print bare, anything else as JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn pipe_to_shell(command: &str, input: &str) -> Result<()> {
    log::info!("Piping response to: {}", command);
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .spawn()
        .context(format!("Failed to run `{}`", command))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(eyre!("`{}` exited with {}", command, status));
    }
    Ok(())
}
