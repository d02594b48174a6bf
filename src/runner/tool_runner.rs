//! Tool runner implementation - drives gather → render → prompt → process.
//!
//! `run_tool` owns the control flow. Failures in `gather_data` and `process`
//! are logged here and returned as `RunError::Phase`; rendering and model
//! failures are passed through untouched for the caller to report.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Phase, RunError};
use crate::llm::{LanguageModel, Response};
use crate::logging::Console;
use crate::prompt::PromptRenderer;

/// Raw `key=value` parameters from the command line
pub type Parameters = BTreeMap<String, String>;

/// Template variables produced by `gather_data`
pub type Data = BTreeMap<String, serde_json::Value>;

/// Contract every structured tool satisfies.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Template rendered against the gathered data
    fn prompt(&self) -> &str;

    /// Turn parameters into template data
    async fn gather_data(&self, params: Parameters) -> eyre::Result<Data>;

    /// Consume the model response for side effects
    async fn process(&self, response: &mut Response, data: &Data) -> eyre::Result<()>;
}

/// Collaborators a run needs
pub struct RunContext {
    pub model: Arc<dyn LanguageModel>,
    pub renderer: PromptRenderer,
    pub console: Console,
}

impl RunContext {
    pub fn new(model: Arc<dyn LanguageModel>, console: Console) -> Self {
        Self {
            model,
            renderer: PromptRenderer::new(),
            console,
        }
    }
}

/// What one successful run produced
#[derive(Debug)]
pub struct ExecutionState {
    pub gathered_data: Data,
    pub rendered_prompt: String,
    pub response: Response,
}

/// Run a tool through all phases.
///
/// Nothing after a failed phase runs: a gather failure never reaches the
/// model or `process`.
pub async fn run_tool<R>(tool: &R, params: Parameters, ctx: &RunContext) -> Result<ExecutionState, RunError>
where
    R: ToolRunner + ?Sized,
{
    let gathered_data = match tool.gather_data(params).await {
        Ok(data) => data,
        Err(error) => return Err(phase_failed(Phase::GatherData, error)),
    };
    log::debug!("Gathered {} value(s)", gathered_data.len());

    let rendered_prompt = ctx.renderer.render(tool.prompt(), &gathered_data)?;
    log::debug!("Rendered prompt:\n{}", rendered_prompt);

    ctx.console.notice(format!("Prompting {}", ctx.model.model_id()));
    let mut response = ctx.model.prompt(&rendered_prompt).await?;

    if let Err(error) = tool.process(&mut response, &gathered_data).await {
        return Err(phase_failed(Phase::Process, error));
    }

    Ok(ExecutionState {
        gathered_data,
        rendered_prompt,
        response,
    })
}

fn phase_failed(phase: Phase, error: eyre::Report) -> RunError {
    log::error!("Error in your tool's {} method: {:?}", phase, error);
    RunError::Phase { phase, error }
}
