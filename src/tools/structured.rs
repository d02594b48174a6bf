//! Structured tools: a prompt template with gather and process steps

use async_trait::async_trait;
use clap::{Arg, ArgAction};
use eyre::Result;
use serde::Deserialize;

use super::gather::{self, GatherStep};
use super::process::{self, ProcessStep};
use crate::error::SurfaceError;
use crate::llm::Response;
use crate::prompt::PromptRenderer;
use crate::runner::{Data, Parameters, ToolRunner};

/// Name of the repeatable `--parameter KEY=VALUE` option
pub const PARAMETER_ARG: &str = "parameter";

#[derive(Debug, Clone, Deserialize)]
pub struct StructuredTool {
    /// One-line description for help output
    #[serde(default)]
    pub about: Option<String>,

    /// Handlebars template rendered against the gathered data
    pub prompt: String,

    #[serde(default = "gather::default_steps")]
    pub gather: Vec<GatherStep>,

    #[serde(default = "process::default_steps")]
    pub process: Vec<ProcessStep>,
}

impl StructuredTool {
    /// Pair the tool with the renderer its steps use
    pub fn runner<'a>(&'a self, renderer: &'a PromptRenderer) -> StructuredRunner<'a> {
        StructuredRunner { tool: self, renderer }
    }

    pub(crate) fn clap_command(&self, name: &str) -> clap::Command {
        let mut command = clap::Command::new(name.to_string()).arg(
            Arg::new(PARAMETER_ARG)
                .short('p')
                .long(PARAMETER_ARG)
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Parameter passed to the tool (repeatable)"),
        );
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }
        command
    }

    /// Parse the tokens after the tool name into parameters
    pub fn parse_parameters(&self, name: &str, tokens: &[String]) -> Result<Parameters, SurfaceError> {
        let matches = self
            .clap_command(name)
            .try_get_matches_from(std::iter::once(name.to_string()).chain(tokens.iter().cloned()))?;

        let mut params = Parameters::new();
        for token in matches.get_many::<String>(PARAMETER_ARG).into_iter().flatten() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| SurfaceError::MalformedParameter(token.clone()))?;
            params.insert(key.to_string(), value.to_string());
        }
        Ok(params)
    }
}

/// A structured tool bound to a renderer, driven by `run_tool`
#[derive(Debug, Clone, Copy)]
pub struct StructuredRunner<'a> {
    tool: &'a StructuredTool,
    renderer: &'a PromptRenderer,
}

#[async_trait]
impl ToolRunner for StructuredRunner<'_> {
    fn prompt(&self) -> &str {
        &self.tool.prompt
    }

    async fn gather_data(&self, params: Parameters) -> Result<Data> {
        gather::gather(&self.tool.gather, &params, self.renderer).await
    }

    async fn process(&self, response: &mut Response, data: &Data) -> Result<()> {
        let mut stdout = std::io::stdout();
        process::process(&self.tool.process, response, data, self.renderer, &mut stdout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(yaml: &str) -> StructuredTool {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_steps() {
        let tool = tool("prompt: hi\n");
        assert_eq!(tool.gather, vec![GatherStep::Parameters]);
        assert_eq!(tool.process, vec![ProcessStep::Stream]);
        assert!(tool.about.is_none());
    }

    #[test]
    fn test_parse_parameters() {
        let tool = tool("prompt: hi\n");
        let params = tool
            .parse_parameters("good", &tokens(&["--parameter", "key1=value1", "-p", "key2=a=b"]))
            .unwrap();
        assert_eq!(params.get("key1").map(String::as_str), Some("value1"));
        // Only the first `=` separates key from value
        assert_eq!(params.get("key2").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_parameter_without_equals_is_malformed() {
        let tool = tool("prompt: hi\n");
        let err = tool.parse_parameters("good", &tokens(&["--parameter", "key1"])).unwrap_err();
        assert!(matches!(err, SurfaceError::MalformedParameter(p) if p == "key1"));
    }

    #[test]
    fn test_stray_token_is_clap_error() {
        let tool = tool("prompt: hi\n");
        let err = tool.parse_parameters("good", &tokens(&["key1=value1"])).unwrap_err();
        assert!(matches!(err, SurfaceError::Clap(_)));
    }

    #[tokio::test]
    async fn test_runner_gathers_and_exposes_prompt() {
        let tool = tool("prompt: 'Echo {{key1}}'\n");
        let renderer = PromptRenderer::new();
        let runner = tool.runner(&renderer);
        let mut params = Parameters::new();
        params.insert("key1".to_string(), "value1".to_string());

        let data = runner.gather_data(params).await.unwrap();
        assert_eq!(runner.prompt(), "Echo {{key1}}");
        assert_eq!(data.get("key1"), Some(&serde_json::json!("value1")));
    }
}
