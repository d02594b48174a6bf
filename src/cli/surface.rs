//! Command Surface - discovered tools as subcommands of `run`
//!
//! The registry is built the first time it is needed (listing, help or
//! dispatch), never at startup. Model construction is deferred until a tool
//! has been resolved, so an unknown tool is reported as such even when no
//! model is reachable.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::config::{Config, DirPrecedence};
use crate::error::{ClmError, SurfaceError};
use crate::loader::{LoadedModule, ModuleLoader};
use crate::runner::{RunContext, run_tool};
use crate::tools::{Enumeration, Tool, ToolLocation, ToolRegistry, ToolShapeError};

/// Name of the dynamic subcommand group
pub const RUN_COMMAND: &str = "run";

/// Resolves tool names to definitions and dispatches `run`
#[derive(Debug)]
pub struct ToolGatherer {
    dirs: Vec<PathBuf>,
    precedence: DirPrecedence,
    loader: ModuleLoader,
    enumeration: OnceLock<Enumeration>,
}

impl ToolGatherer {
    pub fn new(dirs: Vec<PathBuf>, precedence: DirPrecedence, loader: ModuleLoader) -> Self {
        Self {
            dirs,
            precedence,
            loader,
            enumeration: OnceLock::new(),
        }
    }

    pub fn from_config(config: &Config, loader: ModuleLoader) -> Self {
        Self::new(config.tools_dirs.clone(), config.dir_precedence, loader)
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Scan results, computed once
    pub fn enumeration(&self) -> &Enumeration {
        self.enumeration
            .get_or_init(|| ToolRegistry::enumerate(&self.dirs, self.precedence, &self.loader))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.enumeration().registry
    }

    /// Sorted tool names. Tools that failed to load are left out, not reported.
    pub fn list_commands(&self) -> Vec<String> {
        self.registry().names()
    }

    /// Resolve a tool by registry name, or `path:Symbol` relative to the
    /// current directory.
    pub fn get_command(&self, name: &str) -> Result<(ToolLocation, Tool), SurfaceError> {
        let location = match name.split_once(':') {
            Some((path, symbol)) => ToolLocation::new(".", path).with_symbol(symbol),
            None => self
                .registry()
                .get(name)
                .cloned()
                .ok_or_else(|| SurfaceError::UnknownTool(name.to_string()))?,
        };

        let module = self.loader.load(location.identifier(), &location.base_dir)?;
        let tool = tool_in_module(&module, &location.symbol)?;
        Ok((location, tool))
    }

    /// The `run` command with one subcommand per registered tool
    pub fn command(&self) -> clap::Command {
        let mut command = clap::Command::new(RUN_COMMAND)
            .about("Run a tool")
            .override_usage("clm run <TOOL> [ARGS]...")
            .disable_help_subcommand(true)
            .after_help("Tool names may also be given as <script>:<symbol>.");

        for (name, location) in self.registry().iter() {
            let about = self
                .loader
                .load(location.identifier(), &location.base_dir)
                .ok()
                .and_then(|module| tool_in_module(&module, &location.symbol).ok())
                .and_then(|tool| tool.about().map(str::to_string));

            let mut sub = clap::Command::new(name.clone());
            if let Some(about) = about {
                sub = sub.about(about);
            }
            command = command.subcommand(sub);
        }
        command
    }

    /// Dispatch `run` with the tokens that followed it.
    ///
    /// `make_ctx` is only called once the tool has been resolved and its
    /// arguments parsed.
    pub async fn dispatch<F>(&self, args: &[String], make_ctx: F) -> crate::Result<()>
    where
        F: FnOnce() -> crate::Result<RunContext>,
    {
        let Some((name, rest)) = args.split_first() else {
            return self.print_help();
        };
        if name == "-h" || name == "--help" {
            return self.print_help();
        }

        let (location, tool) = self.get_command(name)?;
        log::info!("Running `{}` from {}", name, location);

        match &tool {
            Tool::Command(command) => {
                let invocation = command.parse(name, rest).map_err(SurfaceError::from)?;
                let ctx = make_ctx()?;
                invocation.execute(&ctx).await.map_err(|error| ClmError::Tool {
                    name: name.clone(),
                    error,
                })
            }
            Tool::Structured(structured) => {
                let params = structured.parse_parameters(name, rest)?;
                let ctx = make_ctx()?;
                let runner = structured.runner(&ctx.renderer);
                let state = run_tool(&runner, params, &ctx).await?;
                log::debug!("`{}` done: {:?}", name, state.response);
                Ok(())
            }
        }
    }

    fn print_help(&self) -> crate::Result<()> {
        let mut command = self.command();
        println!("{}", command.render_help());
        Ok(())
    }
}

/// Interpret a module symbol as a tool
fn tool_in_module(module: &Arc<LoadedModule>, symbol: &str) -> Result<Tool, SurfaceError> {
    let invalid = |reason: String| SurfaceError::InvalidToolClass {
        symbol: symbol.to_string(),
        module: module.path().display().to_string(),
        reason,
    };

    let value = module
        .get(symbol)
        .ok_or_else(|| invalid("not found in module".to_string()))?;

    Tool::from_value(value).map_err(|e| match e {
        ToolShapeError::Disabled => invalid("tool is disabled".to_string()),
        other => invalid(format!("not a valid tool definition: {}", other)),
    })
}
