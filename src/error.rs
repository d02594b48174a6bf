//! Error types for clm
//!
//! Each layer gets its own thiserror enum; `ClmError` ties them together at
//! the dispatch boundary, where `main` decides the exit status.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;
use crate::prompt::RenderError;

/// Boxed error carried as the cause of a failed script load
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A tool script could not be found or could not be loaded
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    /// No script matching the identifier exists under the search directory
    #[error(
        "Invalid module name: {name} (searched in {dir}). It is usually the name of the tool script you are trying to use."
    )]
    NotFound { name: String, dir: PathBuf },

    /// The script exists but reading or parsing it failed
    #[error("Failed to load tool script {name} from {dir}: {source}")]
    Invalid {
        name: String,
        dir: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Errors raised while resolving a tool on the `run` command surface
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// Requested tool name is not in the registry
    #[error("Unrecognized tool command `{0}`")]
    UnknownTool(String),

    /// A `--parameter` token was not of the form key=value
    #[error("Invalid parameter `{0}`: expected KEY=VALUE")]
    MalformedParameter(String),

    /// The script backing a tool vanished or became unloadable
    #[error(transparent)]
    InvalidModule(#[from] ModuleLoadError),

    /// A `script:Symbol` reference names something that is not a usable tool
    #[error("Invalid tool class {symbol} in module {module}: {reason}")]
    InvalidToolClass {
        symbol: String,
        module: String,
        reason: String,
    },

    /// Argument parsing failed, or help was requested
    #[error(transparent)]
    Clap(#[from] clap::Error),
}

impl SurfaceError {
    /// Usage errors get a hint pointing at `clm run --help`
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::MalformedParameter(_))
    }
}

/// The two isolated phases of a structured tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GatherData,
    Process,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GatherData => write!(f, "gather_data"),
            Self::Process => write!(f, "process"),
        }
    }
}

/// Failure of a structured tool run
#[derive(Debug, Error)]
pub enum RunError {
    /// gather_data or process failed; already logged with full detail
    #[error("Error in your tool's {phase} method: {error}")]
    Phase { phase: Phase, error: eyre::Report },

    /// Template could not be rendered against the gathered data
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The model could not be prompted
    #[error(transparent)]
    Model(#[from] LlmError),
}

impl RunError {
    /// Phase that failed, if this is a phase error
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// All errors that can end a clm invocation
#[derive(Debug, Error)]
pub enum ClmError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Model(#[from] LlmError),

    /// A declarative command tool failed while executing inline
    #[error("Tool `{name}` failed: {error:?}")]
    Tool { name: String, error: eyre::Report },
}

/// Result type alias for clm operations
pub type Result<T> = std::result::Result<T, ClmError>;
