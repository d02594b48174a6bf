//! Tool definitions and where they live
//!
//! A tool is declared under a top-level symbol of a tool script. The `kind`
//! field picks one of two shapes; `structured` is assumed when it is absent.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use super::command::CommandTool;
use super::structured::StructuredTool;
use crate::loader::kind_of;

/// Symbol every discoverable tool script must define
pub const TOOL_SYMBOL: &str = "tool";

/// Where a tool's definition lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocation {
    /// Search directory the script was found in
    pub base_dir: PathBuf,
    /// Script path relative to `base_dir`
    pub rel_path: PathBuf,
    /// Top-level symbol holding the definition
    pub symbol: String,
}

impl ToolLocation {
    pub fn new(base_dir: impl Into<PathBuf>, rel_path: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            rel_path: rel_path.into(),
            symbol: TOOL_SYMBOL.to_string(),
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Full path of the script
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(&self.rel_path)
    }

    /// Identifier handed to the module loader
    pub fn identifier(&self) -> &Path {
        &self.rel_path
    }
}

impl fmt::Display for ToolLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbol == TOOL_SYMBOL {
            write!(f, "{}", self.path().display())
        } else {
            write!(f, "{}:{}", self.path().display(), self.symbol)
        }
    }
}

/// Why a symbol's value is not a usable tool
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolShapeError {
    /// The symbol is explicitly null
    #[error("tool is disabled (null)")]
    Disabled,

    /// The symbol holds a scalar or list instead of a definition
    #[error("expected a tool definition mapping, found {0}")]
    NotAMapping(&'static str),

    /// The mapping does not deserialize or validate as a tool
    #[error("{0}")]
    Invalid(String),
}

/// A tool definition, one of two shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tool {
    /// Declares its own arguments and runs its steps inline
    Command(CommandTool),
    /// Prompt template plus gather and process steps, run with phase isolation
    Structured(StructuredTool),
}

impl Tool {
    /// Interpret a symbol's value as a tool definition
    pub fn from_value(value: &Value) -> Result<Self, ToolShapeError> {
        match value {
            Value::Null => return Err(ToolShapeError::Disabled),
            Value::Mapping(_) => {}
            other => return Err(ToolShapeError::NotAMapping(kind_of(other))),
        }

        // Internally tagged enums go through serde_json, which also
        // rejects non-string keys.
        let mut json = serde_json::to_value(value).map_err(|e| ToolShapeError::Invalid(e.to_string()))?;
        if let Some(object) = json.as_object_mut() {
            object
                .entry("kind")
                .or_insert_with(|| serde_json::Value::String("structured".to_string()));
        }

        let tool: Tool = serde_json::from_value(json).map_err(|e| ToolShapeError::Invalid(e.to_string()))?;
        tool.validate().map_err(ToolShapeError::Invalid)?;
        Ok(tool)
    }

    /// One-line description shown in help
    pub fn about(&self) -> Option<&str> {
        match self {
            Self::Command(tool) => tool.about(),
            Self::Structured(tool) => tool.about.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Structured(_) => "structured",
        }
    }

    /// Parser for the tokens following the tool name
    pub fn clap_command(&self, name: &str) -> clap::Command {
        match self {
            Self::Command(tool) => tool.clap_command(name),
            Self::Structured(tool) => tool.clap_command(name),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Command(tool) => tool.validate(),
            Self::Structured(_) => Ok(()),
        }
    }
}
