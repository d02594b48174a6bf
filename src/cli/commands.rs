//! CLI command definitions using clap.
//!
//! Defines the static CLI structure and subcommands:
//! - run: run a discovered tool (its subcommands are built at dispatch time)
//! - new: scaffold a tool script
//! - list: list discovered tools

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// clm - run language model tools discovered at runtime
#[derive(Parser, Debug)]
#[command(name = "clm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log detail (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors and tool output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Model id to prompt, overriding the configured one
    #[arg(short = 'm', long = "ll-model", global = true)]
    pub ll_model: Option<String>,

    /// Tool directory to search (repeatable, replaces the configured list)
    #[arg(short = 't', long = "tools-dir", global = true)]
    pub tools_dirs: Vec<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a tool; `clm run --help` lists the available tools
    #[command(disable_help_flag = true)]
    Run {
        /// Tool name followed by its own arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Create a new tool script from a template
    New {
        /// Tool name, also the file stem
        name: String,

        /// Directory to create the script in
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,

        /// Shape of the generated tool
        #[arg(short, long, value_enum, default_value_t = ToolKind::Structured)]
        kind: ToolKind,
    },

    /// List discovered tools and where they come from
    List,
}

/// Tool shapes the scaffolder can generate
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Prompt with gather and process steps, takes --parameter KEY=VALUE
    Structured,
    /// Declares its own arguments
    Command,
}
