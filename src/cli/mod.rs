//! CLI module for clm - the static command line and the dynamic `run` surface.
//!
//! The static commands are clap derive types; the tools under `run` are
//! discovered when `run` is dispatched.

pub mod commands;
pub mod surface;

pub use commands::{Cli, Commands, ToolKind};
pub use surface::{RUN_COMMAND, ToolGatherer};
