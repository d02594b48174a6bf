//! clm - run language model tools discovered at runtime
//!
//! Tool scripts are YAML files found in the configured tool directories.
//! Each one is loaded once, checked for a usable `tool` definition, and
//! exposed as a subcommand of `clm run`. Structured tools run through the
//! gather → render → prompt → process contract in `runner`.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod prompt;
pub mod runner;
pub mod scaffold;
pub mod tools;

pub use error::{ClmError, Result};
