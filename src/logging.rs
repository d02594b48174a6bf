//! Logging setup and human-visible console output.
//!
//! Diagnostics go through the `log` facade to env_logger on stderr. Notices
//! meant for the user (which model is being prompted, created files) go
//! through a `Console` value that is handed to the components that need it.

use std::fmt::Display;

use colored::*;
use eyre::Result;
use log::LevelFilter;

/// Map the `-v` count and `-q` flag to a log level
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialise env_logger on stderr. `RUST_LOG` can refine the level per module.
pub fn setup_logging(verbose: u8, quiet: bool) -> Result<()> {
    env_logger::Builder::new()
        .filter_level(level_for(verbose, quiet))
        .parse_default_env()
        .format_timestamp(None)
        .try_init()?;

    log::debug!("Logging initialized at level {}", level_for(verbose, quiet));
    Ok(())
}

/// Terminal feedback that is not a log record
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a notice to stderr unless quiet
    pub fn notice(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("{}", message.to_string().cyan());
        }
    }

    /// Print a success line to stderr unless quiet
    pub fn success(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("{}", message.to_string().green());
        }
    }
}
