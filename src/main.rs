use std::path::Path;
use std::process;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use clm::cli::{Cli, Commands, RUN_COMMAND, ToolGatherer, ToolKind};
use clm::config::Config;
use clm::error::{ClmError, RunError, SurfaceError};
use clm::llm::build_model;
use clm::loader::{ModuleCache, ModuleLoader};
use clm::logging::{Console, setup_logging};
use clm::runner::RunContext;
use clm::scaffold::scaffold;

fn gatherer(config: &Config) -> ToolGatherer {
    ToolGatherer::from_config(config, ModuleLoader::new(ModuleCache::new()))
}

async fn handle_run_command(args: &[String], config: &Config, console: Console) -> clm::Result<()> {
    let gatherer = gatherer(config);
    gatherer
        .dispatch(args, || {
            let model = build_model(&config.ll_model, &config.llm)?;
            Ok(RunContext::new(model, console))
        })
        .await
}

fn handle_new_command(name: &str, dest: &Path, kind: ToolKind, console: Console) -> Result<()> {
    info!("Scaffolding {:?} tool `{}` in {}", kind, name, dest.display());
    let path = scaffold(name, dest, kind)?;
    console.success(format!("Created {}", path.display()));
    println!("Run it with: clm run {} --help", name);
    Ok(())
}

fn handle_list_command(config: &Config) -> Result<()> {
    let gatherer = gatherer(config);
    let enumeration = gatherer.enumeration();

    if enumeration.registry.is_empty() {
        let dirs: Vec<String> = config.tools_dirs.iter().map(|d| d.display().to_string()).collect();
        println!("{} {}", "No tools found in".yellow(), dirs.join(", "));
    }
    for (name, location) in enumeration.registry.iter() {
        println!("{} {}", format!("{:<20}", name).green(), location);
    }
    if !enumeration.skipped.is_empty() {
        println!();
        for skipped in &enumeration.skipped {
            println!("{} {}", "skipped:".dimmed(), skipped.message());
        }
    }
    Ok(())
}

/// Turn a failed `run` into the process outcome
fn finish_run(err: ClmError) -> Result<()> {
    match err {
        // Help and clap usage errors keep clap's own output and status
        ClmError::Surface(SurfaceError::Clap(e)) => e.exit(),
        // Already logged with the full error chain
        ClmError::Run(RunError::Phase { .. }) => process::exit(1),
        ClmError::Surface(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            if e.is_usage() {
                eprintln!("Try 'clm {} --help' to list the available tools.", RUN_COMMAND);
            }
            process::exit(1)
        }
        other => Err(other.into()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet).context("Failed to setup logging")?;
    let console = Console::new(cli.quiet);

    // Load configuration
    let config = Config::load(cli.config.as_ref())
        .context("Failed to load configuration")?
        .with_env()
        .with_cli(cli.ll_model.as_deref(), &cli.tools_dirs);
    config.validate()?;
    info!("Using model {} and tool dirs {:?}", config.ll_model, config.tools_dirs);

    match &cli.command {
        Commands::Run { args } => match handle_run_command(args, &config, console).await {
            Ok(()) => Ok(()),
            Err(e) => finish_run(e),
        },
        Commands::New { name, dest, kind } => handle_new_command(name, dest, *kind, console),
        Commands::List => handle_list_command(&config),
    }
}
