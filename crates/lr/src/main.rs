//! lr CLI - live reload for build output.
//!
//! Provides commands for:
//! - `watch`: Watch a build output directory and reload connected browsers
//! - `snippet`: Print the client bootstrap script

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{SnippetArgs, WatchArgs};
use error::CliError;
use output::Output;

/// lr - live reload for build output.
#[derive(Parser)]
#[command(name = "lr", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch an output directory and reload browsers on change.
    Watch(WatchArgs),
    /// Print the client bootstrap script.
    Snippet(SnippetArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Watch(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG (default WARN)
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Watch(args) => tokio::runtime::Runtime::new()
            .map_err(CliError::from)
            .and_then(|rt| rt.block_on(args.execute())),
        Commands::Snippet(args) => args.execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}
