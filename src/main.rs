//! awflow: compile agentic workflow documents into CI pipelines.
//!
//! This is the main entry point for the `awflow` CLI. It parses arguments,
//! installs logging, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

mod cli;
mod commands;
pub mod compiler;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod document;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod expr;
pub mod frontmatter;
pub mod fs;
pub mod schema;

use cli::Cli;
use error::CompileError;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match commands::dispatch(cli.command, cli.verbose) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Diagnostics already carry their own `file:line: error:` prefix
            match &err {
                CompileError::Failed { .. } => eprintln!("{}", err),
                _ => eprintln!("Error: {}", err),
            }

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
