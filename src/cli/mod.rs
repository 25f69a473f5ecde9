//! CLI argument parsing for awflow.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// awflow: compile agentic workflow documents into CI pipelines.
///
/// A workflow is a markdown file with a YAML frontmatter block:
/// - The frontmatter declares triggers, permissions, engine and tools
/// - The body is the prompt handed to the engine
/// - Compiling writes a `.lock.yml` pipeline next to the document
#[derive(Parser, Debug)]
#[command(name = "awflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log every compilation stage.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for awflow.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile workflow documents into pipelines.
    ///
    /// Directories are searched for documents matching the configured
    /// workflow glob. Without paths, the workflows directory is compiled.
    Compile(CompileArgs),

    /// Check workflow documents without writing anything.
    ///
    /// Runs parsing, schema validation and semantic checks.
    Validate(ValidateArgs),

    /// List the registered engines.
    Engines,

    /// Summarize an engine log.
    ///
    /// Prints error and warning counts, token usage and cost as JSON.
    Metrics(MetricsArgs),
}

#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Workflow files or directories.
    pub paths: Vec<PathBuf>,

    /// Use this engine for every workflow, ignoring the declared one.
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Compile without writing lock files.
    #[arg(long)]
    pub no_emit: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Workflow files or directories.
    pub paths: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct MetricsArgs {
    /// Engine that produced the log.
    #[arg(short, long)]
    pub engine: String,

    /// Log file to read.
    pub log: PathBuf,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
