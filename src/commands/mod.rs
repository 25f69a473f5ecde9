//! Command implementations for awflow.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the workflow discovery shared by `compile` and
//! `validate`.

mod compile;
mod engines;
mod metrics;
mod validate;


use crate::cli::Command;
use crate::compiler::LOCK_SUFFIX;
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, verbose: bool) -> Result<()> {
    match command {
        Command::Compile(args) => compile::cmd_compile(args),
        Command::Validate(args) => validate::cmd_validate(args),
        Command::Engines => engines::cmd_engines(),
        Command::Metrics(args) => metrics::cmd_metrics(args, verbose),
    }
}

// ============================================================================
// Workflow discovery
// ============================================================================

fn workflow_matcher(config: &CompilerConfig) -> Result<GlobMatcher> {
    Glob::new(&config.workflow_glob)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| {
            CompileError::UserError(format!(
                "workflow_glob '{}' is invalid: {}",
                config.workflow_glob, e
            ))
        })
}

/// Whether `path` names a workflow document rather than a generated pipeline
/// or some other file.
fn is_workflow_document(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    !name.ends_with(LOCK_SUFFIX) && path.extension().is_some_and(|ext| ext == "md")
}

/// Expand the given paths into workflow documents, sorted within each
/// directory.
///
/// Directories contribute their direct children matching the workflow glob.
/// Files named explicitly are kept when they are markdown documents.
pub fn discover_workflows(
    paths: &[PathBuf],
    default_dir: &Path,
    config: &CompilerConfig,
) -> Result<Vec<PathBuf>> {
    let matcher = workflow_matcher(config)?;
    let roots = if paths.is_empty() {
        vec![default_dir.to_path_buf()]
    } else {
        paths.to_vec()
    };

    let mut workflows = Vec::new();
    for root in roots {
        if root.is_dir() {
            let entries = fs::read_dir(&root).map_err(|e| {
                CompileError::UserError(format!(
                    "failed to read directory '{}': {}",
                    root.display(),
                    e
                ))
            })?;
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_file())
                .filter(|path| {
                    path.file_name()
                        .is_some_and(|name| matcher.is_match(Path::new(name)))
                })
                .filter(|path| is_workflow_document(path))
                .collect();
            found.sort();
            debug!(dir = %root.display(), count = found.len(), "Discovered workflows");
            workflows.extend(found);
        } else if root.exists() {
            if is_workflow_document(&root) {
                workflows.push(root);
            } else {
                debug!(path = %root.display(), "Skipping non-workflow file");
            }
        } else {
            return Err(CompileError::UserError(format!(
                "path '{}' does not exist",
                root.display()
            )));
        }
    }
    Ok(workflows)
}

/// Run `action` on every workflow, reporting failures as they happen.
///
/// A single workflow's error is returned as is. With several workflows each
/// failure is printed and a summary carrying the most severe exit code is
/// returned.
pub fn for_each_workflow<F>(workflows: &[PathBuf], mut action: F) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    if let [single] = workflows {
        return action(single.as_path());
    }

    let mut failed = 0;
    let mut exit_code = 0;
    for workflow in workflows {
        if let Err(err) = action(workflow.as_path()) {
            eprintln!("{}", err);
            failed += 1;
            exit_code = exit_code.max(err.exit_code());
        }
    }

    if failed > 0 {
        return Err(CompileError::Summary {
            failed,
            total: workflows.len(),
            exit_code,
        });
    }
    Ok(())
}
