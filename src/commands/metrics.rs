//! Implementation of the `awflow metrics` command.

use crate::cli::MetricsArgs;
use crate::engine::{EngineRegistry, LogMetrics};
use crate::error::{CompileError, Result};
use std::fs;

pub fn cmd_metrics(args: MetricsArgs, verbose: bool) -> Result<()> {
    let metrics = summarize(&args, verbose)?;
    let json = serde_json::to_string_pretty(&metrics)
        .map_err(|e| CompileError::Internal(format!("failed to serialize metrics: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn summarize(args: &MetricsArgs, verbose: bool) -> Result<LogMetrics> {
    let engine = EngineRegistry::global().resolve(&args.engine)?;
    let log = fs::read_to_string(&args.log).map_err(|e| {
        CompileError::UserError(format!("failed to read log '{}': {}", args.log.display(), e))
    })?;
    Ok(engine.parse_log_metrics(&log, verbose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn summarizes_codex_log() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("run.log");
        fs::write(&log, "working\ntokens used: 1,200\nerror: tool failed\n").unwrap();

        let args = MetricsArgs {
            engine: "codex-experimental".to_string(),
            log,
        };
        let metrics = summarize(&args, false).unwrap();
        assert_eq!(metrics.token_usage, 1200);
        assert_eq!(metrics.error_count, 1);
    }

    #[test]
    fn unknown_engine_fails() {
        let temp = TempDir::new().unwrap();
        let args = MetricsArgs {
            engine: "gpt".to_string(),
            log: temp.path().join("run.log"),
        };
        assert!(matches!(
            summarize(&args, false),
            Err(CompileError::UnknownEngine { .. })
        ));
    }

    #[test]
    fn missing_log_is_user_error() {
        let temp = TempDir::new().unwrap();
        let args = MetricsArgs {
            engine: "claude".to_string(),
            log: temp.path().join("absent.log"),
        };
        assert!(matches!(summarize(&args, false), Err(CompileError::UserError(_))));
    }
}
