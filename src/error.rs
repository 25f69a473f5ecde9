//! Error types for the awflow compiler.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::diagnostic::{Diagnostic, render_all};
use crate::exit_codes;
use thiserror::Error;

/// Main error type for awflow operations.
///
/// Each variant maps to a specific exit code.
#[derive(Error, Debug)]
pub enum CompileError {
    /// User provided invalid arguments or an input could not be read/written.
    #[error("{0}")]
    UserError(String),

    /// An engine id did not resolve against the registry.
    #[error("unknown engine '{id}' (available: {})", .available.join(", "))]
    UnknownEngine { id: String, available: Vec<String> },

    /// The workflow produced one or more diagnostics.
    #[error("{}", render_all(.file, .diagnostics))]
    Failed {
        file: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// The generated pipeline violated an internal invariant.
    #[error("internal error: {0}")]
    Internal(String),

    /// Several workflows were processed and some failed; each failure has
    /// already been reported.
    #[error("{failed} of {total} workflows failed")]
    Summary {
        failed: usize,
        total: usize,
        exit_code: i32,
    },
}

impl CompileError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::UserError(_) => exit_codes::USER_ERROR,
            CompileError::UnknownEngine { .. } => exit_codes::USER_ERROR,
            CompileError::Failed { .. } => exit_codes::VALIDATION_FAILURE,
            CompileError::Internal(_) => exit_codes::INTERNAL_ERROR,
            CompileError::Summary { exit_code, .. } => *exit_code,
        }
    }

    /// Diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Failed { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

/// Result type alias for awflow operations.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Span;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = CompileError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn unknown_engine_mentions_available_engines() {
        let err = CompileError::UnknownEngine {
            id: "gpt".to_string(),
            available: vec!["claude".to_string(), "codex".to_string()],
        };
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert_eq!(
            err.to_string(),
            "unknown engine 'gpt' (available: claude, codex)"
        );
    }

    #[test]
    fn failed_renders_every_diagnostic() {
        let err = CompileError::Failed {
            file: "triage.md".to_string(),
            diagnostics: vec![
                Diagnostic::parse("first").with_span(Some(Span::on_line(2, 1, 3))),
                Diagnostic::semantic("second"),
            ],
        };
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_FAILURE);
        assert_eq!(err.diagnostics().len(), 2);
        let text = err.to_string();
        assert!(text.contains("triage.md:2:1: error: first"));
        assert!(text.contains("triage.md: error: second"));
    }

    #[test]
    fn summary_keeps_worst_exit_code() {
        let err = CompileError::Summary {
            failed: 2,
            total: 5,
            exit_code: exit_codes::INTERNAL_ERROR,
        };
        assert_eq!(err.exit_code(), exit_codes::INTERNAL_ERROR);
        assert_eq!(err.to_string(), "2 of 5 workflows failed");
    }

    #[test]
    fn internal_error_has_correct_exit_code() {
        let err = CompileError::Internal("cycle".to_string());
        assert_eq!(err.exit_code(), exit_codes::INTERNAL_ERROR);
        assert_eq!(err.to_string(), "internal error: cycle");
    }
}
