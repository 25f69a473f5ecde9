//! Positioned diagnostics reported against a workflow document.
//!
//! Every user-facing problem found while compiling a workflow is turned into a
//! [`Diagnostic`]. Diagnostics are aggregated and reported together so an author
//! sees every problem in one pass.

use std::fmt;

/// A source range, 1-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    /// A span covering `start..=end` columns on a single line.
    pub fn on_line(line: usize, start_column: usize, end_column: usize) -> Self {
        Self {
            start_line: line,
            start_column,
            end_line: line,
            end_column: end_column.max(start_column),
        }
    }

    /// Move the span down by `lines` lines.
    pub fn shifted(self, lines: usize) -> Self {
        Self {
            start_line: self.start_line + lines,
            end_line: self.end_line + lines,
            ..self
        }
    }
}

/// Which stage of the compiler produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The frontmatter block or its YAML could not be parsed.
    Parse,
    /// The frontmatter violates the configuration schema.
    Schema,
    /// The frontmatter is well formed but semantically invalid.
    Semantic,
}

/// A single problem found in a workflow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Structural path of the offending field (e.g. `safe-outputs.create-issue.max`).
    pub path: Option<String>,
    pub message: String,
    /// Location in document coordinates. `None` when no text corresponds to the problem.
    pub span: Option<Span>,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            message: message.into(),
            span: None,
            hint: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Parse, message)
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Semantic, message)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render as `file:line:col: error: message`, followed by an optional hint line.
    pub fn render(&self, file: &str) -> String {
        let mut out = match self.span {
            Some(span) => format!(
                "{}:{}:{}: error: {}",
                file, span.start_line, span.start_column, self.message
            ),
            None => format!("{}: error: {}", file, self.message),
        };
        if let Some(hint) = &self.hint {
            out.push_str("\n  hint: ");
            out.push_str(hint);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) if !path.is_empty() => write!(f, "{}: {}", path, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Render a batch of diagnostics for one file, one entry per block.
pub fn render_all(file: &str, diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.render(file))
        .collect::<Vec<_>>()
        .join("\n")
}
