//! Frontmatter validation with source positions.
//!
//! [`FrontmatterValidator`] checks a parsed frontmatter value against the
//! schema in [`rules`] and attaches to every violation the span recovered by
//! the [`SourceLocator`]. A violation whose path has no text (an absent
//! required field) carries no span.
//!
//! [`to_diagnostics`] turns validation errors into document-positioned
//! diagnostics with hints.

pub mod hints;
pub mod locator;
pub mod path;
pub mod rules;

pub use hints::hint_for;
pub use locator::{LocateError, SourceLocator};
pub use path::{FieldPath, PathSegment};

use crate::diagnostic::{Diagnostic, DiagnosticKind, Span};
use serde_yaml::Value;

/// A schema violation with an optional frontmatter-relative span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: FieldPath,
    pub message: String,
    /// Present only when the locator found text for `path`.
    pub span: Option<Span>,
}

/// Validates frontmatter values, resolving positions against the raw text it
/// was constructed with.
#[derive(Debug, Clone)]
pub struct FrontmatterValidator {
    locator: SourceLocator,
}

impl FrontmatterValidator {
    /// Index `frontmatter` (the raw text between the delimiters).
    pub fn new(frontmatter: &str) -> Self {
        Self {
            locator: SourceLocator::new(frontmatter),
        }
    }

    pub fn locator(&self) -> &SourceLocator {
        &self.locator
    }

    /// Validate `config`, returning every violation found.
    pub fn validate(&self, config: &Value) -> Vec<ValidationError> {
        let root = FieldPath::root();
        if !config.is_mapping() {
            return vec![ValidationError {
                path: root,
                message: format!(
                    "frontmatter must be a mapping, found {}",
                    rules::kind_name(config)
                ),
                span: None,
            }];
        }

        let mut violations = Vec::new();
        rules::check(rules::frontmatter_schema(), config, &root, &mut violations);
        violations
            .into_iter()
            .map(|violation| ValidationError {
                span: self.locator.locate(&violation.path).ok(),
                path: violation.path,
                message: violation.message,
            })
            .collect()
    }
}

/// Parse frontmatter text into a YAML value.
///
/// An empty block parses as an empty mapping. Syntax errors carry the parser's
/// position shifted by `line_offset` into document coordinates.
pub fn parse_frontmatter(text: &str, line_offset: usize) -> Result<Value, Diagnostic> {
    if text.trim().is_empty() {
        return Ok(Value::Mapping(serde_yaml::Mapping::new()));
    }
    serde_yaml::from_str(text).map_err(|e| {
        let span = e
            .location()
            .map(|loc| Span::on_line(loc.line(), loc.column(), loc.column()).shifted(line_offset));
        Diagnostic::parse(format!("invalid frontmatter YAML: {}", e))
            .with_span(span)
            .with_hint("check indentation and quoting in the frontmatter block")
    })
}

/// Convert validation errors to diagnostics in document coordinates.
pub fn to_diagnostics(
    errors: &[ValidationError],
    line_offset: usize,
    engine_ids: &[&str],
) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|error| {
            let mut diagnostic = Diagnostic::new(DiagnosticKind::Schema, error.message.clone())
                .with_path(error.path.to_string())
                .with_span(error.span.map(|span| span.shifted(line_offset)));
            if let Some(hint) = hint_for(&error.path, engine_ids) {
                diagnostic = diagnostic.with_hint(hint);
            }
            diagnostic
        })
        .collect()
}

#[cfg(test)]
mod tests;
