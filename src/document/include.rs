//! `@include` directive expansion.
//!
//! A body line of the form `@include path/to/file.md` is replaced by the body of
//! the referenced document; `@include? path` does the same but silently skips a
//! missing file. Paths are resolved relative to the including file. Included
//! documents may carry their own frontmatter, which is returned to the caller
//! (only `tools` and `engine` are accepted there).

use super::WorkflowDocument;
use crate::diagnostic::{Diagnostic, Span};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Maximum nesting depth of include directives.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Frontmatter keys an included document may declare.
pub const INCLUDE_FRONTMATTER_KEYS: [&str; 2] = ["tools", "engine"];

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@include(\?)?\s+(\S+)\s*$").expect("Invalid include directive regex")
});

/// Frontmatter found in an included file.
#[derive(Debug, Clone)]
pub struct IncludedFrontmatter {
    pub path: PathBuf,
    pub value: serde_yaml::Mapping,
}

/// The prompt body after include expansion.
#[derive(Debug, Clone, Default)]
pub struct ExpandedBody {
    pub body: String,
    /// Frontmatter blocks of included files, in inclusion order.
    pub includes: Vec<IncludedFrontmatter>,
}

/// Expand every include directive in `body`.
///
/// `body_line` is the document line on which `body` starts, used to position
/// diagnostics for directives in the top-level document.
pub fn expand_includes(
    body: &str,
    base_dir: &Path,
    body_line: usize,
) -> Result<ExpandedBody, Diagnostic> {
    let mut expanded = ExpandedBody::default();
    let mut stack = Vec::new();
    expand_into(body, base_dir, Some(body_line), &mut stack, &mut expanded)?;
    Ok(expanded)
}

fn expand_into(
    body: &str,
    base_dir: &Path,
    body_line: Option<usize>,
    stack: &mut Vec<PathBuf>,
    out: &mut ExpandedBody,
) -> Result<(), Diagnostic> {
    for (index, line) in body.split_inclusive('\n').enumerate() {
        let Some(captures) = INCLUDE_DIRECTIVE.captures(line.trim_end()) else {
            out.body.push_str(line);
            continue;
        };

        let optional = captures.get(1).is_some();
        let target = &captures[2];
        let span = body_line.map(|start| Span::on_line(start + index, 1, line.trim_end().len()));
        let path = base_dir.join(target);

        if !path.is_file() {
            if optional {
                tracing::debug!(path = %path.display(), "Skipping missing optional include");
                continue;
            }
            return Err(Diagnostic::semantic(format!(
                "included file '{}' was not found",
                path.display()
            ))
            .with_span(span)
            .with_hint("use '@include?' for an include that may be absent"));
        }

        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if stack.contains(&canonical) {
            return Err(Diagnostic::semantic(format!(
                "include cycle detected at '{}'",
                path.display()
            ))
            .with_span(span));
        }
        if stack.len() >= MAX_INCLUDE_DEPTH {
            return Err(Diagnostic::semantic(format!(
                "includes are nested deeper than {} levels",
                MAX_INCLUDE_DEPTH
            ))
            .with_span(span));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Diagnostic::semantic(format!(
                "failed to read included file '{}': {}",
                path.display(),
                e
            ))
            .with_span(span)
        })?;

        let included_body = if content.starts_with("---") {
            let doc = WorkflowDocument::parse(&content).map_err(|d| {
                Diagnostic::semantic(format!("in included file '{}': {}", path.display(), d.message))
                    .with_span(span)
            })?;
            let frontmatter = parse_included_frontmatter(&doc.frontmatter, &path, span)?;
            if !frontmatter.is_empty() {
                out.includes.push(IncludedFrontmatter {
                    path: path.clone(),
                    value: frontmatter,
                });
            }
            doc.body
        } else {
            content
        };

        tracing::debug!(path = %path.display(), "Expanding include");
        let child_dir = path.parent().unwrap_or(base_dir).to_path_buf();
        stack.push(canonical);
        expand_into(&included_body, &child_dir, None, stack, out)?;
        stack.pop();

        if !out.body.ends_with('\n') {
            out.body.push('\n');
        }
    }
    Ok(())
}

fn parse_included_frontmatter(
    yaml: &str,
    path: &Path,
    span: Option<Span>,
) -> Result<serde_yaml::Mapping, Diagnostic> {
    if yaml.trim().is_empty() {
        return Ok(serde_yaml::Mapping::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| {
        Diagnostic::parse(format!(
            "failed to parse frontmatter of included file '{}': {}",
            path.display(),
            e
        ))
        .with_span(span)
    })?;
    let mapping = match value {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => serde_yaml::Mapping::new(),
        _ => {
            return Err(Diagnostic::semantic(format!(
                "frontmatter of included file '{}' must be a mapping",
                path.display()
            ))
            .with_span(span));
        }
    };
    for key in mapping.keys() {
        let name = key.as_str().unwrap_or_default();
        if !INCLUDE_FRONTMATTER_KEYS.contains(&name) {
            return Err(Diagnostic::semantic(format!(
                "included file '{}' declares '{}', but included frontmatter only supports: {}",
                path.display(),
                name,
                INCLUDE_FRONTMATTER_KEYS.join(", ")
            ))
            .with_span(span));
        }
    }
    Ok(mapping)
}
