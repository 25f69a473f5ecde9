//! Workflow document model.
//!
//! A workflow document is a markdown file with a YAML frontmatter block
//! followed by the free-form prompt body:
//!
//! ```text
//! ---
//! on:
//!   issues:
//!     types: [opened]
//! engine: claude
//! ---
//!
//! # Issue triage
//! Read the issue and label it.
//! ```
//!
//! The frontmatter text is kept verbatim so that diagnostics can be mapped back
//! to source lines; [`WorkflowDocument::frontmatter_line`] records where it starts.

use crate::diagnostic::{Diagnostic, Span};

pub mod include;
#[cfg(test)]
mod tests;

pub use include::{ExpandedBody, IncludedFrontmatter, expand_includes};

/// A workflow document split into frontmatter and body.
#[derive(Debug, Clone)]
pub struct WorkflowDocument {
    /// Raw YAML between the `---` delimiters, with LF line endings.
    pub frontmatter: String,
    /// 1-based document line of the first frontmatter line.
    pub frontmatter_line: usize,
    /// Everything after the closing delimiter.
    pub body: String,
}

impl WorkflowDocument {
    /// Split a document into frontmatter and body.
    ///
    /// Both LF and CRLF line endings are accepted.
    pub fn parse(content: &str) -> Result<Self, Diagnostic> {
        let normalized = content.replace("\r\n", "\n");
        let normalized = normalized.strip_prefix('\u{feff}').unwrap_or(&normalized);

        let mut lines = normalized.split_inclusive('\n');
        let first = lines.next().unwrap_or("");
        if first.trim_end() != "---" {
            return Err(Diagnostic::parse(
                "workflow file must start with a '---' frontmatter delimiter",
            )
            .with_span(Some(Span::on_line(1, 1, first.trim_end().len().max(1))))
            .with_hint("add a frontmatter block with at least an 'on' trigger"));
        }

        let mut frontmatter = String::new();
        let mut consumed = first.len();
        let mut closed = false;
        for line in lines {
            consumed += line.len();
            if line.trim_end() == "---" {
                closed = true;
                break;
            }
            frontmatter.push_str(line);
        }

        if !closed {
            return Err(Diagnostic::parse(
                "workflow file is missing the closing '---' frontmatter delimiter",
            )
            .with_span(Some(Span::on_line(1, 1, 3))));
        }

        let body = normalized[consumed..].to_string();
        Ok(Self {
            frontmatter,
            frontmatter_line: 2,
            body,
        })
    }

    /// Number of document lines preceding the frontmatter text.
    pub fn line_offset(&self) -> usize {
        self.frontmatter_line - 1
    }

    /// 1-based document line on which the body starts.
    pub fn body_line(&self) -> usize {
        self.frontmatter_line + self.frontmatter.lines().count() + 1
    }
}

/// Derive the workflow id from a file name (`issue-triage.md` -> `issue-triage`).
pub fn workflow_id_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workflow".to_string())
}

/// The first level-one markdown heading in `body`, if any.
pub fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|heading| heading.trim().to_string())
        .filter(|heading| !heading.is_empty())
}
