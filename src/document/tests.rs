//! Tests for document splitting and include expansion.

use super::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MINIMAL: &str = "---\non: push\n---\n\n# Weekly digest\nSummarize activity.\n";

#[test]
fn test_parse_minimal_document() {
    let doc = WorkflowDocument::parse(MINIMAL).unwrap();
    assert_eq!(doc.frontmatter, "on: push\n");
    assert_eq!(doc.frontmatter_line, 2);
    assert_eq!(doc.body, "\n# Weekly digest\nSummarize activity.\n");
    assert_eq!(doc.body_line(), 4);
}

#[test]
fn test_parse_crlf_document() {
    let content = "---\r\non: push\r\nengine: codex\r\n---\r\nBody\r\n";
    let doc = WorkflowDocument::parse(content).unwrap();
    assert_eq!(doc.frontmatter, "on: push\nengine: codex\n");
    assert_eq!(doc.body, "Body\n");
}

#[test]
fn test_parse_empty_frontmatter() {
    let doc = WorkflowDocument::parse("---\n---\nBody\n").unwrap();
    assert_eq!(doc.frontmatter, "");
    assert_eq!(doc.body, "Body\n");
}

#[test]
fn test_missing_opening_delimiter() {
    let err = WorkflowDocument::parse("# Just markdown\n").unwrap_err();
    assert!(err.message.contains("must start with"));
    assert_eq!(err.span.unwrap().start_line, 1);
}

#[test]
fn test_missing_closing_delimiter() {
    let err = WorkflowDocument::parse("---\non: push\nBody\n").unwrap_err();
    assert!(err.message.contains("closing"));
}

#[test]
fn test_first_heading() {
    assert_eq!(
        first_heading("\nintro\n# Issue Triage \nmore"),
        Some("Issue Triage".to_string())
    );
    assert_eq!(first_heading("## Not level one\n"), None);
}

#[test]
fn test_workflow_id_from_path() {
    assert_eq!(
        workflow_id_from_path(Path::new(".github/workflows/issue-triage.md")),
        "issue-triage"
    );
}

#[test]
fn test_include_replaces_directive_line() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("shared.md"), "Shared guidance.\n").unwrap();

    let body = "Intro\n@include shared.md\nOutro\n";
    let expanded = expand_includes(body, dir.path(), 4).unwrap();
    assert_eq!(expanded.body, "Intro\nShared guidance.\nOutro\n");
    assert!(expanded.includes.is_empty());
}

#[test]
fn test_include_collects_frontmatter() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tools.md"),
        "---\ntools:\n  web-fetch:\n---\nUse the web.\n",
    )
    .unwrap();

    let expanded = expand_includes("@include tools.md\n", dir.path(), 4).unwrap();
    assert_eq!(expanded.body, "Use the web.\n");
    assert_eq!(expanded.includes.len(), 1);
    assert!(expanded.includes[0].value.contains_key("tools"));
}

#[test]
fn test_nested_includes_resolve_relative_to_includer() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("shared")).unwrap();
    fs::write(dir.path().join("shared/a.md"), "A\n@include b.md\n").unwrap();
    fs::write(dir.path().join("shared/b.md"), "B\n").unwrap();

    let expanded = expand_includes("@include shared/a.md\n", dir.path(), 4).unwrap();
    assert_eq!(expanded.body, "A\nB\n");
}

#[test]
fn test_optional_include_may_be_missing() {
    let dir = TempDir::new().unwrap();
    let expanded = expand_includes("x\n@include? missing.md\ny\n", dir.path(), 4).unwrap();
    assert_eq!(expanded.body, "x\ny\n");
}

#[test]
fn test_required_include_missing_is_positioned() {
    let dir = TempDir::new().unwrap();
    let err = expand_includes("x\n@include missing.md\n", dir.path(), 6).unwrap_err();
    assert!(err.message.contains("not found"));
    assert_eq!(err.span.unwrap().start_line, 7);
}

#[test]
fn test_include_cycle_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.md"), "@include b.md\n").unwrap();
    fs::write(dir.path().join("b.md"), "@include a.md\n").unwrap();

    let err = expand_includes("@include a.md\n", dir.path(), 4).unwrap_err();
    assert!(err.message.contains("cycle"));
}

#[test]
fn test_included_frontmatter_rejects_other_keys() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.md"), "---\npermissions: write-all\n---\nx\n").unwrap();

    let err = expand_includes("@include bad.md\n", dir.path(), 4).unwrap_err();
    assert!(err.message.contains("only supports"));
}
