//! Tests for frontmatter validation and diagnostic positioning.

use super::*;
use crate::document::WorkflowDocument;

const ENGINES: [&str; 3] = ["claude", "codex", "gemini"];

fn validate(frontmatter: &str) -> Vec<ValidationError> {
    let value = parse_frontmatter(frontmatter, 1).unwrap();
    FrontmatterValidator::new(frontmatter).validate(&value)
}

#[test]
fn test_max_turns_error_is_positioned_on_its_line() {
    let errors = validate("on: push\nengine: claude\nmax-turns: 0\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path.to_string(), "max-turns");
    assert!(errors[0].message.contains("must be between 1 and 100"));
    assert_eq!(errors[0].span.unwrap().start_line, 3);
}

#[test]
fn test_missing_required_field_has_no_span() {
    let errors = validate("engine: claude\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path.to_string(), "on");
    assert!(errors[0].span.is_none());
}

#[test]
fn test_nested_error_is_positioned() {
    let text = "on: push\nsafe-outputs:\n  create-issue:\n    max: 0\n";
    let errors = validate(text);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].span.unwrap().start_line, 4);
}

#[test]
fn test_every_violation_is_reported() {
    let text = "on: push\nmax-turns: 0\nbogus: 1\npermissions: sometimes\n";
    let errors = validate(text);
    let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(paths, vec!["max-turns", "bogus", "permissions"]);
    assert!(errors.iter().all(|e| e.span.is_some()));
}

#[test]
fn test_non_mapping_frontmatter() {
    let value = parse_frontmatter("- a\n- b\n", 1).unwrap();
    let errors = FrontmatterValidator::new("- a\n- b\n").validate(&value);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("must be a mapping"));
    assert!(errors[0].span.is_none());
}

#[test]
fn test_diagnostics_shift_into_document_lines() {
    let content = "---\non: push\nmax-turns: 0\n---\nbody\n";
    let doc = WorkflowDocument::parse(content).unwrap();
    let value = parse_frontmatter(&doc.frontmatter, doc.line_offset()).unwrap();
    let errors = FrontmatterValidator::new(&doc.frontmatter).validate(&value);
    let diagnostics = to_diagnostics(&errors, doc.line_offset(), &ENGINES);

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::Schema);
    assert_eq!(diagnostic.path.as_deref(), Some("max-turns"));
    assert_eq!(diagnostic.span.unwrap().start_line, 3);
    assert!(diagnostic.hint.as_deref().unwrap().contains("between 1 and 100"));
}

#[test]
fn test_engine_hint_lists_engines() {
    let hint = hint_for(&FieldPath::parse("engine.id"), &ENGINES).unwrap();
    assert_eq!(hint, "valid engines: claude, codex, gemini");
    let hint = hint_for(&FieldPath::parse("engine.max-turns"), &ENGINES).unwrap();
    assert!(hint.contains("between 1 and 100"));
    assert!(hint_for(&FieldPath::parse("name"), &ENGINES).is_none());
}

#[test]
fn test_yaml_syntax_error_reports_document_line() {
    let err = parse_frontmatter("on: push\nengine: [claude\n", 1).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::Parse);
    let line = err.span.unwrap().start_line;
    assert!((2..=4).contains(&line), "line {} outside frontmatter", line);
}

#[test]
fn test_empty_frontmatter_is_empty_mapping() {
    let value = parse_frontmatter("\n", 1).unwrap();
    assert!(value.as_mapping().unwrap().is_empty());
}
