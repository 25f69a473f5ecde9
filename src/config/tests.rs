//! Tests for config functionality.

use crate::config::{CONFIG_FILE, CompilerConfig};
use crate::engine::DEFAULT_GITHUB_MCP_VERSION;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = CompilerConfig::default();

    assert_eq!(config.workflows_dir, ".github/workflows");
    assert_eq!(config.workflow_glob, "*.md");
    assert_eq!(config.actions_repository, "awflow/actions");
    assert_eq!(config.actions_ref, "v1");
    assert_eq!(config.default_engine, "claude");
    assert_eq!(config.runs_on, "ubuntu-latest");
    assert_eq!(config.github_mcp_version, DEFAULT_GITHUB_MCP_VERSION);
    assert_eq!(config.safe_output_timeout_minutes, 10);
    assert!(config.extra.is_empty());
}

#[test]
fn test_parse_empty_yaml() {
    let config = CompilerConfig::from_yaml("").unwrap();
    assert_eq!(config, CompilerConfig::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
default_engine: codex
runs_on: self-hosted
"#;
    let config = CompilerConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.default_engine, "codex");
    assert_eq!(config.runs_on, "self-hosted");
    assert_eq!(config.actions_ref, "v1");
}

#[test]
fn test_unknown_fields_are_preserved() {
    let config = CompilerConfig::from_yaml("future_setting: 3\n").unwrap();
    assert!(config.extra.contains_key("future_setting"));
}

#[test]
fn test_action_ref() {
    let config = CompilerConfig::from_yaml("actions_repository: acme/aw\nactions_ref: main\n").unwrap();
    assert_eq!(config.action_ref("create-issue"), "acme/aw/create-issue@main");
}

#[test]
fn test_validate_rejects_empty_strings() {
    let err = CompilerConfig::from_yaml("actions_ref: \"\"\n").unwrap_err();
    assert!(err.to_string().contains("actions_ref must not be empty"));
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let err = CompilerConfig::from_yaml("safe_output_timeout_minutes: 0\n").unwrap_err();
    assert!(err.to_string().contains("safe_output_timeout_minutes"));
}

#[test]
fn test_validate_rejects_bad_glob() {
    let err = CompilerConfig::from_yaml("workflow_glob: \"[md\"\n").unwrap_err();
    assert!(err.to_string().contains("workflow_glob"));
}

#[test]
fn test_invalid_yaml_is_user_error() {
    let err = CompilerConfig::from_yaml("runs_on: [unclosed\n").unwrap_err();
    assert_eq!(err.exit_code(), crate::exit_codes::USER_ERROR);
    assert!(err.to_string().contains("failed to parse config YAML"));
}

#[test]
fn test_load_or_default() {
    let dir = TempDir::new().unwrap();
    let config = CompilerConfig::load_or_default(dir.path()).unwrap();
    assert_eq!(config, CompilerConfig::default());

    let path = dir.path().join(CONFIG_FILE);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "safe_output_timeout_minutes: 20\n").unwrap();
    let config = CompilerConfig::load_or_default(dir.path()).unwrap();
    assert_eq!(config.safe_output_timeout_minutes, 20);
}
