use super::*;
use crate::diagnostic::DiagnosticKind;
use std::fs;
use tempfile::TempDir;

fn compile_with(source: &str, engine: Option<&str>) -> Result<CompiledWorkflow> {
    let config = CompilerConfig::default();
    Compiler::new(EngineRegistry::global(), &config)
        .with_engine_override(engine)?
        .compile_source("triage.md", source, Path::new("."), "triage")
}

fn compile(source: &str) -> Result<CompiledWorkflow> {
    compile_with(source, None)
}

fn compiled_yaml(source: &str) -> Value {
    let compiled = compile(source).unwrap();
    serde_yaml::from_str(&compiled.yaml).unwrap()
}

fn diagnostics(result: Result<CompiledWorkflow>) -> Vec<Diagnostic> {
    match result {
        Err(CompileError::Failed { diagnostics, .. }) => diagnostics,
        Err(other) => panic!("expected diagnostics, got {}", other),
        Ok(_) => panic!("expected the workflow to fail"),
    }
}

fn steps(pipeline: &Value, job: &str) -> Vec<Value> {
    pipeline["jobs"][job]["steps"]
        .as_sequence()
        .cloned()
        .unwrap_or_default()
}

fn step_using<'a>(steps: &'a [Value], prefix: &str) -> &'a Value {
    steps
        .iter()
        .find(|step| step["uses"].as_str().is_some_and(|uses| uses.starts_with(prefix)))
        .unwrap_or_else(|| panic!("no step uses {}", prefix))
}

const PLAIN: &str = "---\non: push\n---\n# Weekly Digest\n\nSummarize recent commits.\n";

// ============================================================================
// Output shape
// ============================================================================

#[test]
fn test_compilation_is_deterministic() {
    let source = "---\n\
                  on:\n  command: triage\n  pull_request:\n\
                  tools:\n  edit:\n  bash: [ls]\n\
                  safe-outputs:\n  create-pull-request:\n  add-issue-comment:\n\
                  ---\n# Triage\n\nLook at ${{ needs.activation.outputs.text }}\n";
    let first = compile(source).unwrap();
    let second = compile(source).unwrap();
    assert_eq!(first.yaml, second.yaml);
}

#[test]
fn test_plain_workflow_has_only_agent_job() {
    let compiled = compile(PLAIN).unwrap();
    assert_eq!(compiled.job_ids, vec!["agent"]);
    assert_eq!(compiled.name, "Weekly Digest");
    assert_eq!(compiled.engine_id, "claude");
    assert!(compiled.yaml.starts_with(render::GENERATED_HEADER));

    let pipeline: Value = serde_yaml::from_str(&compiled.yaml).unwrap();
    assert_eq!(pipeline["name"].as_str(), Some("Weekly Digest"));
    assert!(pipeline["jobs"]["agent"].get("needs").is_none());
    assert_eq!(pipeline["jobs"]["agent"]["timeout-minutes"].as_u64(), Some(15));
    assert_eq!(pipeline["jobs"]["agent"]["runs-on"].as_str(), Some("ubuntu-latest"));
}

#[test]
fn test_agent_steps_run_in_order() {
    let source = "---\n\
                  on: push\n\
                  steps:\n  - run: make deps\n\
                  cache:\n  key: deps-${{ hashFiles('Cargo.lock') }}\n  path: target\n\
                  ---\nBuild it.\n";
    let pipeline = compiled_yaml(source);
    let names: Vec<String> = steps(&pipeline, "agent")
        .iter()
        .filter_map(|step| step["name"].as_str().map(str::to_string))
        .collect();
    let position = |name: &str| {
        names
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("missing step {}", name))
    };
    assert_eq!(position("Checkout repository"), 0);
    assert!(position("Restore cache") < position("Run custom step"));
    assert!(position("Run custom step") < position("Setup tool servers"));
    assert!(position("Setup tool servers") < position("Create prompt"));
    assert!(position("Create prompt") < position("Upload agent log"));
}

#[test]
fn test_name_falls_back_to_workflow_id() {
    let compiled = compile("---\non: push\n---\nNo heading here.\n").unwrap();
    assert_eq!(compiled.name, "triage");
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_max_turns_zero_is_positioned() {
    let found = diagnostics(compile("---\non: push\nmax-turns: 0\n---\nBody\n"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, DiagnosticKind::Schema);
    assert_eq!(found[0].path.as_deref(), Some("max-turns"));
    assert!(found[0].message.contains("must be between 1 and 100"));
    assert_eq!(found[0].span.unwrap().start_line, 3);
}

#[test]
fn test_missing_trigger_has_no_span() {
    let found = diagnostics(compile("---\nengine: claude\n---\nBody\n"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path.as_deref(), Some("on"));
    assert!(found[0].span.is_none());
}

#[test]
fn test_yaml_syntax_error_points_into_frontmatter() {
    let found = diagnostics(compile("---\non: push\nname: [unclosed\n---\nBody\n"));
    assert_eq!(found[0].kind, DiagnosticKind::Parse);
    let line = found[0].span.unwrap().start_line;
    assert!((2..=4).contains(&line), "line {} outside frontmatter", line);
}

#[test]
fn test_unknown_engine_in_document() {
    let found = diagnostics(compile("---\non: push\nengine: gpt\n---\nBody\n"));
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("unknown engine 'gpt'"));
    assert_eq!(found[0].span.unwrap().start_line, 3);
    assert!(found[0].hint.as_deref().unwrap().contains("claude, codex, gemini"));
}

#[test]
fn test_unknown_engine_override_is_rejected_up_front() {
    let err = compile_with(PLAIN, Some("gpt")).unwrap_err();
    assert!(matches!(err, CompileError::UnknownEngine { .. }));
    assert!(err.to_string().contains("unknown engine"));
}

#[test]
fn test_prefixed_engine_override_resolves() {
    let compiled = compile_with(PLAIN, Some("codex-experimental")).unwrap();
    assert_eq!(compiled.engine_id, "codex");
}

#[test]
fn test_http_server_requires_capable_engine() {
    let source = "---\n\
                  on: push\n\
                  engine: codex\n\
                  tools:\n  remote:\n    mcp:\n      type: http\n      url: https://mcp.example.com\n\
                  ---\nBody\n";
    let found = diagnostics(compile(source));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path.as_deref(), Some("tools.remote"));
    assert!(found[0].message.contains("http transport"));
    assert_eq!(found[0].span.unwrap().start_line, 5);
}

#[test]
fn test_max_turns_is_dropped_for_engine_without_support() {
    let source = "---\non: push\nengine: codex\nmax-turns: 5\n---\nBody\n";
    let compiled = compile(source).unwrap();
    assert_eq!(compiled.engine_id, "codex");

    let pipeline = compiled_yaml("---\non: push\nmax-turns: 5\n---\nBody\n");
    let agent = steps(&pipeline, "agent");
    let claude = step_using(&agent, "anthropics/claude-code-base-action");
    assert_eq!(claude["with"]["max_turns"].as_u64(), Some(5));
}

// ============================================================================
// Triggers, guards and concurrency
// ============================================================================

#[test]
fn test_pull_request_only_workflow_cancels_in_progress() {
    let pipeline = compiled_yaml("---\non:\n  pull_request:\n    types: [opened]\n---\nReview.\n");
    let concurrency = &pipeline["concurrency"];
    assert_eq!(concurrency["cancel-in-progress"].as_bool(), Some(true));
    assert!(
        concurrency["group"]
            .as_str()
            .unwrap()
            .contains("github.event.pull_request.number")
    );
}

#[test]
fn test_command_workflow_never_cancels() {
    let source = "---\non:\n  command: triage\n  pull_request:\n  workflow_dispatch:\n---\nTriage.\n";
    let compiled = compile(source).unwrap();
    assert_eq!(compiled.job_ids, vec!["activation", "agent"]);

    let pipeline: Value = serde_yaml::from_str(&compiled.yaml).unwrap();
    assert!(pipeline["concurrency"].get("cancel-in-progress").is_none());
    assert_eq!(pipeline["jobs"]["agent"]["needs"].as_str(), Some("activation"));

    let guard = pipeline["jobs"]["activation"]["if"].as_str().unwrap();
    assert!(guard.contains("/triage"));
    assert!(guard.contains("github.event_name == 'issues'"));
    assert!(pipeline["on"].get("issue_comment").is_some());
}

#[test]
fn test_discussion_workflow_groups_by_discussion_number() {
    let pipeline = compiled_yaml("---\non:\n  discussion:\n    types: [created]\n---\nAnswer.\n");
    assert_eq!(
        pipeline["concurrency"]["group"].as_str(),
        Some("awflow-${{ github.workflow }}-${{ github.event.discussion.number }}")
    );
    assert!(pipeline["concurrency"].get("cancel-in-progress").is_none());
}

#[test]
fn test_mixed_triggers_prefer_issue_then_pull_request_then_discussion() {
    let source = "---\non:\n  discussion:\n  pull_request:\n  issues:\n---\nTriage.\n";
    let pipeline = compiled_yaml(source);
    assert_eq!(
        pipeline["concurrency"]["group"].as_str(),
        Some(
            "awflow-${{ github.workflow }}-${{ github.event.issue.number || \
             github.event.pull_request.number || github.event.discussion.number }}"
        )
    );
}

#[test]
fn test_explicit_condition_guards_activation() {
    let source = "---\non: push\nif: ${{ github.actor != 'dependabot[bot]' }}\n---\nBody\n";
    let pipeline = compiled_yaml(source);
    assert_eq!(
        pipeline["jobs"]["activation"]["if"].as_str(),
        Some("github.actor != 'dependabot[bot]'")
    );
    let activation = steps(&pipeline, "activation");
    assert_eq!(activation.len(), 1);
    assert_eq!(activation[0]["name"].as_str(), Some("Activation passed"));
}

#[test]
fn test_activation_text_adds_compute_step() {
    let source = "---\non:\n  issues:\n---\nSummarize ${{ needs.activation.outputs.text }}\n";
    let pipeline = compiled_yaml(source);
    let activation = steps(&pipeline, "activation");
    assert_eq!(activation[0]["id"].as_str(), Some("compute_text"));
    assert_eq!(
        pipeline["jobs"]["activation"]["outputs"]["text"].as_str(),
        Some("${{ steps.compute_text.outputs.text }}")
    );
    assert!(pipeline["jobs"]["activation"].get("if").is_none());

    let agent = steps(&pipeline, "agent");
    let prompt = agent
        .iter()
        .find(|step| step["name"].as_str() == Some("Create prompt"))
        .unwrap();
    assert!(!prompt["run"].as_str().unwrap().contains("needs.activation"));
    assert_eq!(
        prompt["env"]["GH_AW_ACTIVATION_TEXT"].as_str(),
        Some("${{ needs.activation.outputs.text }}")
    );
}

#[test]
fn test_stop_after_checks_time_in_activation() {
    let source = "---\non:\n  schedule:\n    - cron: '0 9 * * 1'\n  stop-after: 2030-01-01 00:00:00\n---\nBody\n";
    let pipeline = compiled_yaml(source);
    let activation = steps(&pipeline, "activation");
    let script = activation[0]["run"].as_str().unwrap();
    assert!(script.contains("STOP_TIME=\"2030-01-01 00:00:00\""));
    assert_eq!(
        pipeline["jobs"]["activation"]["permissions"]["actions"].as_str(),
        Some("write")
    );
    assert!(pipeline["on"].get("stop-after").is_none());
}

// ============================================================================
// Safe outputs and grants
// ============================================================================

#[test]
fn test_pull_request_output_gets_guarded_job() {
    let source = "---\non: push\nsafe-outputs:\n  create-pull-request:\n---\nFix the typo.\n";
    let compiled = compile(source).unwrap();
    assert_eq!(compiled.job_ids, vec!["agent", "create_pull_request"]);

    let pipeline: Value = serde_yaml::from_str(&compiled.yaml).unwrap();
    let job = &pipeline["jobs"]["create_pull_request"];
    assert_eq!(job["needs"].as_str(), Some("agent"));
    assert!(
        job["if"]
            .as_str()
            .unwrap()
            .contains("github.event.pull_request.head.repo.full_name == github.repository")
    );
    assert_eq!(job["permissions"]["contents"].as_str(), Some("write"));
    assert_eq!(
        job["env"]["GH_AW_AGENT_OUTPUT"].as_str(),
        Some("${{ needs.agent.outputs.output }}")
    );

    let agent = steps(&pipeline, "agent");
    assert!(agent.iter().any(|step| step["name"].as_str() == Some("Generate git patch")));
    let upload = agent
        .iter()
        .find(|step| step["name"].as_str() == Some("Upload git patch"))
        .unwrap();
    assert_eq!(upload["with"]["name"].as_str(), Some("aw.patch"));
}

#[test]
fn test_repository_mutation_widens_bash_grant() {
    let source = "---\n\
                  on: push\n\
                  tools:\n  bash: [ls]\n\
                  safe-outputs:\n  push-to-branch:\n    branch: docs\n\
                  ---\nUpdate the docs.\n";
    let pipeline = compiled_yaml(source);
    let agent = steps(&pipeline, "agent");
    let claude = step_using(&agent, "anthropics/claude-code-base-action");
    let allowed = claude["with"]["allowed_tools"].as_str().unwrap();
    assert!(allowed.contains("Bash(ls)"));
    assert!(allowed.contains("Bash(git commit:*)"));
    assert!(allowed.contains("Bash(git add:*)"));
}

#[test]
fn test_safe_outputs_wire_collector() {
    let source = "---\n\
                  on:\n  issues:\n\
                  allow-domains: [github.com, example.com]\n\
                  safe-outputs:\n  add-issue-comment:\n\
                  ---\nReply.\n";
    let pipeline = compiled_yaml(source);
    let agent = &pipeline["jobs"]["agent"];
    assert_eq!(agent["env"]["GH_AW_SAFE_OUTPUTS"].as_str(), Some(jobs::SAFE_OUTPUTS_FILE));
    assert!(agent["env"]["GH_AW_SAFE_OUTPUTS_CONFIG"].as_str().unwrap().contains("add-issue-comment"));
    assert_eq!(
        agent["outputs"]["output"].as_str(),
        Some("${{ steps.collect_output.outputs.output }}")
    );

    let collect = step_using(&steps(&pipeline, "agent"), "awflow/actions/collect-output").clone();
    assert_eq!(collect["id"].as_str(), Some("collect_output"));
    assert_eq!(
        collect["env"]["GH_AW_ALLOWED_DOMAINS"].as_str(),
        Some("github.com,example.com")
    );
    assert!(pipeline["jobs"]["add_issue_comment"]["if"].is_string());
}

#[test]
fn test_wildcard_comment_target_is_not_guarded() {
    let source = "---\n\
                  on:\n  schedule:\n    - cron: '0 9 * * 1'\n\
                  safe-outputs:\n  add-issue-comment:\n    target: \"*\"\n\
                  ---\nReport.\n";
    let pipeline = compiled_yaml(source);
    let job = &pipeline["jobs"]["add_issue_comment"];
    assert!(job.get("if").is_none());
    assert_eq!(job["needs"].as_str(), Some("agent"));
    assert_eq!(job["env"]["GH_AW_COMMENT_TARGET"].as_str(), Some("*"));
}

// ============================================================================
// Files and includes
// ============================================================================

#[test]
fn test_include_is_expanded_into_prompt() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("shared.md"), "Always be polite.\n").unwrap();
    let main = temp.path().join("triage.md");
    fs::write(&main, "---\non: push\n---\n# Triage\n@include shared.md\n").unwrap();

    let config = CompilerConfig::default();
    let compiled = Compiler::new(EngineRegistry::global(), &config)
        .compile_file(&main)
        .unwrap();
    assert!(compiled.yaml.contains("Always be polite."));
    assert!(!compiled.yaml.contains("@include"));
}

#[test]
fn test_included_engine_conflict_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("shared.md"), "---\nengine: codex\n---\nShared.\n").unwrap();
    let main = temp.path().join("triage.md");
    fs::write(&main, "---\non: push\nengine: claude\n---\n@include shared.md\n").unwrap();

    let config = CompilerConfig::default();
    let result = Compiler::new(EngineRegistry::global(), &config).compile_file(&main);
    let found = diagnostics(result);
    assert!(found[0].message.contains("engine conflict"));
    assert_eq!(found[0].span.unwrap().start_line, 3);
}

#[test]
fn test_check_file_reports_resolved_engine() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("digest.md");
    fs::write(&path, PLAIN).unwrap();

    let config = CompilerConfig::default();
    let checked = Compiler::new(EngineRegistry::global(), &config)
        .check_file(&path)
        .unwrap();
    assert_eq!(checked.workflow_id, "digest");
    assert_eq!(checked.name, "Weekly Digest");
    assert_eq!(checked.engine_id, "claude");
}

#[test]
fn test_missing_file_is_user_error() {
    let temp = TempDir::new().unwrap();
    let config = CompilerConfig::default();
    let err = Compiler::new(EngineRegistry::global(), &config)
        .compile_file(&temp.path().join("absent.md"))
        .unwrap_err();
    assert!(matches!(err, CompileError::UserError(_)));
}

#[test]
fn test_lock_path_replaces_extension() {
    assert_eq!(
        lock_path(Path::new(".github/workflows/triage.md")),
        PathBuf::from(".github/workflows/triage.lock.yml")
    );
}
