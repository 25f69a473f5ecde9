//! The activation and agent jobs.

use super::graph::JobSpec;
use super::prompt::{build_prompt, prompt_step, uses_activation_text};
use super::proxy::{self, heredoc};
use super::safe_output_jobs::{AGENT_JOB, PATCH_ARTIFACT, PATCH_PATH};
use crate::config::CompilerConfig;
use crate::engine::{AgenticEngine, ExecutionRequest, ExecutionStepSpec, StepInput};
use crate::error::Result;
use crate::frontmatter::{PermissionLevel, Permissions, ParsedConfiguration, ToolGrants};
use serde_yaml::Value;
use std::collections::BTreeMap;

pub const ACTIVATION_JOB: &str = "activation";

/// Agent job timeout when the workflow sets none.
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 15;

/// File the output collector reads agent requests from.
pub const SAFE_OUTPUTS_FILE: &str = "/tmp/aw-outputs/output.jsonl";

/// Everything the job builders read.
pub struct JobInputs<'a> {
    pub workflow_id: &'a str,
    pub workflow_name: &'a str,
    /// Prompt body after include expansion.
    pub body: &'a str,
    pub config: &'a ParsedConfiguration,
    /// Tool grants after normalization.
    pub grants: &'a ToolGrants,
    pub engine: &'a dyn AgenticEngine,
    pub compiler: &'a CompilerConfig,
    pub runs_on: &'a Value,
}

impl JobInputs<'_> {
    fn log_path(&self) -> String {
        format!("/tmp/{}.log", self.workflow_id)
    }

    fn has_safe_outputs(&self) -> bool {
        !self.config.safe_outputs.is_empty()
    }
}

/// Tool grants as the engine sees them.
///
/// Repository-mutating safe outputs add the git commands (a union, never a
/// replacement) and the GitHub tool server gets a pinned image.
pub fn effective_grants(config: &ParsedConfiguration, compiler: &CompilerConfig) -> ToolGrants {
    let mut grants = if config.safe_outputs.requires_repository_mutation() {
        config.tools.with_git_commands()
    } else {
        config.tools.clone()
    };
    if grants.github.image_version.is_none() {
        grants.github.image_version = Some(compiler.github_mcp_version.clone());
    }
    grants
}

/// Whether the pipeline needs an activation job in front of the agent.
pub fn needs_activation(config: &ParsedConfiguration, body: &str) -> bool {
    config.condition.is_some()
        || config.triggers.command.is_some()
        || config.triggers.stop_after.is_some()
        || uses_activation_text(body)
}

// ============================================================================
// Activation job
// ============================================================================

pub fn activation_job(inputs: &JobInputs<'_>, guard: Option<String>) -> JobSpec {
    let config = inputs.config;
    let mut scopes = BTreeMap::from([("contents".to_string(), PermissionLevel::Read)]);
    if config.triggers.stop_after.is_some() {
        scopes.insert("actions".to_string(), PermissionLevel::Write);
    }

    let mut job = JobSpec::new(ACTIVATION_JOB, inputs.runs_on.clone(), Permissions::Scoped(scopes))
        .with_condition(guard);

    let mut marker = true;
    if let Some(stop_after) = config.triggers.stop_after {
        let stop_time = stop_after.format("%Y-%m-%d %H:%M:%S").to_string();
        let script = format!(
            "STOP_TIME=\"{stop_time}\"\n\
             echo \"Stop time: $STOP_TIME\"\n\
             if [ \"$(date -u +%s)\" -ge \"$(date -u -d \"$STOP_TIME\" +%s)\" ]; then\n  \
             echo \"::warning::Stop time reached, disabling workflow\"\n  \
             gh workflow disable \"$GITHUB_WORKFLOW\" || true\n  \
             exit 1\n\
             fi\n",
        );
        job = job.step(
            ExecutionStepSpec::run("Check stop time", script).with_env("GH_TOKEN", "${{ github.token }}"),
        );
        marker = false;
    }

    if uses_activation_text(inputs.body) {
        job = job
            .step(
                ExecutionStepSpec::uses("Compute current body text", inputs.compiler.action_ref("compute-text"))
                    .with_id("compute_text"),
            )
            .with_output("text", "${{ steps.compute_text.outputs.text }}");
        marker = false;
    }

    if marker {
        job = job.step(ExecutionStepSpec::run("Activation passed", "echo \"Activation passed\""));
    }
    job
}

// ============================================================================
// Agent job
// ============================================================================

pub fn agent_job(inputs: &JobInputs<'_>, after_activation: bool) -> Result<JobSpec> {
    let config = inputs.config;
    let engine = inputs.engine;
    let timeout = config.timeout_minutes.unwrap_or(DEFAULT_TIMEOUT_MINUTES);
    let log_path = inputs.log_path();
    let mutates_repository = config.safe_outputs.requires_repository_mutation();

    let mut job = JobSpec::new(AGENT_JOB, inputs.runs_on.clone(), config.permissions.clone())
        .with_timeout(timeout);
    if after_activation {
        job = job.needs(ACTIVATION_JOB);
    }
    job.env = config.env.clone();

    job = job.step(ExecutionStepSpec::uses("Checkout repository", "actions/checkout@v4"));
    for step in cache_steps(config) {
        job = job.step(step);
    }
    for step in config.steps.iter().filter_map(ExecutionStepSpec::from_mapping) {
        job = job.step(step);
    }

    if inputs.has_safe_outputs() {
        job = job
            .with_env("GH_AW_SAFE_OUTPUTS", SAFE_OUTPUTS_FILE)
            .with_env("GH_AW_SAFE_OUTPUTS_CONFIG", config.safe_outputs.to_config_json())
            .with_output("output", "${{ steps.collect_output.outputs.output }}")
            .step(ExecutionStepSpec::run(
                "Setup safe outputs collector",
                "mkdir -p \"$(dirname \"$GH_AW_SAFE_OUTPUTS\")\"\ntouch \"$GH_AW_SAFE_OUTPUTS\"\n",
            ));
    }

    for step in engine.installation_steps(&config.engine) {
        job = job.step(step);
    }

    if let Some(step) = proxy::setup_step(&proxy::plan(inputs.grants)?)? {
        job = job.step(step);
    }
    job = job.step(tool_server_step(engine, inputs.grants));
    job = job.step(prompt_step(&build_prompt(inputs.body, &config.safe_outputs)));

    let allowed_tools = engine.allowed_tools(inputs.grants);
    let request = ExecutionRequest {
        workflow_name: inputs.workflow_name,
        log_path: &log_path,
        engine_config: &config.engine,
        network: config.network.as_ref(),
        has_safe_outputs: inputs.has_safe_outputs(),
        allowed_tools: allowed_tools.as_deref(),
        timeout_minutes: timeout,
    };
    job = job.step(engine.execution_config(&request));
    for step in engine.log_capture_steps(&log_path) {
        job = job.step(step);
    }

    if inputs.has_safe_outputs() {
        let mut collect = ExecutionStepSpec::uses("Collect agent output", inputs.compiler.action_ref("collect-output"))
            .with_id("collect_output")
            .with_env("GH_AW_SAFE_OUTPUTS", "${{ env.GH_AW_SAFE_OUTPUTS }}")
            .with_env("GH_AW_SAFE_OUTPUTS_CONFIG", "${{ env.GH_AW_SAFE_OUTPUTS_CONFIG }}");
        if !config.allow_domains.is_empty() {
            collect = collect.with_env("GH_AW_ALLOWED_DOMAINS", config.allow_domains.join(","));
        }
        job = job.step(collect);
    }

    if mutates_repository {
        job = job.step(patch_step());
    }

    job = job.step(upload_step("Upload agent log", "agent-log", &log_path));
    let declared = engine.declared_output_files();
    if !declared.is_empty() {
        job = job.step(upload_step("Upload engine output files", "agent-outputs", &declared.join("\n")));
    }
    if mutates_repository {
        job = job.step(upload_step("Upload git patch", PATCH_ARTIFACT, PATCH_PATH));
    }
    Ok(job)
}

fn cache_steps(config: &ParsedConfiguration) -> Vec<ExecutionStepSpec> {
    config
        .cache
        .iter()
        .map(|entry| {
            let mut step = ExecutionStepSpec::uses("Restore cache", "actions/cache@v4")
                .with_input("key", entry.key.as_str())
                .with_input("path", entry.paths.join("\n"));
            if !entry.restore_keys.is_empty() {
                step = step.with_input("restore-keys", entry.restore_keys.join("\n"));
            }
            if let Some(size) = entry.upload_chunk_size {
                step = step.with_input("upload-chunk-size", StepInput::Int(i64::try_from(size).unwrap_or(i64::MAX)));
            }
            if let Some(fail) = entry.fail_on_cache_miss {
                step = step.with_input("fail-on-cache-miss", fail);
            }
            if let Some(lookup) = entry.lookup_only {
                step = step.with_input("lookup-only", lookup);
            }
            step
        })
        .collect()
}

fn tool_server_step(engine: &dyn AgenticEngine, grants: &ToolGrants) -> ExecutionStepSpec {
    let path = engine.tool_server_config_path();
    let mut config = String::new();
    engine.render_tool_server_config(&mut config, grants, &grants.server_names());

    let mut script = String::new();
    if let Some((dir, _)) = path.rsplit_once('/') {
        script.push_str(&format!("mkdir -p {}\n", dir));
    }
    script.push_str(&heredoc(&path, &config));
    ExecutionStepSpec::run("Setup tool servers", script).with_envs(&engine.tool_server_env())
}

fn patch_step() -> ExecutionStepSpec {
    let script = format!(
        "git add -A\n\
         if ! git diff --cached --quiet; then\n  \
         git -c user.name=\"awflow\" -c user.email=\"awflow@users.noreply.github.com\" \
         commit -m \"Agent changes\"\n\
         fi\n\
         git format-patch \"${{{{ github.sha }}}}..HEAD\" --stdout > {patch}\n\
         if [ ! -s {patch} ]; then\n  \
         echo \"No changes to record\"\n\
         fi\n",
        patch = PATCH_PATH
    );
    ExecutionStepSpec::run("Generate git patch", script).with_condition("always()")
}

fn upload_step(name: &str, artifact: &str, path: &str) -> ExecutionStepSpec {
    ExecutionStepSpec::uses(name, "actions/upload-artifact@v4")
        .with_condition("always()")
        .with_input("name", artifact)
        .with_input("path", path)
        .with_input("if-no-files-found", "warn")
}
