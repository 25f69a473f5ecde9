//! Claude engine: runs through a reusable action with typed inputs.

use super::metrics::{self, LogMetrics};
use super::tool_servers::{TOOL_SERVER_CONFIG_DIR, render_json_servers};
use super::{
    AgenticEngine, EngineCapabilities, ExecutionRequest, ExecutionStepSpec, PROMPT_PATH,
};
use crate::frontmatter::{BashGrant, EngineConfig, NetworkPolicy, ToolGrants};
use serde_json::{Value, json};
use std::collections::BTreeSet;

const ACTION: &str = "anthropics/claude-code-base-action";
const DEFAULT_ACTION_VERSION: &str = "v0.0.56";
const EXECUTION_STEP_ID: &str = "agentic_execution";

/// Tools Claude always has; none of them change the repository.
const DEFAULT_TOOLS: [&str; 8] = [
    "ExitPlanMode",
    "Glob",
    "Grep",
    "LS",
    "NotebookRead",
    "Read",
    "Task",
    "TodoWrite",
];

const EDIT_TOOLS: [&str; 4] = ["Edit", "MultiEdit", "NotebookEdit", "Write"];

pub struct ClaudeEngine;

impl AgenticEngine for ClaudeEngine {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    fn description(&self) -> &'static str {
        "Uses Claude Code with full tool allow-listing and tool-server support"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            tool_allowlist: true,
            http_servers: true,
            max_turns: true,
        }
    }

    fn declared_output_files(&self) -> Vec<String> {
        vec!["output.txt".to_string()]
    }

    fn setup_steps(&self, _config: &EngineConfig) -> Vec<ExecutionStepSpec> {
        Vec::new()
    }

    fn execution_config(&self, request: &ExecutionRequest<'_>) -> ExecutionStepSpec {
        let config = request.engine_config;
        let version = config.version.as_deref().unwrap_or(DEFAULT_ACTION_VERSION);

        let mut step = ExecutionStepSpec::uses("Execute Claude Code Action", format!("{}@{}", ACTION, version))
            .with_id(EXECUTION_STEP_ID)
            .with_input("prompt_file", PROMPT_PATH)
            .with_input("anthropic_api_key", "${{ secrets.ANTHROPIC_API_KEY }}")
            .with_input("mcp_config", self.tool_server_config_path())
            .with_input("timeout_minutes", request.timeout_minutes);

        if let Some(tools) = request.allowed_tools {
            step = step.with_input("allowed_tools", tools.join(","));
        }
        if let Some(max_turns) = config.max_turns {
            step = step.with_input("max_turns", max_turns);
        }
        if let Some(model) = &config.model {
            step = step.with_input("model", model.as_str());
        }
        if let Some(settings) = network_settings(request.network) {
            step = step.with_input("settings", settings);
        }

        let mut claude_env = String::new();
        if request.has_safe_outputs {
            claude_env.push_str("GH_AW_SAFE_OUTPUTS: ${{ env.GH_AW_SAFE_OUTPUTS }}\n");
            step = step.with_env("GH_AW_SAFE_OUTPUTS", "${{ env.GH_AW_SAFE_OUTPUTS }}");
        }
        for (key, value) in &config.env {
            claude_env.push_str(&format!("{}: {}\n", key, value));
        }
        if !claude_env.is_empty() {
            step = step.with_input("claude_env", claude_env);
        }
        step.with_envs(&config.env)
    }

    fn log_capture_steps(&self, log_path: &str) -> Vec<ExecutionStepSpec> {
        let script = format!(
            "if [ -f \"${{{{ steps.{id}.outputs.execution_file }}}}\" ]; then\n  \
             cp \"${{{{ steps.{id}.outputs.execution_file }}}}\" {log}\n\
             else\n  \
             echo \"No execution file output found from Agentic Action\" > {log}\n\
             fi\n",
            id = EXECUTION_STEP_ID,
            log = log_path
        );
        vec![ExecutionStepSpec::run("Capture Agentic Action logs", script).with_condition("always()")]
    }

    fn allowed_tools(&self, grants: &ToolGrants) -> Option<Vec<String>> {
        let mut tools: BTreeSet<String> = DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect();

        if grants.edit {
            tools.extend(EDIT_TOOLS.iter().map(|t| t.to_string()));
        }
        if grants.web_fetch {
            tools.insert("WebFetch".to_string());
        }
        if grants.web_search {
            tools.insert("WebSearch".to_string());
        }
        match &grants.bash {
            Some(BashGrant::Unrestricted) => {
                tools.insert("Bash".to_string());
            }
            Some(BashGrant::Commands(commands)) => {
                tools.extend(commands.iter().map(|command| format!("Bash({})", command)));
            }
            None => {}
        }

        tools.extend(
            grants
                .github
                .allowed_tools()
                .iter()
                .map(|tool| format!("mcp__github__{}", tool)),
        );
        for (name, server) in &grants.servers {
            if server.allowed.is_empty() {
                tools.insert(format!("mcp__{}", name));
            } else {
                tools.extend(server.allowed.iter().map(|tool| format!("mcp__{}__{}", name, tool)));
            }
        }
        Some(tools.into_iter().collect())
    }

    fn tool_server_config_path(&self) -> String {
        format!("{}/mcp-servers.json", TOOL_SERVER_CONFIG_DIR)
    }

    fn render_tool_server_config(&self, out: &mut String, grants: &ToolGrants, names: &[String]) {
        render_json_servers(out, grants, names, "url");
    }

    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics {
        let Ok(Value::Array(records)) = serde_json::from_str::<Value>(log.trim()) else {
            if verbose {
                tracing::debug!("Claude log is not a JSON array, scanning lines");
            }
            return metrics::scan_lines(log, None, verbose);
        };

        let mut result = LogMetrics {
            error_count: records
                .iter()
                .filter(|record| record.get("is_error").and_then(Value::as_bool) == Some(true))
                .count(),
            ..LogMetrics::default()
        };

        if let Some(last) = records
            .iter()
            .rev()
            .find(|record| record.get("type").and_then(Value::as_str) == Some("result"))
        {
            result.token_usage = metrics::token_count(last).unwrap_or(0);
            result.estimated_cost = last
                .get("total_cost_usd")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
        }
        result
    }
}

/// Claude settings restricting web fetches to the allowed domains.
fn network_settings(network: Option<&NetworkPolicy>) -> Option<String> {
    let NetworkPolicy::Allowed(domains) = network? else {
        return None;
    };
    let allow: Vec<String> = domains
        .iter()
        .map(|domain| format!("WebFetch(domain:{})", domain))
        .collect();
    let settings = json!({ "permissions": { "allow": allow, "deny": ["WebFetch"] } });
    serde_json::to_string(&settings).ok()
}
