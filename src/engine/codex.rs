//! Codex engine: npm-installed CLI driven by a shell command, configured with
//! TOML.

use super::metrics::{self, LogMetrics};
use super::tool_servers::{ServerLaunch, TOOL_SERVER_CONFIG_DIR, server_launch};
use super::{
    AgenticEngine, EngineCapabilities, ExecutionRequest, ExecutionStepSpec, PROMPT_PATH,
};
use crate::frontmatter::{EngineConfig, ToolGrants};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TOKENS_USED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tokens used:\s*([\d,]+)").expect("Invalid tokens used regex")
});

pub struct CodexEngine;

impl AgenticEngine for CodexEngine {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex"
    }

    fn description(&self) -> &'static str {
        "Uses the Codex CLI with stdio tool servers (experimental)"
    }

    fn is_experimental(&self) -> bool {
        true
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            tool_allowlist: false,
            http_servers: false,
            max_turns: false,
        }
    }

    fn setup_steps(&self, config: &EngineConfig) -> Vec<ExecutionStepSpec> {
        let package = match &config.version {
            Some(version) => format!("@openai/codex@{}", version),
            None => "@openai/codex".to_string(),
        };
        vec![
            ExecutionStepSpec::uses("Setup Node.js", "actions/setup-node@v4")
                .with_input("node-version", "24"),
            ExecutionStepSpec::run("Install Codex", format!("npm install -g {}", package)),
        ]
    }

    fn execution_config(&self, request: &ExecutionRequest<'_>) -> ExecutionStepSpec {
        let config = request.engine_config;
        let model = config
            .model
            .as_deref()
            .map(|model| format!(" -c model={}", shell_words::quote(model)))
            .unwrap_or_default();

        let script = format!(
            "set -o pipefail\n\
             INSTRUCTION=$(cat {prompt})\n\
             export CODEX_HOME={home}\n\
             mkdir -p \"$CODEX_HOME/logs\"\n\
             codex{model} exec --full-auto \"$INSTRUCTION\" 2>&1 | tee {log}\n",
            prompt = PROMPT_PATH,
            home = TOOL_SERVER_CONFIG_DIR,
            model = model,
            log = shell_words::quote(request.log_path),
        );

        let mut step = ExecutionStepSpec::run("Run Codex", script)
            .with_env("OPENAI_API_KEY", "${{ secrets.OPENAI_API_KEY }}");
        if request.has_safe_outputs {
            step = step.with_env("GH_AW_SAFE_OUTPUTS", "${{ env.GH_AW_SAFE_OUTPUTS }}");
        }
        step.with_envs(&config.env)
    }

    fn tool_server_config_path(&self) -> String {
        format!("{}/config.toml", TOOL_SERVER_CONFIG_DIR)
    }

    fn tool_server_env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("CODEX_HOME".to_string(), TOOL_SERVER_CONFIG_DIR.to_string())])
    }

    fn render_tool_server_config(&self, out: &mut String, grants: &ToolGrants, names: &[String]) {
        out.push_str("[history]\npersistence = \"none\"\n");
        for name in names {
            let Some(ServerLaunch::Stdio { command, args, env }) = server_launch(name, grants) else {
                continue;
            };
            out.push_str(&format!("\n[mcp_servers.{}]\n", toml_key(name)));
            out.push_str(&format!("command = {}\n", toml::Value::String(command)));
            let args = args.into_iter().map(toml::Value::String).collect();
            out.push_str(&format!("args = {}\n", toml::Value::Array(args)));
            if !env.is_empty() {
                let table: toml::Table = env
                    .into_iter()
                    .map(|(key, value)| (key, toml::Value::String(value)))
                    .collect();
                out.push_str(&format!("env = {}\n", toml::Value::Table(table)));
            }
        }
    }

    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics {
        metrics::scan_lines(log, Some(&TOKENS_USED), verbose)
    }
}

/// A bare TOML key, quoted when it contains anything beyond `A-Za-z0-9_-`.
fn toml_key(name: &str) -> String {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        name.to_string()
    } else {
        toml::Value::String(name.to_string()).to_string()
    }
}
