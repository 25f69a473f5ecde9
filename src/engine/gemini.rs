//! Gemini engine: npm-installed CLI configured through a JSON settings file.

use super::metrics::{self, LogMetrics};
use super::tool_servers::render_json_servers;
use super::{
    AgenticEngine, EngineCapabilities, ExecutionRequest, ExecutionStepSpec, PROMPT_PATH,
};
use crate::frontmatter::{EngineConfig, ToolGrants};

const SETTINGS_PATH: &str = ".gemini/settings.json";

pub struct GeminiEngine;

impl AgenticEngine for GeminiEngine {
    fn id(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Gemini CLI"
    }

    fn description(&self) -> &'static str {
        "Uses the Gemini CLI with stdio and HTTP tool servers (experimental)"
    }

    fn is_experimental(&self) -> bool {
        true
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            tool_allowlist: false,
            http_servers: true,
            max_turns: false,
        }
    }

    fn setup_steps(&self, config: &EngineConfig) -> Vec<ExecutionStepSpec> {
        let package = match &config.version {
            Some(version) => format!("@google/gemini-cli@{}", version),
            None => "@google/gemini-cli".to_string(),
        };
        vec![
            ExecutionStepSpec::uses("Setup Node.js", "actions/setup-node@v4")
                .with_input("node-version", "24"),
            ExecutionStepSpec::run("Install Gemini CLI", format!("npm install -g {}", package)),
        ]
    }

    fn execution_config(&self, request: &ExecutionRequest<'_>) -> ExecutionStepSpec {
        let config = request.engine_config;
        let model = config
            .model
            .as_deref()
            .map(|model| format!(" --model {}", shell_words::quote(model)))
            .unwrap_or_default();

        let script = format!(
            "set -o pipefail\n\
             gemini{model} --yolo --prompt \"$(cat {prompt})\" 2>&1 | tee {log}\n",
            model = model,
            prompt = PROMPT_PATH,
            log = shell_words::quote(request.log_path),
        );

        let mut step = ExecutionStepSpec::run("Run Gemini CLI", script)
            .with_env("GEMINI_API_KEY", "${{ secrets.GEMINI_API_KEY }}");
        if request.has_safe_outputs {
            step = step.with_env("GH_AW_SAFE_OUTPUTS", "${{ env.GH_AW_SAFE_OUTPUTS }}");
        }
        step.with_envs(&config.env)
    }

    fn tool_server_config_path(&self) -> String {
        SETTINGS_PATH.to_string()
    }

    fn render_tool_server_config(&self, out: &mut String, grants: &ToolGrants, names: &[String]) {
        render_json_servers(out, grants, names, "httpUrl");
    }

    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics {
        metrics::scan_lines(log, None, verbose)
    }
}
