//! Execution engines.
//!
//! Everything that differs between AI backends sits behind [`AgenticEngine`]:
//! how the engine is installed, how it is invoked, which tools it may call,
//! how its tool servers are wired, and how its logs are read back. The set of
//! engines is fixed at build time and lives in the [`EngineRegistry`].

pub mod claude;
pub mod codex;
pub mod gemini;
mod metrics;
mod registry;
mod tool_servers;


pub use metrics::LogMetrics;
pub use registry::EngineRegistry;
pub use tool_servers::{DEFAULT_GITHUB_MCP_VERSION, TOOL_SERVER_CONFIG_DIR, proxy_dir};

use crate::frontmatter::{EngineConfig, NetworkPolicy, ToolGrants};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Path of the prompt file written before execution.
pub const PROMPT_PATH: &str = "/tmp/aw-prompts/prompt.txt";

/// What an engine supports beyond running a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineCapabilities {
    /// Tools must be allow-listed by name.
    pub tool_allowlist: bool,
    /// Tool servers reachable over HTTP.
    pub http_servers: bool,
    /// A maximum number of agent turns can be set.
    pub max_turns: bool,
}

/// A typed input of a reusable action step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Serialize for StepInput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StepInput::Str(text) => serializer.serialize_str(text),
            StepInput::Int(number) => serializer.serialize_i64(*number),
            StepInput::Bool(flag) => serializer.serialize_bool(*flag),
        }
    }
}

impl From<&str> for StepInput {
    fn from(text: &str) -> Self {
        StepInput::Str(text.to_string())
    }
}

impl From<String> for StepInput {
    fn from(text: String) -> Self {
        StepInput::Str(text)
    }
}

impl From<u32> for StepInput {
    fn from(number: u32) -> Self {
        StepInput::Int(i64::from(number))
    }
}

impl From<bool> for StepInput {
    fn from(flag: bool) -> Self {
        StepInput::Bool(flag)
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// A reusable action reference with inputs.
    Uses {
        uses: String,
        with: BTreeMap<String, StepInput>,
    },
    /// A shell script.
    Run { run: String },
}

/// One generated step.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStepSpec {
    pub name: String,
    pub id: Option<String>,
    pub condition: Option<String>,
    pub action: StepAction,
    pub env: BTreeMap<String, String>,
    /// Other step keys passed through unchanged (`shell`, `timeout-minutes`, ...).
    pub extra: BTreeMap<String, Value>,
}

impl ExecutionStepSpec {
    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(name, StepAction::Run { run: script.into() })
    }

    pub fn uses(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(
            name,
            StepAction::Uses {
                uses: action.into(),
                with: BTreeMap::new(),
            },
        )
    }

    fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            id: None,
            condition: None,
            action,
            env: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Add an action input. Ignored for run steps.
    pub fn with_input(mut self, key: &str, value: impl Into<StepInput>) -> Self {
        if let StepAction::Uses { with, .. } = &mut self.action {
            with.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    pub fn with_envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(key, value)| (key.clone(), value.clone())));
        self
    }

    /// Build a step from an author-written step mapping.
    ///
    /// Returns `None` when the mapping has neither `uses` nor `run`.
    pub fn from_mapping(step: &Mapping) -> Option<Self> {
        let text = |key: &str| step.get(key).and_then(Value::as_str).map(str::to_string);
        let action = match (text("uses"), text("run")) {
            (Some(uses), _) => {
                let with = step
                    .get("with")
                    .and_then(Value::as_mapping)
                    .map(|inputs| {
                        inputs
                            .iter()
                            .filter_map(|(key, value)| {
                                let key = key.as_str()?.to_string();
                                let input = match value {
                                    Value::Bool(flag) => StepInput::Bool(*flag),
                                    Value::Number(n) if n.is_i64() => StepInput::Int(n.as_i64()?),
                                    other => StepInput::Str(crate::frontmatter::scalar_text(other)),
                                };
                                Some((key, input))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                StepAction::Uses { uses, with }
            }
            (None, Some(run)) => StepAction::Run { run },
            (None, None) => return None,
        };

        let env = step
            .get("env")
            .and_then(Value::as_mapping)
            .map(|env| {
                env.iter()
                    .filter_map(|(key, value)| {
                        Some((key.as_str()?.to_string(), crate::frontmatter::scalar_text(value)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let extra = step
            .iter()
            .filter_map(|(key, value)| {
                let key = key.as_str()?;
                (!matches!(key, "name" | "id" | "if" | "uses" | "run" | "with" | "env"))
                    .then(|| (key.to_string(), value.clone()))
            })
            .collect();

        let name = text("name").unwrap_or_else(|| match &action {
            StepAction::Uses { uses, .. } => format!("Run {}", uses),
            StepAction::Run { .. } => "Run custom step".to_string(),
        });

        Some(Self {
            name,
            id: text("id"),
            condition: text("if"),
            action,
            env,
            extra,
        })
    }
}

/// Inputs to [`AgenticEngine::execution_config`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub workflow_name: &'a str,
    /// File the engine's log must end up in.
    pub log_path: &'a str,
    pub engine_config: &'a EngineConfig,
    pub network: Option<&'a NetworkPolicy>,
    /// Whether safe outputs are enabled (the collector variable is passed through).
    pub has_safe_outputs: bool,
    /// Native tool names the engine may call, for engines that allow-list.
    pub allowed_tools: Option<&'a [String]>,
    pub timeout_minutes: u32,
}

/// The capability contract every engine implements.
pub trait AgenticEngine: Send + Sync {
    fn id(&self) -> &'static str;
    fn display_name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    fn is_experimental(&self) -> bool {
        false
    }

    fn capabilities(&self) -> EngineCapabilities;

    /// Glob patterns of files the engine writes that are uploaded as artifacts.
    fn declared_output_files(&self) -> Vec<String> {
        Vec::new()
    }

    /// Engine-specific steps run before execution.
    fn setup_steps(&self, config: &EngineConfig) -> Vec<ExecutionStepSpec>;

    /// Setup steps followed by the author's `engine.steps`.
    fn installation_steps(&self, config: &EngineConfig) -> Vec<ExecutionStepSpec> {
        let mut steps = self.setup_steps(config);
        steps.extend(config.steps.iter().filter_map(ExecutionStepSpec::from_mapping));
        steps
    }

    /// The step that runs the agent.
    fn execution_config(&self, request: &ExecutionRequest<'_>) -> ExecutionStepSpec;

    /// Steps that move the engine's log to the log path after execution.
    fn log_capture_steps(&self, _log_path: &str) -> Vec<ExecutionStepSpec> {
        Vec::new()
    }

    /// Native tool names for the granted capabilities, or `None` when the
    /// engine does not allow-list tools.
    fn allowed_tools(&self, _grants: &ToolGrants) -> Option<Vec<String>> {
        None
    }

    /// Where the tool-server configuration file is written.
    fn tool_server_config_path(&self) -> String;

    /// Environment the engine needs to find its tool-server configuration.
    fn tool_server_env(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Append the engine's native tool-server configuration for `names`.
    fn render_tool_server_config(&self, out: &mut String, grants: &ToolGrants, names: &[String]);

    /// Read error/warning counts, token usage and cost from a run log.
    /// Never fails; unreadable fragments are skipped.
    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics;
}
