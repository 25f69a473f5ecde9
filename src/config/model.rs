//! CompilerConfig struct definition and default implementation.

use crate::engine::DEFAULT_GITHUB_MCP_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings shared by every workflow compiled in a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    // =========================================================================
    // Discovery
    // =========================================================================
    /// Directory scanned when `compile` is run without paths.
    pub workflows_dir: String,

    /// Glob (matched against file names) selecting workflow documents.
    pub workflow_glob: String,

    // =========================================================================
    // Generated pipeline
    // =========================================================================
    /// Repository hosting the runtime actions used by generated jobs.
    pub actions_repository: String,

    /// Git ref of `actions_repository`.
    pub actions_ref: String,

    /// Engine used when a workflow does not name one.
    pub default_engine: String,

    /// Runner label for jobs whose workflow does not set `runs-on`.
    pub runs_on: String,

    /// Image tag of the GitHub tool server when the workflow does not pin one.
    pub github_mcp_version: String,

    /// Timeout of each safe-output job.
    pub safe_output_timeout_minutes: u32,

    /// Unrecognized keys, kept so newer config files still load.
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            workflows_dir: ".github/workflows".to_string(),
            workflow_glob: "*.md".to_string(),
            actions_repository: "awflow/actions".to_string(),
            actions_ref: "v1".to_string(),
            default_engine: "claude".to_string(),
            runs_on: "ubuntu-latest".to_string(),
            github_mcp_version: DEFAULT_GITHUB_MCP_VERSION.to_string(),
            safe_output_timeout_minutes: 10,
            extra: BTreeMap::new(),
        }
    }
}

impl CompilerConfig {
    /// `uses:` reference of a runtime action (`owner/repo/name@ref`).
    pub fn action_ref(&self, name: &str) -> String {
        format!("{}/{}@{}", self.actions_repository, name, self.actions_ref)
    }
}
