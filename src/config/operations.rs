//! Config loading and validation.

use super::model::CompilerConfig;
use crate::error::{CompileError, Result};
use std::path::Path;

/// Location of the config file relative to the repository root.
pub const CONFIG_FILE: &str = ".github/awflow.yaml";

impl CompilerConfig {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load `.github/awflow.yaml` under `repo_root`, or the defaults when the
    /// file does not exist.
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(CONFIG_FILE);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let config = Self::load(&path)?;
        if !config.extra.is_empty() {
            let keys: Vec<&str> = config.extra.keys().map(String::as_str).collect();
            tracing::warn!(keys = ?keys, "Ignoring unknown config keys");
        }
        Ok(config)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CompilerConfig = if yaml.trim().is_empty() {
            CompilerConfig::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| CompileError::UserError(format!("failed to parse config YAML: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - string settings must be non-empty
    /// - `safe_output_timeout_minutes` must be positive
    /// - `workflow_glob` must be a valid glob
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("workflows_dir", &self.workflows_dir),
            ("workflow_glob", &self.workflow_glob),
            ("actions_repository", &self.actions_repository),
            ("actions_ref", &self.actions_ref),
            ("default_engine", &self.default_engine),
            ("runs_on", &self.runs_on),
            ("github_mcp_version", &self.github_mcp_version),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CompileError::UserError(format!(
                    "config validation failed: {} must not be empty",
                    name
                )));
            }
        }

        if self.safe_output_timeout_minutes == 0 {
            return Err(CompileError::UserError(
                "config validation failed: safe_output_timeout_minutes must be greater than 0"
                    .to_string(),
            ));
        }

        globset::Glob::new(&self.workflow_glob).map_err(|e| {
            CompileError::UserError(format!(
                "config validation failed: workflow_glob '{}' is invalid: {}",
                self.workflow_glob, e
            ))
        })?;

        Ok(())
    }
}
