//! Repository context resolution for awflow.
//!
//! Finds the repository root from any working directory and resolves the
//! paths commands work with: the config file and the workflows directory.
//! Outside a repository the working directory stands in for the root, so
//! single files can still be compiled.

use crate::config::{CONFIG_FILE, CompilerConfig};
use crate::error::{CompileError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Resolved paths and configuration for a compile run.
#[derive(Debug, Clone)]
pub struct RepoContext {
    /// Directory containing `.git`, or the starting directory when there is none.
    pub repo_root: PathBuf,
    /// Whether `repo_root` actually holds a `.git` entry.
    pub in_repository: bool,
    pub config: CompilerConfig,
}

impl RepoContext {
    /// Resolve the context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            CompileError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the context from a specific directory.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let cwd = cwd.as_ref();
        let (repo_root, in_repository) = match find_repo_root(cwd) {
            Some(root) => (root, true),
            None => {
                tracing::debug!(cwd = %cwd.display(), "Not inside a repository, using working directory");
                (cwd.to_path_buf(), false)
            }
        };
        let config = CompilerConfig::load_or_default(&repo_root)?;

        Ok(Self {
            repo_root,
            in_repository,
            config,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.repo_root.join(CONFIG_FILE)
    }

    /// Directory scanned when no workflow paths are given.
    pub fn workflows_dir(&self) -> PathBuf {
        self.repo_root.join(&self.config.workflows_dir)
    }
}

/// Walk up from `start` to the first directory containing a `.git` entry.
///
/// Linked worktrees carry a `.git` file rather than a directory; both count.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_repo_root_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        let nested = temp_dir.path().join(".github").join("workflows");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_repo_root(&nested).unwrap(), temp_dir.path());
    }

    #[test]
    fn test_find_repo_root_accepts_git_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(".git"), "gitdir: /elsewhere/.git/worktrees/x\n").unwrap();

        assert_eq!(find_repo_root(temp_dir.path()).unwrap(), temp_dir.path());
    }

    #[test]
    fn test_resolve_outside_repo_uses_cwd() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = RepoContext::resolve_from(temp_dir.path()).unwrap();

        // A .git in some ancestor of the temp dir would be found instead.
        if !ctx.in_repository {
            assert_eq!(ctx.repo_root, temp_dir.path());
        }
        assert_eq!(ctx.config.default_engine, "claude");
    }

    #[test]
    fn test_resolve_loads_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        std::fs::create_dir(temp_dir.path().join(".github")).unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "workflows_dir: automations\n",
        )
        .unwrap();

        let ctx = RepoContext::resolve_from(temp_dir.path()).unwrap();
        assert!(ctx.in_repository);
        assert_eq!(ctx.workflows_dir(), temp_dir.path().join("automations"));
        assert_eq!(ctx.config_path(), temp_dir.path().join(".github/awflow.yaml"));
    }

    #[test]
    fn test_resolve_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        std::fs::create_dir(temp_dir.path().join(".github")).unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "runs_on: \"\"\n").unwrap();

        let err = RepoContext::resolve_from(temp_dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::USER_ERROR);
    }
}
