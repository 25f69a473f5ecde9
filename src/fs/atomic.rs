//! Atomic writes for generated pipeline files.
//!
//! A lock file is written to a temporary sibling, synced, and renamed over the
//! target, so a CI checkout never sees a half-written pipeline. The rename is
//! atomic when source and target share a filesystem, which holds because the
//! temporary file lives in the target's directory. A crash may leave a
//! `.{filename}.{pid}.tmp` file behind.

use crate::error::{CompileError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write `content` to `path`, creating parent directories.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            CompileError::UserError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        CompileError::UserError(format!("failed to replace '{}': {}", path.display(), e))
    })?;

    #[cfg(unix)]
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CompileError::UserError(format!("invalid output path '{}'", target.display()))
        })?;
    let temp_name = format!(".{}.{}.tmp", filename, std::process::id());
    Ok(match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        CompileError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            CompileError::UserError(format!("failed to write temporary file: {}", e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("triage.lock.yml");

        atomic_write_file(&file_path, "jobs: {}\n").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "jobs: {}\n");
    }

    #[test]
    fn replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("triage.lock.yml");
        fs::write(&file_path, "old").unwrap();

        atomic_write(&file_path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new");
    }

    #[test]
    fn creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join(".github").join("workflows").join("a.lock.yml");

        atomic_write(&file_path, b"x").unwrap();

        assert!(file_path.is_file());
    }

    #[test]
    fn leaves_no_temporary_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("a.lock.yml");

        atomic_write(&file_path, b"content").unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/repo/.github/workflows/a.lock.yml")).unwrap();
        assert_eq!(temp.parent().unwrap(), Path::new("/repo/.github/workflows"));
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".a.lock.yml."));
        assert!(name.ends_with(".tmp"));
    }
}
