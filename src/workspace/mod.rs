//! Commit-keyed staging directory management.
//!
//! The staging directory is derived from the commit hash alone, so re-running a
//! failed release for the same commit lands in the same place and can reuse
//! whatever the earlier attempt already produced. Directories are never
//! erased here; stale directories from abandoned commits are left for the
//! operator to remove.

use crate::error::{ReleaseError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Prefix of every staging directory name
pub const STAGING_PREFIX: &str = "react-";

/// Staging directory for `commit` under `temp_root`
pub fn staging_directory(temp_root: &Path, commit: &str) -> PathBuf {
    temp_root.join(format!("{STAGING_PREFIX}{commit}"))
}

/// Outcome of ensuring the staging directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceStatus {
    /// Directory did not exist and was created
    Created,
    /// Directory already existed and was left untouched
    Reused,
}

/// Guarantees the staging directory exists before any stage runs
#[async_trait]
pub trait WorkspaceGuard: Send + Sync {
    /// Make sure `path` exists as a directory without touching existing contents
    async fn ensure(&self, path: &Path) -> Result<WorkspaceStatus>;
}

/// Filesystem-backed workspace guard
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceManager;

impl WorkspaceManager {
    /// Create a new workspace manager
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkspaceGuard for WorkspaceManager {
    async fn ensure(&self, path: &Path) -> Result<WorkspaceStatus> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                log::info!("Reusing staging directory: {}", path.display());
                return Ok(WorkspaceStatus::Reused);
            }
            Ok(_) => {
                return Err(ReleaseError::WorkspaceCreation {
                    path: path.to_path_buf(),
                    reason: "path exists and is not a directory".to_string(),
                    source: None,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ReleaseError::WorkspaceCreation {
                    path: path.to_path_buf(),
                    reason: "could not inspect path".to_string(),
                    source: Some(e),
                });
            }
        }

        log::info!("Creating staging directory: {}", path.display());
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| ReleaseError::WorkspaceCreation {
                path: path.to_path_buf(),
                reason: "could not create directory".to_string(),
                source: Some(e),
            })?;

        Ok(WorkspaceStatus::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staging_directory_is_keyed_by_commit() {
        let root = Path::new("/tmp");
        assert_eq!(
            staging_directory(root, "abc123"),
            PathBuf::from("/tmp/react-abc123")
        );
        assert_eq!(
            staging_directory(root, "abc123"),
            staging_directory(root, "abc123")
        );
        assert_ne!(
            staging_directory(root, "abc123"),
            staging_directory(root, "def456")
        );
    }

    #[tokio::test]
    async fn test_ensure_creates_missing_parents() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let target = temp.path().join("nested").join("react-abc123");

        let status = WorkspaceManager::new().ensure(&target).await.unwrap();

        assert_eq!(status, WorkspaceStatus::Created);
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent_and_preserves_contents() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let target = temp.path().join("react-abc123");
        let manager = WorkspaceManager::new();

        assert_eq!(manager.ensure(&target).await.unwrap(), WorkspaceStatus::Created);
        std::fs::write(target.join("partial.txt"), "from run 1").unwrap();

        assert_eq!(manager.ensure(&target).await.unwrap(), WorkspaceStatus::Reused);
        assert_eq!(
            std::fs::read_to_string(target.join("partial.txt")).unwrap(),
            "from run 1"
        );
    }

    #[tokio::test]
    async fn test_ensure_rejects_file_in_the_way() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let target = temp.path().join("react-abc123");
        std::fs::write(&target, "not a directory").unwrap();

        let err = WorkspaceManager::new().ensure(&target).await.unwrap_err();

        assert!(matches!(err, ReleaseError::WorkspaceCreation { source: None, .. }));
        assert!(target.is_file());
    }
}
