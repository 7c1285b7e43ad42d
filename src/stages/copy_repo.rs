//! Copy the canonical source tree into the staging directory.
//!
//! The copy is incremental: files already present in the staging directory
//! with the same size and a modification time no older than the source are
//! left alone, so a resumed run does not redo a finished copy. Staged files
//! whose source was deleted since the last run are pruned, so the staged tree
//! always matches the tree the checksum was computed over.

use crate::context::BuildContext;
use crate::error::StageError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

/// Directory names never copied into the staging directory
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", "node_modules", "build", "target"];

/// Copies `cwd` into `temp_directory` without touching `cwd`
#[derive(Debug, Clone)]
pub struct RepositoryCopier {
    excludes: Vec<String>,
}

impl Default for RepositoryCopier {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect())
    }
}

/// What a copy pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Files written
    pub copied: usize,
    /// Files already up to date
    pub skipped: usize,
    /// Staged entries removed because their source no longer exists
    pub removed: usize,
}

impl RepositoryCopier {
    /// Create a copier that skips directories with the given names
    pub fn new(excludes: Vec<String>) -> Self {
        Self { excludes }
    }

    fn is_excluded(&self, name: &std::ffi::OsStr) -> bool {
        self.excludes.iter().any(|e| name == std::ffi::OsStr::new(e))
    }

    /// Recursively copy `from` into `to`, preserving symlinks.
    ///
    /// `to` may already exist; the staging directory is excluded from the walk
    /// when it lives inside `from`.
    pub async fn copy_tree(&self, from: &Path, to: &Path) -> Result<CopyStats, StageError> {
        if !from.is_dir() {
            return Err(StageError::io(
                from,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source is not a directory"),
            ));
        }
        fs::create_dir_all(to)
            .await
            .map_err(|e| StageError::io(to, e))?;

        let mut stats = CopyStats::default();
        let walker = WalkDir::new(from).min_depth(1).into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir() && self.is_excluded(entry.file_name()))
                && entry.path() != to
        });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(from).to_path_buf();
                StageError::io(path, e.into())
            })?;
            debug_assert!(entry.path().starts_with(from));
            let rel_path = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| StageError::Other(e.into()))?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                if fs::symlink_metadata(&dest_path).await.is_ok() {
                    stats.skipped += 1;
                    continue;
                }
                let target = fs::read_link(entry.path())
                    .await
                    .map_err(|e| StageError::io(entry.path(), e))?;
                symlink(&target, &dest_path).map_err(|e| StageError::io(&dest_path, e))?;
                stats.copied += 1;
            } else if entry.file_type().is_dir() {
                fs::create_dir_all(&dest_path)
                    .await
                    .map_err(|e| StageError::io(&dest_path, e))?;
            } else if is_up_to_date(entry.path(), &dest_path).await {
                stats.skipped += 1;
            } else {
                fs::copy(entry.path(), &dest_path)
                    .await
                    .map_err(|e| StageError::io(&dest_path, e))?;
                stats.copied += 1;
            }
        }

        stats.removed = self.prune_stale(from, to).await?;
        Ok(stats)
    }

    /// Remove entries under `to` that have no counterpart under `from`.
    ///
    /// Excluded directories are never descended into, which also protects
    /// `build/` output from earlier stages.
    async fn prune_stale(&self, from: &Path, to: &Path) -> Result<usize, StageError> {
        let mut stale = Vec::new();
        let mut walker = WalkDir::new(to)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir() && self.is_excluded(entry.file_name()))
            });

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(to).to_path_buf();
                StageError::io(path, e.into())
            })?;
            let rel_path = entry
                .path()
                .strip_prefix(to)
                .map_err(|e| StageError::Other(e.into()))?;
            if fs::symlink_metadata(from.join(rel_path)).await.is_ok() {
                continue;
            }
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            stale.push((entry.path().to_path_buf(), entry.file_type().is_dir()));
        }

        for (path, is_dir) in &stale {
            log::debug!("Pruning stale staged entry {}", path.display());
            let removed = if *is_dir {
                fs::remove_dir_all(path).await
            } else {
                fs::remove_file(path).await
            };
            removed.map_err(|e| StageError::io(path, e))?;
        }
        Ok(stale.len())
    }
}

async fn is_up_to_date(src: &Path, dest: &Path) -> bool {
    let (Ok(src_meta), Ok(dest_meta)) = (fs::metadata(src).await, fs::metadata(dest).await)
    else {
        return false;
    };
    if src_meta.len() != dest_meta.len() {
        return false;
    }
    match (src_meta.modified(), dest_meta.modified()) {
        (Ok(src_time), Ok(dest_time)) => dest_time >= src_time,
        _ => false,
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[async_trait]
impl Stage for RepositoryCopier {
    async fn run(&self, ctx: &BuildContext) -> Result<(), StageError> {
        log::info!(
            "Copying {} to {}",
            ctx.cwd.display(),
            ctx.temp_directory.display()
        );
        let stats = self.copy_tree(&ctx.cwd, &ctx.temp_directory).await?;
        log::info!(
            "Copied {} file(s), {} already up to date, {} stale removed",
            stats.copied,
            stats.skipped,
            stats.removed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn source_tree() -> TempDir {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path();
        stdfs::create_dir_all(root.join("packages/react")).unwrap();
        stdfs::create_dir_all(root.join(".git/objects")).unwrap();
        stdfs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
        stdfs::write(root.join("packages/react/package.json"), r#"{"name":"react"}"#).unwrap();
        stdfs::write(root.join("ReactVersions.js"), "const ReactVersion = '19.1.0';").unwrap();
        stdfs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        stdfs::write(root.join("node_modules/left-pad/index.js"), "").unwrap();
        temp
    }

    #[tokio::test]
    async fn test_copy_tree_skips_excluded_directories() {
        let source = source_tree();
        let staging = TempDir::new().expect("Failed to create temp dir");
        let dest = staging.path().join("react-abc123");

        let stats = RepositoryCopier::default()
            .copy_tree(source.path(), &dest)
            .await
            .unwrap();

        assert_eq!(stats.copied, 2);
        assert!(dest.join("packages/react/package.json").is_file());
        assert!(dest.join("ReactVersions.js").is_file());
        assert!(!dest.join(".git").exists());
        assert!(!dest.join("node_modules").exists());
    }

    #[tokio::test]
    async fn test_second_copy_reuses_existing_files() {
        let source = source_tree();
        let staging = TempDir::new().expect("Failed to create temp dir");
        let dest = staging.path().join("react-abc123");
        let copier = RepositoryCopier::default();

        copier.copy_tree(source.path(), &dest).await.unwrap();
        let again = copier.copy_tree(source.path(), &dest).await.unwrap();

        assert_eq!(
            again,
            CopyStats {
                copied: 0,
                skipped: 2,
                removed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_recopy_prunes_files_deleted_from_source() {
        let source = source_tree();
        let staging = TempDir::new().expect("Failed to create temp dir");
        let dest = staging.path().join("react-abc123");
        let copier = RepositoryCopier::default();
        stdfs::create_dir_all(source.path().join("packages/legacy")).unwrap();
        stdfs::write(source.path().join("packages/react/removed.js"), "gone soon").unwrap();
        stdfs::write(source.path().join("packages/legacy/index.js"), "gone soon").unwrap();

        copier.copy_tree(source.path(), &dest).await.unwrap();
        stdfs::create_dir_all(dest.join("build/node_modules/react")).unwrap();
        stdfs::remove_file(source.path().join("packages/react/removed.js")).unwrap();
        stdfs::remove_dir_all(source.path().join("packages/legacy")).unwrap();

        let again = copier.copy_tree(source.path(), &dest).await.unwrap();

        assert_eq!(again.removed, 2);
        assert!(!dest.join("packages/react/removed.js").exists());
        assert!(!dest.join("packages/legacy").exists());
        assert!(dest.join("packages/react/package.json").is_file());
        assert!(dest.join("build/node_modules/react").is_dir());
    }

    #[tokio::test]
    async fn test_copy_never_writes_to_source() {
        let source = source_tree();
        let dest = source.path().join("staging");
        let mut before: Vec<_> = WalkDir::new(source.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.path().to_path_buf())
            .collect();
        before.sort();

        RepositoryCopier::default()
            .copy_tree(source.path(), &dest)
            .await
            .unwrap();

        // Only the staging directory itself is new; nothing is copied into itself.
        assert!(!dest.join("staging").exists());
        let mut after: Vec<_> = WalkDir::new(source.path())
            .into_iter()
            .filter_entry(|e| !e.path().starts_with(&dest))
            .filter_map(|e| e.ok())
            .map(|e| e.path().to_path_buf())
            .collect();
        after.sort();
        assert_eq!(before, after);
    }
}
