//! Shared build context threaded through every pipeline stage.

use crate::build_info::ResolvedBuildInfo;
use crate::error::{ReleaseError, Result};
use crate::workspace::staging_directory;
use std::path::{Path, PathBuf};

/// Facts describing one release attempt.
///
/// Built once per run from a complete [`ResolvedBuildInfo`]. Stages only ever
/// see `&BuildContext`, so none of these fields change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Branch under release
    pub branch: String,
    /// Short commit hash of the tree being released
    pub commit: String,
    /// Release version written into staged packages
    pub version: String,
    /// Version of the base framework this release is built against
    pub react_version: String,
    /// Digest over the pre-release source tree
    pub checksum: String,
    /// Canonical repository root; read-only for every stage
    pub cwd: PathBuf,
    /// Commit-keyed staging directory where all mutation happens
    pub temp_directory: PathBuf,
}

impl BuildContext {
    /// Build a context from resolved facts, rejecting any missing or empty field.
    ///
    /// All missing fields are reported together rather than one at a time.
    pub fn from_resolved(info: ResolvedBuildInfo, cwd: &Path, temp_root: &Path) -> Result<Self> {
        let ResolvedBuildInfo {
            branch,
            commit,
            version,
            react_version,
            checksum,
        } = info;

        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: Option<String>| -> String {
            match value.map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => v,
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let branch = take("branch", branch);
        let commit = take("commit", commit);
        let version = take("version", version);
        let react_version = take("reactVersion", react_version);
        let checksum = take("checksum", checksum);

        if !missing.is_empty() {
            return Err(ReleaseError::IncompleteBuildInfo { missing });
        }

        Ok(Self {
            temp_directory: staging_directory(temp_root, &commit),
            branch,
            commit,
            version,
            react_version,
            checksum,
            cwd: cwd.to_path_buf(),
        })
    }

    /// Directory holding the staged packages
    pub fn staged_packages_dir(&self) -> PathBuf {
        self.temp_directory.join("packages")
    }

    /// Directory the artifact build writes to
    pub fn build_output_dir(&self) -> PathBuf {
        self.temp_directory.join("build").join("node_modules")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ResolvedBuildInfo {
        ResolvedBuildInfo {
            branch: Some("main".to_string()),
            commit: Some("abc123".to_string()),
            version: Some("19.1.0".to_string()),
            react_version: Some("19.1.0".to_string()),
            checksum: Some("deadbeef".to_string()),
        }
    }

    #[test]
    fn test_from_resolved_derives_staging_path() {
        let ctx = BuildContext::from_resolved(complete(), Path::new("/repo"), Path::new("/tmp"))
            .expect("complete info");
        assert_eq!(ctx.temp_directory, PathBuf::from("/tmp/react-abc123"));
        assert_eq!(ctx.cwd, PathBuf::from("/repo"));
        assert_eq!(ctx.checksum, "deadbeef");
    }

    #[test]
    fn test_from_resolved_reports_every_missing_field() {
        let info = ResolvedBuildInfo {
            checksum: None,
            branch: Some("   ".to_string()),
            ..complete()
        };
        let err = BuildContext::from_resolved(info, Path::new("/repo"), Path::new("/tmp"))
            .expect_err("incomplete info must be rejected");
        match err {
            ReleaseError::IncompleteBuildInfo { missing } => {
                assert_eq!(missing, vec!["branch", "checksum"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
