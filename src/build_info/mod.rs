//! Build facts for a release attempt.
//!
//! Resolution reads git and the source tree but never writes anything. Facts
//! that cannot be determined come back as `None`; turning them into a
//! [`BuildContext`](crate::BuildContext) is where incompleteness becomes fatal.

pub mod checksum;

use crate::error::{CliError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// File at the repository root declaring the base framework version
pub const REACT_VERSIONS_FILE: &str = "ReactVersions.js";

/// Directory whose contents the checksum covers
pub const PACKAGES_DIR: &str = "packages";

/// Raw facts produced by a resolver; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBuildInfo {
    /// Branch under release
    pub branch: Option<String>,
    /// Short commit hash
    pub commit: Option<String>,
    /// Release version
    pub version: Option<String>,
    /// Base framework version
    pub react_version: Option<String>,
    /// Source tree checksum
    pub checksum: Option<String>,
}

/// Computes build facts for the repository at `cwd`
#[async_trait]
pub trait BuildInfoSource: Send + Sync {
    /// Resolve facts without side effects
    async fn resolve(&self, cwd: &Path) -> Result<ResolvedBuildInfo>;
}

/// Versioning scheme for the release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReleaseChannel {
    /// `0.0.0-<commit>-<date>`
    #[default]
    Stable,
    /// `0.0.0-experimental-<commit>-<date>`
    Experimental,
}

/// Version strings for a commit dated `date` (`YYYYMMDD`)
///
/// Returns `(version, react_version)`.
pub fn release_versions(
    channel: ReleaseChannel,
    base_version: &semver::Version,
    commit: &str,
    date: &str,
) -> (String, String) {
    let suffix = match channel {
        ReleaseChannel::Stable => format!("{commit}-{date}"),
        ReleaseChannel::Experimental => format!("experimental-{commit}-{date}"),
    };
    (format!("0.0.0-{suffix}"), format!("{base_version}-{suffix}"))
}

/// Extract the `ReactVersion` literal from ReactVersions.js source
pub fn parse_react_version(source: &str) -> Option<semver::Version> {
    static REACT_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"ReactVersion\s*=\s*['"](?P<version>[^'"]+)['"]"#)
            .expect("ReactVersion regex is valid")
    });

    let caps = REACT_VERSION_RE.captures(source)?;
    semver::Version::parse(&caps["version"]).ok()
}

/// Convert a strict ISO 8601 commit date into `YYYYMMDD`
pub fn format_commit_date(iso: &str) -> Option<String> {
    chrono::DateTime::parse_from_rfc3339(iso.trim())
        .ok()
        .map(|dt| dt.format("%Y%m%d").to_string())
}

/// Resolver backed by the git CLI and the source tree
#[derive(Debug, Clone, Default)]
pub struct GitBuildInfoResolver {
    channel: ReleaseChannel,
}

impl GitBuildInfoResolver {
    /// Create a resolver for the given channel
    pub fn new(channel: ReleaseChannel) -> Self {
        Self { channel }
    }

    async fn base_version(&self, cwd: &Path) -> Option<semver::Version> {
        let path = cwd.join(REACT_VERSIONS_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => {
                let version = parse_react_version(&source);
                if version.is_none() {
                    log::warn!("No valid ReactVersion literal in {}", path.display());
                }
                version
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn checksum(&self, cwd: &Path) -> Option<String> {
        let packages = cwd.join(PACKAGES_DIR);
        if !packages.is_dir() {
            log::warn!("No {} directory at {}", PACKAGES_DIR, cwd.display());
            return None;
        }

        match tokio::task::spawn_blocking(move || checksum::short_checksum(&packages)).await {
            Ok(Ok(sum)) => Some(sum),
            Ok(Err(e)) => {
                log::warn!("Failed to checksum packages: {}", e);
                None
            }
            Err(e) => {
                log::warn!("Checksum task failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl BuildInfoSource for GitBuildInfoResolver {
    async fn resolve(&self, cwd: &Path) -> Result<ResolvedBuildInfo> {
        if !cwd.is_dir() {
            return Err(CliError::InvalidArguments {
                reason: format!("Repository root {} is not a directory", cwd.display()),
            }
            .into());
        }

        let branch = git_read(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await;
        let commit = git_read(cwd, &["show", "-s", "--no-show-signature", "--format=%h"]).await;
        let checksum = self.checksum(cwd).await;

        let (version, react_version) = match &commit {
            Some(commit) => {
                let date = git_read(
                    cwd,
                    &["show", "-s", "--no-show-signature", "--format=%cI", commit],
                )
                .await
                .and_then(|iso| format_commit_date(&iso));
                match (self.base_version(cwd).await, date) {
                    (Some(base), Some(date)) => {
                        let (version, react_version) =
                            release_versions(self.channel, &base, commit, &date);
                        (Some(version), Some(react_version))
                    }
                    _ => (None, None),
                }
            }
            None => (None, None),
        };

        Ok(ResolvedBuildInfo {
            branch,
            commit,
            version,
            react_version,
            checksum,
        })
    }
}

/// Run a git command in `cwd` and return its trimmed stdout
async fn git_read(cwd: &Path, args: &[&str]) -> Option<String> {
    let output = match tokio::process::Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log::warn!("Failed to run git {}: {}", args.join(" "), e);
            return None;
        }
    };

    if !output.status.success() {
        log::warn!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!stdout.is_empty()).then_some(stdout)
}
