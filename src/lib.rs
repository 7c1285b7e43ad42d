//! # React Release Builder
//!
//! Prepares a versioned, checksummed release candidate in an isolated staging
//! directory.
//!
//! A run resolves build facts (branch, commit, versions, source checksum),
//! ensures the commit-keyed staging directory exists, and then runs seven
//! stages in a fixed order:
//!
//! 1. confirm automated testing
//! 2. copy the repository into the staging directory
//! 3. rewrite version numbers
//! 4. write `build-info.json` records
//! 5. build artifacts
//! 6. pack and unpack the artifacts
//! 7. print the pre-release summary
//!
//! The first failure ends the run. Nothing is rolled back: re-running for the
//! same commit reuses the staging directory and whatever it already holds.
//!
//! ## Usage
//!
//! ```bash
//! react_release_builder                      # build from the current checkout
//! react_release_builder --yes --channel experimental
//! react_release_builder --cwd ~/src/react --build-timeout 3600
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod build_info;
pub mod cli;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod stages;
pub mod workspace;

pub use build_info::{BuildInfoSource, GitBuildInfoResolver, ReleaseChannel, ResolvedBuildInfo};
pub use cli::Args;
pub use context::BuildContext;
pub use error::{ReleaseError, Result, StageError};
pub use pipeline::{PipelineState, ReleaseOrchestrator, RunReport, Stage, StageId, Stages};
pub use workspace::{WorkspaceGuard, WorkspaceManager, WorkspaceStatus, staging_directory};

use std::path::PathBuf;

/// Configuration for a release build run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Canonical repository root
    pub cwd: PathBuf,
    /// Parent directory of the staging directory
    pub temp_root: PathBuf,
    /// Versioning scheme
    pub channel: ReleaseChannel,
    /// Skip the confirmation prompt
    pub assume_confirmed: bool,
    /// Commands run in order to build artifacts
    pub build_commands: Vec<String>,
    /// Per-command build timeout (seconds)
    pub build_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            temp_root: std::env::temp_dir(),
            channel: ReleaseChannel::Stable,
            assume_confirmed: false,
            build_commands: vec![
                stages::build_artifacts::DEFAULT_INSTALL_COMMAND.to_string(),
                stages::build_artifacts::DEFAULT_BUILD_COMMAND.to_string(),
            ],
            build_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    /// Orchestrator wired with the git resolver, the filesystem workspace
    /// manager and the default stages
    pub fn orchestrator(&self, output: cli::OutputManager) -> ReleaseOrchestrator {
        ReleaseOrchestrator::new(
            Box::new(GitBuildInfoResolver::new(self.channel)),
            Box::new(WorkspaceManager::new()),
            stages::default_stages(self, output),
            self.cwd.clone(),
            self.temp_root.clone(),
        )
    }
}
