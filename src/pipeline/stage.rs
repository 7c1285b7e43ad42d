//! Stage contract and the fixed stage registry.

use crate::context::BuildContext;
use crate::error::StageError;
use async_trait::async_trait;
use std::fmt;

/// One unit of release preparation
#[async_trait]
pub trait Stage: Send + Sync {
    /// Perform the stage's effect against the shared context
    async fn run(&self, ctx: &BuildContext) -> Result<(), StageError>;
}

/// Identity of each pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageId {
    /// Operator confirms automated testing was run
    Confirmation,
    /// Source tree copied into the staging directory
    CopyRepository,
    /// Version-bearing files rewritten
    UpdateVersions,
    /// Build provenance written into staged packages
    BuildInfo,
    /// Distributable artifacts compiled
    BuildArtifacts,
    /// Artifacts packed and unpacked to prove packaging integrity
    PackAndUnpack,
    /// Pre-release summary printed
    Summary,
}

impl StageId {
    /// All stages in the order they run
    pub const ORDER: [StageId; 7] = [
        StageId::Confirmation,
        StageId::CopyRepository,
        StageId::UpdateVersions,
        StageId::BuildInfo,
        StageId::BuildArtifacts,
        StageId::PackAndUnpack,
        StageId::Summary,
    ];

    /// Stable kebab-case name used in logs and errors
    pub fn name(self) -> &'static str {
        match self {
            StageId::Confirmation => "confirm-automated-testing",
            StageId::CopyRepository => "copy-repo-to-temp-directory",
            StageId::UpdateVersions => "update-version-numbers",
            StageId::BuildInfo => "add-build-info-json",
            StageId::BuildArtifacts => "build-artifacts",
            StageId::PackAndUnpack => "pack-and-unpack",
            StageId::Summary => "print-prerelease-summary",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The seven stages of a release build.
///
/// One field per stage keeps the set complete and the order fixed; callers
/// swap implementations, never positions.
pub struct Stages {
    /// Confirmation gate
    pub confirmation: Box<dyn Stage>,
    /// Repository copier
    pub copy_repository: Box<dyn Stage>,
    /// Version updater
    pub update_versions: Box<dyn Stage>,
    /// Build-info writer
    pub build_info: Box<dyn Stage>,
    /// Artifact builder
    pub build_artifacts: Box<dyn Stage>,
    /// Pack/unpack verifier
    pub pack_and_unpack: Box<dyn Stage>,
    /// Summary reporter
    pub summary: Box<dyn Stage>,
}

impl Stages {
    /// Flatten into `(id, stage)` descriptors in execution order
    pub(crate) fn into_ordered(self) -> Vec<(StageId, Box<dyn Stage>)> {
        vec![
            (StageId::Confirmation, self.confirmation),
            (StageId::CopyRepository, self.copy_repository),
            (StageId::UpdateVersions, self.update_versions),
            (StageId::BuildInfo, self.build_info),
            (StageId::BuildArtifacts, self.build_artifacts),
            (StageId::PackAndUnpack, self.pack_and_unpack),
            (StageId::Summary, self.summary),
        ]
    }
}
