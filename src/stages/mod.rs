//! Default implementations of the seven release stages.

pub mod build_artifacts;
pub mod build_info_json;
pub mod confirm;
pub mod copy_repo;
pub mod pack_and_unpack;
pub mod summary;
pub mod version_numbers;

pub use build_artifacts::ArtifactBuilder;
pub use build_info_json::{BuildInfoRecord, BuildInfoWriter};
pub use confirm::{ConfirmationGate, ConfirmationMode};
pub use copy_repo::RepositoryCopier;
pub use pack_and_unpack::PackAndUnpack;
pub use summary::SummaryReporter;
pub use version_numbers::VersionUpdater;

use crate::PipelineConfig;
use crate::cli::OutputManager;
use crate::pipeline::Stages;

/// Build the standard stage set for `config`
pub fn default_stages(config: &PipelineConfig, output: OutputManager) -> Stages {
    let confirmation = if config.assume_confirmed {
        ConfirmationMode::Assume(true)
    } else {
        ConfirmationMode::Interactive
    };

    Stages {
        confirmation: Box::new(ConfirmationGate::new(confirmation)),
        copy_repository: Box::new(RepositoryCopier::default()),
        update_versions: Box::new(VersionUpdater::new()),
        build_info: Box::new(BuildInfoWriter::new()),
        build_artifacts: Box::new(ArtifactBuilder::new(
            config.build_commands.clone(),
            config.build_timeout_secs,
        )),
        pack_and_unpack: Box::new(PackAndUnpack::new()),
        summary: Box::new(SummaryReporter::for_pipeline(output)),
    }
}
