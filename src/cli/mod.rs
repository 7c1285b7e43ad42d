//! Command line interface for react_release_builder.

mod args;
mod output;

pub use args::{Args, RuntimeConfig};
pub use output::OutputManager;

use crate::error::{CliError, ReleaseError, Result};
use std::path::{Path, PathBuf};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Run one release build for parsed arguments
pub async fn execute(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let cwd = match &args.cwd {
        Some(cwd) => cwd.canonicalize().map_err(|e| CliError::InvalidArguments {
            reason: format!("Failed to canonicalize path '{}': {}", cwd.display(), e),
        })?,
        None => {
            let current = std::env::current_dir().map_err(|e| CliError::ExecutionFailed {
                command: "current_dir".to_string(),
                reason: e.to_string(),
            })?;
            discover_repo_root(&current).await?
        }
    };

    let config = RuntimeConfig::new();
    let pipeline = args.pipeline_config(cwd);
    log::debug!("Pipeline config: {:?}", pipeline);

    let mut orchestrator = pipeline.orchestrator(config.output().clone());
    let report = orchestrator.run().await?;
    log::info!(
        "Release build for {} completed ({} stages, staging directory {:?})",
        report.context.commit,
        report.completed.len(),
        report.workspace
    );

    Ok(0)
}

/// Top-level directory of the git checkout containing `dir`
async fn discover_repo_root(dir: &Path) -> Result<PathBuf> {
    let output = tokio::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| {
            ReleaseError::Cli(CliError::ExecutionFailed {
                command: "git rev-parse --show-toplevel".to_string(),
                reason: e.to_string(),
            })
        })?;

    if !output.status.success() {
        return Err(ReleaseError::Cli(CliError::ExecutionFailed {
            command: "git rev-parse --show-toplevel".to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }));
    }

    Ok(PathBuf::from(
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
    ))
}
