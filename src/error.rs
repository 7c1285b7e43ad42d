//! Error types for release build operations.
//!
//! The pipeline surfaces a closed set of failure kinds. Each carries structured
//! fields so the top-level handler can format consistently and tests can match
//! on the kind rather than on message text.

use crate::pipeline::{PipelineState, StageId};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release build operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for a release build run
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// One or more build facts could not be determined
    #[error("Incomplete build info: could not determine {}", .missing.join(", "))]
    IncompleteBuildInfo {
        /// Names of the fields that were absent or empty
        missing: Vec<&'static str>,
    },

    /// The staging directory could not be created or is obstructed
    #[error("Failed to prepare staging directory {}: {reason}", .path.display())]
    WorkspaceCreation {
        /// Staging directory path
        path: PathBuf,
        /// Reason for the error
        reason: String,
        /// Underlying filesystem error, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// A pipeline stage failed
    #[error("Stage '{stage}' failed: {source}")]
    StageFailure {
        /// Stage that raised the error
        stage: StageId,
        /// Cause reported by the stage
        #[source]
        source: StageError,
    },

    /// `run` was called on an orchestrator that already ran
    #[error("Release orchestrator already ran (state: {state:?})")]
    AlreadyRun {
        /// State the orchestrator was left in
        state: PipelineState,
    },

    /// CLI argument or environment errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),
}

/// Errors raised by individual pipeline stages
#[derive(Error, Debug)]
pub enum StageError {
    /// The operator declined to continue
    #[error("Release was not confirmed")]
    Rejected,

    /// Filesystem error on a specific path
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// External command failed
    #[error("Command '{command}' failed: {reason}")]
    Command {
        /// Command line that was run
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// External command exceeded its time limit
    #[error("Command '{command}' timed out after {seconds}s")]
    Timeout {
        /// Command line that was run
        command: String,
        /// Configured limit
        seconds: u64,
    },

    /// A version-bearing file could not be rewritten
    #[error("Failed to update version in {}: {reason}", .path.display())]
    Version {
        /// File being rewritten
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Packed artifacts did not round-trip
    #[error("Verification failed for '{package}': {reason}")]
    Verification {
        /// Package name
        package: String,
        /// Reason for the error
        reason: String,
    },

    /// Error from a custom stage implementation
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl StageError {
    /// Wrap an io error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            source,
        }
    }
}

impl ReleaseError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Stage that failed, if the error came from the pipeline stages
    pub fn failed_stage(&self) -> Option<StageId> {
        match self {
            ReleaseError::StageFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::IncompleteBuildInfo { missing } => vec![
                format!("Make sure {} can be determined", missing.join(", ")),
                "Run from inside a git checkout with a ReactVersions.js and packages/ directory"
                    .to_string(),
            ],
            ReleaseError::WorkspaceCreation { path, .. } => vec![
                format!("Check permissions and free space for {}", path.display()),
                "Remove any file occupying the staging path".to_string(),
                "Use --temp-root to stage somewhere else".to_string(),
            ],
            ReleaseError::StageFailure {
                stage,
                source: StageError::Rejected,
            } => vec![
                format!("Run the build-and-test script, then answer yes at the {stage} prompt"),
            ],
            ReleaseError::StageFailure {
                source: StageError::Timeout { .. },
                ..
            } => vec!["Raise --build-timeout or unset it".to_string()],
            ReleaseError::AlreadyRun { .. } => vec![
                "Build a new orchestrator for each release attempt".to_string(),
            ],
            ReleaseError::StageFailure { .. } => vec![
                "Fix the problem above and re-run; completed work in the staging directory is reused"
                    .to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
