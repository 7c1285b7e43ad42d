//! Sequential release orchestration.

use crate::build_info::BuildInfoSource;
use crate::context::BuildContext;
use crate::error::{ReleaseError, Result};
use crate::workspace::{WorkspaceGuard, WorkspaceStatus};
use std::path::PathBuf;

use super::stage::{Stage, StageId, Stages};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, nothing run yet
    Initializing,
    /// Resolving build facts
    Resolving,
    /// Ensuring the staging directory
    Staging,
    /// Executing the stage at this index
    Running(usize),
    /// Every stage succeeded
    Completed,
    /// A step failed; the run is over
    Failed,
}

impl PipelineState {
    /// Whether the run has finished, successfully or not
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Context every stage ran against
    pub context: BuildContext,
    /// Whether the staging directory was created or reused
    pub workspace: WorkspaceStatus,
    /// Stages that ran, in order
    pub completed: Vec<StageId>,
}

/// Owns the fixed stage list and drives one release build run
pub struct ReleaseOrchestrator {
    resolver: Box<dyn BuildInfoSource>,
    workspace: Box<dyn WorkspaceGuard>,
    stages: Vec<(StageId, Box<dyn Stage>)>,
    cwd: PathBuf,
    temp_root: PathBuf,
    state: PipelineState,
}

impl ReleaseOrchestrator {
    /// Create an orchestrator for the repository at `cwd`, staging under `temp_root`
    pub fn new(
        resolver: Box<dyn BuildInfoSource>,
        workspace: Box<dyn WorkspaceGuard>,
        stages: Stages,
        cwd: impl Into<PathBuf>,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            workspace,
            stages: stages.into_ordered(),
            cwd: cwd.into(),
            temp_root: temp_root.into(),
            state: PipelineState::Initializing,
        }
    }

    /// Current state of the run
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the pipeline once.
    ///
    /// Returns the first error raised by the resolver, the workspace guard or a
    /// stage; no later step executes after a failure.
    pub async fn run(&mut self) -> Result<RunReport> {
        if self.state != PipelineState::Initializing {
            return Err(ReleaseError::AlreadyRun { state: self.state });
        }

        self.transition(PipelineState::Resolving);
        let resolved = match self.resolver.resolve(&self.cwd).await {
            Ok(info) => info,
            Err(e) => return Err(self.fail(e)),
        };
        let context = match BuildContext::from_resolved(resolved, &self.cwd, &self.temp_root) {
            Ok(ctx) => ctx,
            Err(e) => return Err(self.fail(e)),
        };
        log::info!(
            "Build info: branch={} commit={} version={} reactVersion={} checksum={}",
            context.branch,
            context.commit,
            context.version,
            context.react_version,
            context.checksum
        );

        self.transition(PipelineState::Staging);
        let workspace = match self.workspace.ensure(&context.temp_directory).await {
            Ok(status) => status,
            Err(e) => return Err(self.fail(e)),
        };

        let mut completed = Vec::with_capacity(self.stages.len());
        for index in 0..self.stages.len() {
            self.transition(PipelineState::Running(index));
            let (id, stage) = &self.stages[index];
            let id = *id;

            log::info!("Running stage {}/{}: {}", index + 1, self.stages.len(), id);
            let outcome = stage.run(&context).await;
            if let Err(source) = outcome {
                return Err(self.fail(ReleaseError::StageFailure { stage: id, source }));
            }
            log::debug!("Stage {} finished", id);
            completed.push(id);
        }

        self.transition(PipelineState::Completed);
        Ok(RunReport {
            context,
            workspace,
            completed,
        })
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("Pipeline state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: ReleaseError) -> ReleaseError {
        log::error!("Release build failed in {:?}: {}", self.state, error);
        self.state = PipelineState::Failed;
        error
    }
}
