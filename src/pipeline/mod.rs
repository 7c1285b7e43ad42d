//! Release pipeline: stage contract and the orchestrator that runs it.
//!
//! A run moves through `Initializing -> Resolving -> Staging -> Running(i) ->
//! Completed`, dropping to `Failed` from any non-terminal state. Stages run one
//! at a time in a fixed order and the first failure ends the run. Nothing is
//! rolled back; the commit-keyed staging directory is what a later run resumes
//! from.

mod orchestrator;
mod stage;

pub use orchestrator::{PipelineState, ReleaseOrchestrator, RunReport};
pub use stage::{Stage, StageId, Stages};
