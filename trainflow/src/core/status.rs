//! Pipeline state and stage kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three stages of a training run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Fetch and unpack the dataset archive.
    Ingestion,
    /// Prepare manifests and run the training engine.
    Training,
    /// Upload the trained model.
    Publishing,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [Self; 3] = [Self::Ingestion, Self::Training, Self::Publishing];

    /// Returns the pipeline state that is active while this stage runs.
    #[must_use]
    pub fn running_state(self) -> PipelineState {
        match self {
            Self::Ingestion => PipelineState::Ingesting,
            Self::Training => PipelineState::Training,
            Self::Publishing => PipelineState::Publishing,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingestion => write!(f, "ingestion"),
            Self::Training => write!(f, "training"),
            Self::Publishing => write!(f, "publishing"),
        }
    }
}

/// The state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Not started.
    #[default]
    Idle,
    /// Ingestion stage running.
    Ingesting,
    /// Training stage running.
    Training,
    /// Publishing stage running.
    Publishing,
    /// All stages succeeded.
    Completed,
    /// A stage failed or the run was cancelled.
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Ingesting => write!(f, "ingesting"),
            Self::Training => write!(f, "training"),
            Self::Publishing => write!(f, "publishing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl PipelineState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the stage running in this state, if any.
    #[must_use]
    pub fn active_stage(&self) -> Option<StageKind> {
        match self {
            Self::Ingesting => Some(StageKind::Ingestion),
            Self::Training => Some(StageKind::Training),
            Self::Publishing => Some(StageKind::Publishing),
            Self::Idle | Self::Completed | Self::Failed => None,
        }
    }

    /// Returns true if `next` is a legal successor of this state.
    ///
    /// Stages advance strictly in order; any running state may fail.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Ingesting)
                | (Self::Ingesting, Self::Training)
                | (Self::Training, Self::Publishing)
                | (Self::Publishing, Self::Completed)
                | (Self::Idle | Self::Ingesting | Self::Training | Self::Publishing, Self::Failed)
        )
    }
}
