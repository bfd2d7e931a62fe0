//! Stage trait.
//!
//! Stages are the units of work the orchestrator sequences. Each one takes
//! the previous stage's artifact by value and returns either its own
//! artifact or its own error kind; nothing else crosses the boundary.

use crate::core::{StageArtifact, StageKind};
use async_trait::async_trait;

/// A typed pipeline stage.
#[async_trait]
pub trait Stage: Send + Sync {
    /// What the stage consumes from the previous stage.
    type Input: Send + 'static;

    /// What the stage produces on success.
    type Artifact: StageArtifact + Clone + Send + Sync + 'static;

    /// The error kind the stage reports on failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Which stage this is.
    const KIND: StageKind;

    /// Runs the stage.
    ///
    /// The returned artifact only references resources that exist.
    async fn execute(&self, input: Self::Input) -> Result<Self::Artifact, Self::Error>;
}
