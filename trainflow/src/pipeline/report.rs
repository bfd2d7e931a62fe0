//! Summary of a successful run.

use super::Transition;
use crate::core::{IngestionArtifact, PublishArtifact, TrainingArtifact};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Unique id of the run.
    pub run_id: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Output of the ingestion stage.
    pub ingestion: IngestionArtifact,
    /// Output of the training stage.
    pub training: TrainingArtifact,
    /// Output of the publishing stage.
    pub publish: PublishArtifact,
    /// State changes, oldest first.
    pub transitions: Vec<Transition>,
}

impl PipelineReport {
    /// Renders the report as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
