//! Pipeline lifecycle events.

use super::{PipelineState, StageKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted by the orchestrator during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type (e.g., "stage.started", "pipeline.state_changed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// The run this event belongs to.
    pub run_id: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl PipelineEvent {
    /// Creates a new event with an empty payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            run_id: run_id.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Creates a "pipeline.started" event.
    #[must_use]
    pub fn pipeline_started(run_id: &str, run_name: &str) -> Self {
        Self::new("pipeline.started", run_id).add_data("run_name", serde_json::json!(run_name))
    }

    /// Creates a "pipeline.state_changed" event.
    #[must_use]
    pub fn state_changed(run_id: &str, from: PipelineState, to: PipelineState) -> Self {
        Self::new("pipeline.state_changed", run_id)
            .add_data("from", serde_json::json!(from))
            .add_data("to", serde_json::json!(to))
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn stage_started(run_id: &str, stage: StageKind) -> Self {
        Self::new("stage.started", run_id).add_data("stage", serde_json::json!(stage))
    }

    /// Creates a "stage.completed" event carrying the produced artifact.
    #[must_use]
    pub fn stage_completed(
        run_id: &str,
        stage: StageKind,
        duration_ms: f64,
        artifact: serde_json::Value,
    ) -> Self {
        Self::new("stage.completed", run_id)
            .add_data("stage", serde_json::json!(stage))
            .add_data("duration_ms", serde_json::json!(duration_ms))
            .add_data("artifact", artifact)
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn stage_failed(run_id: &str, stage: StageKind, duration_ms: f64, error: &str) -> Self {
        Self::new("stage.failed", run_id)
            .add_data("stage", serde_json::json!(stage))
            .add_data("duration_ms", serde_json::json!(duration_ms))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "pipeline.completed" event.
    #[must_use]
    pub fn pipeline_completed(run_id: &str, duration_ms: f64) -> Self {
        Self::new("pipeline.completed", run_id).add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "pipeline.failed" event from an error dictionary.
    #[must_use]
    pub fn pipeline_failed(run_id: &str, error: HashMap<String, serde_json::Value>) -> Self {
        let mut event = Self::new("pipeline.failed", run_id);
        event.data.extend(error);
        event
    }

    /// Creates a "pipeline.cancelled" event.
    #[must_use]
    pub fn pipeline_cancelled(run_id: &str, stage: StageKind, reason: &str) -> Self {
        Self::new("pipeline.cancelled", run_id)
            .add_data("stage", serde_json::json!(stage))
            .add_data("reason", serde_json::json!(reason))
    }
}
