//! Core domain model types for trainflow.
//!
//! This module contains the values passed between stages:
//! - Pipeline state and stage kind enums
//! - Stage artifacts
//! - Pipeline lifecycle events

mod artifact;
mod event;
mod status;

pub use artifact::{IngestionArtifact, PublishArtifact, StageArtifact, TrainingArtifact};
pub use event::PipelineEvent;
pub use status::{PipelineState, StageKind};
