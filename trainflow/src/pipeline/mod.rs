//! Pipeline orchestration.
//!
//! This module provides:
//! - The run state machine
//! - The orchestrator sequencing ingestion, training and publishing
//! - The report returned by a successful run

mod orchestrator;
mod report;
mod state;

#[cfg(test)]
mod integration_tests;

pub use orchestrator::TrainingPipeline;
pub use report::PipelineReport;
pub use state::{InvalidTransition, StateMachine, Transition};
