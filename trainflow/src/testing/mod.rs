//! Testing utilities for trainflow pipelines.
//!
//! This module provides:
//! - Dataset archive and weights fixtures
//! - Fake training engines and a recording storage wrapper
//! - An in-process HTTP object server
//! - Assertions that artifacts point at real files

mod assertions;
mod fixtures;
#[cfg(feature = "http")]
mod http;
mod mocks;

pub use crate::storage::MockStorageClient;
pub use assertions::{assert_ingestion_materialized, assert_published, assert_training_materialized};
pub use fixtures::{write_deflated_zip, write_stored_zip, write_weights, DatasetFixture};
#[cfg(feature = "http")]
pub use http::StaticHttpServer;
pub use mocks::{FailingTrainingEngine, FakeTrainingEngine, RecordedPut, RecordingStorageClient};
