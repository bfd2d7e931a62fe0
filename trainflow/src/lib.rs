//! # Trainflow
//!
//! A staged pipeline that ingests a labeled dataset from object storage,
//! trains an object-detection model on it through an external engine, and
//! publishes the trained model back to object storage.
//!
//! Trainflow provides:
//!
//! - **Typed stages**: each stage consumes the previous stage's artifact and
//!   returns its own, or its own error kind
//! - **Strict sequencing**: a failed stage ends the run; later stages never run
//! - **Pluggable boundaries**: storage backends and training engines are traits
//! - **Observability**: tracing spans per stage and lifecycle events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trainflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::under_root("/var/lib/trainflow/run-1");
//! let storage = Arc::new(FsObjectStore::new("/srv/objects")?);
//! let engine = Arc::new(CommandTrainingEngine::default());
//!
//! let report = TrainingPipeline::new(config, storage, engine).run().await?;
//! println!("published {}/{}", report.publish.bucket_name, report.publish.remote_model_key);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod ingestion;
pub mod observability;
pub mod pipeline;
pub mod publishing;
pub mod stages;
pub mod storage;
pub mod training;
pub mod utils;

#[cfg(test)]
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{IngestionConfig, PipelineConfig, PublishConfig, TrainingConfig};
    pub use crate::core::{
        IngestionArtifact, PipelineEvent, PipelineState, PublishArtifact, StageArtifact, StageKind,
        TrainingArtifact,
    };
    pub use crate::errors::{
        ConfigError, IngestionError, PipelineError, PublishError, StorageError, TrainingEngineError,
        TrainingError, WeightDownloadError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::ingestion::DataIngestion;
    pub use crate::pipeline::{PipelineReport, TrainingPipeline};
    pub use crate::publishing::{fetch_model, ModelPublisher};
    pub use crate::stages::Stage;
    #[cfg(feature = "http")]
    pub use crate::storage::HttpObjectStore;
    pub use crate::storage::{FsObjectStore, StorageClient};
    pub use crate::training::{CommandTrainingEngine, ModelTrainer, TrainingEngine, TrainingRequest};
    pub use crate::utils::{generate_run_id, iso_timestamp, Timestamp};
}
