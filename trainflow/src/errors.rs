//! Error types for the trainflow pipeline.
//!
//! Every external call (filesystem, archive, object store, training engine)
//! is translated into one of these kinds at the boundary of the stage that
//! made it. The orchestrator wraps the stage error exactly once in
//! [`PipelineError`].

use crate::core::StageKind;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error for transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a [`crate::storage::StorageClient`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound {
        /// The bucket that was queried.
        bucket: String,
        /// The missing key.
        key: String,
    },

    /// Transport or local write failure.
    #[error("storage I/O failed for {bucket}/{key}: {source}")]
    Io {
        /// The bucket involved.
        bucket: String,
        /// The key involved.
        key: String,
        /// The underlying failure.
        source: BoxError,
    },

    /// The local file to upload does not exist.
    #[error("local file missing: {}", path.display())]
    LocalFileMissing {
        /// The path that was expected to exist.
        path: PathBuf,
    },
}

impl StorageError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Creates an I/O error from any error source.
    #[must_use]
    pub fn io(bucket: impl Into<String>, key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Io {
            bucket: bucket.into(),
            key: key.into(),
            source: source.into(),
        }
    }

    /// Returns the taxonomy name of this error.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "StorageNotFound",
            Self::Io { .. } => "StorageIOError",
            Self::LocalFileMissing { .. } => "LocalFileMissing",
        }
    }
}

/// Errors raised by the data ingestion stage.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Fetching the dataset archive failed.
    #[error("failed to download dataset '{key}' from bucket '{bucket}': {source}")]
    Download {
        /// The data bucket.
        bucket: String,
        /// The dataset key.
        key: String,
        /// The storage failure.
        #[source]
        source: StorageError,
    },

    /// A working directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    Directory {
        /// The directory path.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The archive was missing, corrupt or could not be unpacked.
    #[error("failed to extract {}: {reason}", archive.display())]
    Extract {
        /// The archive path.
        archive: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

impl IngestionError {
    /// Creates an extraction error.
    #[must_use]
    pub fn extract(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Extract {
            archive: archive.into(),
            reason: reason.into(),
        }
    }
}

/// Fetching the initial model weights failed.
#[derive(Debug, Error)]
#[error("failed to fetch weights from '{url}': {reason}")]
pub struct WeightDownloadError {
    /// The source URL.
    pub url: String,
    /// What went wrong.
    pub reason: String,
}

impl WeightDownloadError {
    /// Creates a new weight download error.
    #[must_use]
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised at the training engine boundary.
#[derive(Debug, Error)]
pub enum TrainingEngineError {
    /// The engine process could not be started.
    #[error("failed to launch training engine '{program}': {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and reported failure.
    #[error("training engine '{program}' failed (exit code {}): {stderr}", exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Failed {
        /// The program that was invoked.
        program: String,
        /// The exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The engine finished but the expected model file is absent or empty.
    #[error("training finished but no model was produced at {}", path.display())]
    MissingOutput {
        /// The expected model path.
        path: PathBuf,
    },
}

/// Errors raised by the model training stage.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// A manifest or descriptor file could not be written.
    #[error("failed to prepare training input {}: {source}", path.display())]
    Prepare {
        /// The file or directory involved.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The initial weights could not be obtained.
    #[error(transparent)]
    WeightDownload(#[from] WeightDownloadError),

    /// The training engine failed.
    #[error(transparent)]
    Engine(#[from] TrainingEngineError),
}

impl TrainingError {
    /// Creates a preparation error.
    #[must_use]
    pub fn prepare(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Prepare {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the model publishing stage.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The trained model referenced by the training artifact is gone.
    #[error("trained model missing at {}", path.display())]
    TrainedModelMissing {
        /// The path from the training artifact.
        path: PathBuf,
    },

    /// The upload failed.
    #[error("failed to upload model to {bucket}/{key}: {source}")]
    Upload {
        /// The model bucket.
        bucket: String,
        /// The remote key.
        key: String,
        /// The storage failure.
        #[source]
        source: StorageError,
    },
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        /// The config path.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected shape.
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        /// The config path.
        path: PathBuf,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A field holds an unusable value.
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error for a pipeline run.
///
/// Each variant records the stage that failed and carries its error
/// unchanged as the source.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Data ingestion failed.
    #[error("ingestion stage failed: {0}")]
    Ingestion(#[source] IngestionError),

    /// Model training failed.
    #[error("training stage failed: {0}")]
    Training(#[source] TrainingError),

    /// Model publishing failed.
    #[error("publishing stage failed: {0}")]
    Publishing(#[source] PublishError),

    /// The run was cancelled before `stage` started.
    #[error("pipeline cancelled before {stage} stage: {reason}")]
    Cancelled {
        /// The stage that did not start.
        stage: StageKind,
        /// The cancellation reason.
        reason: String,
    },
}

impl PipelineError {
    /// Returns the stage the failure is attributed to.
    #[must_use]
    pub fn stage(&self) -> StageKind {
        match self {
            Self::Ingestion(_) => StageKind::Ingestion,
            Self::Training(_) => StageKind::Training,
            Self::Publishing(_) => StageKind::Publishing,
            Self::Cancelled { stage, .. } => *stage,
        }
    }

    /// Returns the taxonomy name of the originating cause.
    #[must_use]
    pub fn cause_kind(&self) -> &'static str {
        match self {
            Self::Ingestion(IngestionError::Download { source, .. }) => source.kind_name(),
            Self::Ingestion(_) => "IngestionError",
            Self::Training(TrainingError::WeightDownload(_)) => "WeightDownloadError",
            Self::Training(TrainingError::Engine(_)) => "TrainingEngineError",
            Self::Training(TrainingError::Prepare { .. }) => "TrainingInputError",
            Self::Publishing(PublishError::TrainedModelMissing { .. }) => "TrainedModelMissing",
            Self::Publishing(PublishError::Upload { source, .. }) => source.kind_name(),
            Self::Cancelled { .. } => "Cancelled",
        }
    }

    /// Converts to a dictionary representation for event payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("PipelineError"));
        map.insert("stage".to_string(), serde_json::json!(self.stage().to_string()));
        map.insert("cause".to_string(), serde_json::json!(self.cause_kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}
