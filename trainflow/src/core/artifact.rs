//! Stage artifacts: immutable records of what each stage produced.
//!
//! An artifact is only built after its side effect has been confirmed on
//! disk or in remote storage.

use super::StageKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Common behavior of stage artifacts.
pub trait StageArtifact: Serialize {
    /// The stage that produces this artifact.
    const STAGE: StageKind;

    /// Serializes the artifact for event payloads.
    fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Output of the ingestion stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionArtifact {
    /// The downloaded dataset archive.
    pub dataset_archive_path: PathBuf,
    /// The feature-store directory holding the extracted tree.
    pub extracted_dataset_path: PathBuf,
    /// Number of regular files extracted from the archive.
    pub file_count: usize,
    /// When the artifact was created (ISO 8601).
    pub created_at: String,
}

impl IngestionArtifact {
    /// Creates a new ingestion artifact.
    #[must_use]
    pub fn new(
        dataset_archive_path: impl Into<PathBuf>,
        extracted_dataset_path: impl Into<PathBuf>,
        file_count: usize,
    ) -> Self {
        Self {
            dataset_archive_path: dataset_archive_path.into(),
            extracted_dataset_path: extracted_dataset_path.into(),
            file_count,
            created_at: crate::utils::iso_timestamp(),
        }
    }
}

impl StageArtifact for IngestionArtifact {
    const STAGE: StageKind = StageKind::Ingestion;
}

/// Output of the training stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingArtifact {
    /// The best model file written by the training engine.
    pub trained_model_path: PathBuf,
    /// Hex SHA-256 of the model file at the time training finished.
    pub model_sha256: String,
    /// When the artifact was created (ISO 8601).
    pub created_at: String,
}

impl TrainingArtifact {
    /// Creates a new training artifact.
    #[must_use]
    pub fn new(trained_model_path: impl Into<PathBuf>, model_sha256: impl Into<String>) -> Self {
        Self {
            trained_model_path: trained_model_path.into(),
            model_sha256: model_sha256.into(),
            created_at: crate::utils::iso_timestamp(),
        }
    }
}

impl StageArtifact for TrainingArtifact {
    const STAGE: StageKind = StageKind::Training;
}

/// Output of the publishing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishArtifact {
    /// The bucket the model was uploaded to.
    pub bucket_name: String,
    /// The key of the uploaded model.
    pub remote_model_key: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub model_sha256: String,
    /// When the artifact was created (ISO 8601).
    pub created_at: String,
}

impl PublishArtifact {
    /// Creates a new publish artifact.
    #[must_use]
    pub fn new(
        bucket_name: impl Into<String>,
        remote_model_key: impl Into<String>,
        model_sha256: impl Into<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            remote_model_key: remote_model_key.into(),
            model_sha256: model_sha256.into(),
            created_at: crate::utils::iso_timestamp(),
        }
    }
}

impl StageArtifact for PublishArtifact {
    const STAGE: StageKind = StageKind::Publishing;
}
