//! Model publishing stage and the matching fetch used by model servers.

use crate::config::PublishConfig;
use crate::core::{PublishArtifact, StageKind, TrainingArtifact};
use crate::errors::{PublishError, StorageError};
use crate::stages::Stage;
use crate::storage::StorageClient;
use crate::utils::is_non_empty_file;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Uploads the trained model to the model bucket.
pub struct ModelPublisher {
    config: PublishConfig,
    storage: Arc<dyn StorageClient>,
}

impl std::fmt::Debug for ModelPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPublisher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModelPublisher {
    /// Creates the stage.
    #[must_use]
    pub fn new(config: PublishConfig, storage: Arc<dyn StorageClient>) -> Self {
        Self { config, storage }
    }

    /// Returns the stage configuration.
    #[must_use]
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Uploads the model referenced by `training`, keeping the local copy.
    ///
    /// Publishing again overwrites the same key.
    pub async fn run(&self, training: &TrainingArtifact) -> Result<PublishArtifact, PublishError> {
        let model = &training.trained_model_path;
        if !is_non_empty_file(model) {
            return Err(PublishError::TrainedModelMissing { path: model.clone() });
        }

        let bucket = &self.config.model_bucket;
        let key = &self.config.model_key;
        info!(
            model = %model.display(),
            bucket = %bucket,
            key = %key,
            "Publishing trained model"
        );

        self.storage
            .put(model, bucket, key, false)
            .await
            .map_err(|source| match source {
                StorageError::LocalFileMissing { path } => PublishError::TrainedModelMissing { path },
                source => PublishError::Upload {
                    bucket: bucket.clone(),
                    key: key.clone(),
                    source,
                },
            })?;

        let artifact = PublishArtifact::new(bucket, key, training.model_sha256.clone());
        info!(artifact = ?artifact, "Model publishing finished");
        Ok(artifact)
    }
}

#[async_trait]
impl Stage for ModelPublisher {
    type Input = TrainingArtifact;
    type Artifact = PublishArtifact;
    type Error = PublishError;

    const KIND: StageKind = StageKind::Publishing;

    async fn execute(&self, input: TrainingArtifact) -> Result<PublishArtifact, PublishError> {
        self.run(&input).await
    }
}

/// Returns a local copy of the published model at `destination`.
///
/// The model is downloaded from `config`'s bucket and key only when
/// `destination` does not exist yet.
pub async fn fetch_model(
    config: &PublishConfig,
    storage: &dyn StorageClient,
    destination: &Path,
) -> Result<PathBuf, StorageError> {
    if tokio::fs::try_exists(destination).await.unwrap_or(false) {
        info!(path = %destination.display(), "Model already present locally");
        return Ok(destination.to_path_buf());
    }
    storage
        .get(&config.model_bucket, &config.model_key, destination)
        .await
}
