//! Model training stage.
//!
//! Turns an extracted dataset into a trained model by preparing image
//! manifests and a dataset descriptor, making sure the initial weights are
//! on disk and handing a [`TrainingRequest`] to the configured
//! [`TrainingEngine`].

mod engine;
mod manifest;
mod weights;

pub use engine::{CommandTrainingEngine, TrainingEngine, TrainingRequest};
pub use manifest::{is_image, list_images, prepare_manifests, Manifests, IMAGE_EXTENSIONS};
pub use weights::{ensure_weights, weights_file_name};

use crate::config::TrainingConfig;
use crate::core::{IngestionArtifact, StageKind, TrainingArtifact};
use crate::errors::{TrainingEngineError, TrainingError};
use crate::stages::Stage;
use crate::utils::{is_non_empty_file, sha256_file};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Contents of the dataset descriptor handed to the engine.
///
/// Serialized as JSON, which YAML readers accept as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Training manifest path.
    pub train: PathBuf,
    /// Validation manifest path.
    pub val: PathBuf,
    /// Number of classes.
    pub nc: usize,
    /// Class names, indexed by label id.
    pub names: Vec<String>,
}

/// Trains a model from an ingested dataset.
pub struct ModelTrainer {
    config: TrainingConfig,
    engine: Arc<dyn TrainingEngine>,
}

impl std::fmt::Debug for ModelTrainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelTrainer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModelTrainer {
    /// Creates the stage.
    #[must_use]
    pub fn new(config: TrainingConfig, engine: Arc<dyn TrainingEngine>) -> Self {
        Self { config, engine }
    }

    /// Returns the stage configuration.
    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Appends the dataset's train and val images to the configured
    /// manifests.
    pub async fn prepare_manifests(&self, dataset_root: &Path) -> Result<Manifests, TrainingError> {
        let training_dir = self.config.training_dir.clone();
        tokio::fs::create_dir_all(&training_dir)
            .await
            .map_err(|e| TrainingError::prepare(&training_dir, e))?;

        let root = dataset_root.to_path_buf();
        let train_list = self.config.train_manifest_path();
        let val_list = self.config.val_manifest_path();
        let manifests = tokio::task::spawn_blocking(move || prepare_manifests(&root, &train_list, &val_list))
            .await
            .map_err(|e| TrainingError::prepare(dataset_root, std::io::Error::other(e)))??;

        info!(
            train_images = manifests.train_images,
            val_images = manifests.val_images,
            "Prepared image manifests"
        );
        Ok(manifests)
    }

    /// Writes the dataset descriptor pointing at `manifests`.
    pub async fn write_dataset_descriptor(&self, manifests: &Manifests) -> Result<PathBuf, TrainingError> {
        let descriptor = DatasetDescriptor {
            train: manifests.train_list.clone(),
            val: manifests.val_list.clone(),
            nc: self.config.class_names.len(),
            names: self.config.class_names.clone(),
        };
        let path = self.config.dataset_descriptor_path();
        let body = serde_json::to_vec_pretty(&descriptor)
            .map_err(|e| TrainingError::prepare(&path, std::io::Error::other(e)))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| TrainingError::prepare(&path, e))?;
        Ok(path)
    }

    /// Makes sure the initial weights are available locally.
    pub async fn ensure_weights(&self) -> Result<PathBuf, TrainingError> {
        Ok(ensure_weights(&self.config.weights_url, &self.config.weights_dir).await?)
    }

    /// Runs the engine and returns the trained model path.
    ///
    /// Fails with [`TrainingEngineError::MissingOutput`] when the engine
    /// reports success without leaving a non-empty model behind.
    pub async fn train(&self, weights_path: &Path, dataset_descriptor: &Path) -> Result<PathBuf, TrainingError> {
        let request = TrainingRequest {
            weights_path: weights_path.to_path_buf(),
            dataset_descriptor: dataset_descriptor.to_path_buf(),
            epochs: self.config.epochs,
            batch_size: self.config.batch_size,
            output_dir: self.config.training_dir.clone(),
            run_name: self.config.run_name.clone(),
        };
        info!(
            epochs = request.epochs,
            batch_size = request.batch_size,
            run_name = %request.run_name,
            "Starting model training"
        );

        self.engine.train(&request).await?;

        let model = request.expected_model_path();
        if !is_non_empty_file(&model) {
            return Err(TrainingEngineError::MissingOutput { path: model }.into());
        }
        Ok(model)
    }

    /// Prepares inputs, trains and returns the training artifact.
    pub async fn run(&self, ingestion: &IngestionArtifact) -> Result<TrainingArtifact, TrainingError> {
        let manifests = self.prepare_manifests(&ingestion.extracted_dataset_path).await?;
        let descriptor = self.write_dataset_descriptor(&manifests).await?;
        let weights = self.ensure_weights().await?;
        let model = self.train(&weights, &descriptor).await?;

        let digest_path = model.clone();
        let sha = tokio::task::spawn_blocking(move || sha256_file(&digest_path))
            .await
            .map_err(|e| TrainingError::prepare(&model, std::io::Error::other(e)))?
            .map_err(|e| TrainingError::prepare(&model, e))?;

        let artifact = TrainingArtifact::new(model, sha);
        info!(artifact = ?artifact, "Model training finished");
        Ok(artifact)
    }
}

#[async_trait]
impl Stage for ModelTrainer {
    type Input = IngestionArtifact;
    type Artifact = TrainingArtifact;
    type Error = TrainingError;

    const KIND: StageKind = StageKind::Training;

    async fn execute(&self, input: IngestionArtifact) -> Result<TrainingArtifact, TrainingError> {
        self.run(&input).await
    }
}
