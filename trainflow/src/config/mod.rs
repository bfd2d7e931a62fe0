//! Per-stage configuration.
//!
//! Configs describe intent: where a stage should read and write, and with
//! which parameters. They are built once before a run and never mutated by
//! the stages that consume them.

mod loader;

pub use loader::{PipelineConfig, ENV_BATCH_SIZE, ENV_DATA_BUCKET, ENV_EPOCHS, ENV_MODEL_BUCKET};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name for the ingestion stage under the artifact root.
pub const INGESTION_DIR_NAME: &str = "data_ingestion";
/// Directory name for the extracted dataset under the ingestion directory.
pub const FEATURE_STORE_DIR_NAME: &str = "feature_store";
/// Directory name for the training stage under the artifact root.
pub const TRAINING_DIR_NAME: &str = "model_trainer";

/// Configuration for the data ingestion stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Bucket holding the dataset archive.
    #[serde(default = "default_data_bucket")]
    pub data_bucket: String,
    /// Key of the dataset archive; also its local file name.
    #[serde(default = "default_dataset_key")]
    pub dataset_key: String,
    /// Directory the archive is downloaded into.
    #[serde(default = "default_ingestion_dir")]
    pub ingestion_dir: PathBuf,
    /// Directory the archive is extracted into.
    #[serde(default = "default_feature_store_dir")]
    pub feature_store_dir: PathBuf,
}

fn default_data_bucket() -> String {
    "trainflow-datasets".to_string()
}

fn default_dataset_key() -> String {
    "dataset.zip".to_string()
}

fn default_ingestion_dir() -> PathBuf {
    PathBuf::from(INGESTION_DIR_NAME)
}

fn default_feature_store_dir() -> PathBuf {
    Path::new(INGESTION_DIR_NAME).join(FEATURE_STORE_DIR_NAME)
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            data_bucket: default_data_bucket(),
            dataset_key: default_dataset_key(),
            ingestion_dir: default_ingestion_dir(),
            feature_store_dir: default_feature_store_dir(),
        }
    }
}

impl IngestionConfig {
    /// Creates an ingestion config rooted at `root`.
    #[must_use]
    pub fn under_root(root: &Path) -> Self {
        let ingestion_dir = root.join(INGESTION_DIR_NAME);
        Self {
            feature_store_dir: ingestion_dir.join(FEATURE_STORE_DIR_NAME),
            ingestion_dir,
            ..Self::default()
        }
    }

    /// Sets the data bucket.
    #[must_use]
    pub fn with_data_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.data_bucket = bucket.into();
        self
    }

    /// Sets the dataset key.
    #[must_use]
    pub fn with_dataset_key(mut self, key: impl Into<String>) -> Self {
        self.dataset_key = key.into();
        self
    }

    /// Returns the local path the archive is downloaded to.
    ///
    /// Only the last segment of the key is used, so nested keys still land
    /// directly in the ingestion directory.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        let name = self
            .dataset_key
            .rsplit('/')
            .next()
            .unwrap_or(self.dataset_key.as_str());
        self.ingestion_dir.join(name)
    }
}

/// Configuration for the model training stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Root directory for manifests, the dataset descriptor and engine output.
    #[serde(default = "default_training_dir")]
    pub training_dir: PathBuf,
    /// Where the initial weights are fetched from (`http(s)://`, `file://` or a path).
    #[serde(default = "default_weights_url")]
    pub weights_url: String,
    /// Directory the initial weights are cached in.
    #[serde(default = "default_weights_dir")]
    pub weights_dir: PathBuf,
    /// Number of training epochs.
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    /// Training batch size.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Name of the engine run directory under `training_dir`.
    #[serde(default = "default_run_name")]
    pub run_name: String,
    /// Class names written to the dataset descriptor.
    #[serde(default = "default_class_names")]
    pub class_names: Vec<String>,
}

fn default_training_dir() -> PathBuf {
    PathBuf::from(TRAINING_DIR_NAME)
}

fn default_weights_url() -> String {
    "https://github.com/ultralytics/assets/releases/download/v8.3.0/yolo11n.pt".to_string()
}

fn default_weights_dir() -> PathBuf {
    PathBuf::from("weights")
}

fn default_epochs() -> u32 {
    1
}

fn default_batch_size() -> u32 {
    16
}

fn default_run_name() -> String {
    "yolov11_training".to_string()
}

fn default_class_names() -> Vec<String> {
    ["buffalo", "elephant", "rhino", "zebra"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            training_dir: default_training_dir(),
            weights_url: default_weights_url(),
            weights_dir: default_weights_dir(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            run_name: default_run_name(),
            class_names: default_class_names(),
        }
    }
}

impl TrainingConfig {
    /// Creates a training config rooted at `root`.
    #[must_use]
    pub fn under_root(root: &Path) -> Self {
        Self {
            training_dir: root.join(TRAINING_DIR_NAME),
            weights_dir: root.join("weights"),
            ..Self::default()
        }
    }

    /// Sets the weights source.
    #[must_use]
    pub fn with_weights_url(mut self, url: impl Into<String>) -> Self {
        self.weights_url = url.into();
        self
    }

    /// Sets the epoch count.
    #[must_use]
    pub fn with_epochs(mut self, epochs: u32) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the class names.
    #[must_use]
    pub fn with_class_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the training image manifest.
    #[must_use]
    pub fn train_manifest_path(&self) -> PathBuf {
        self.training_dir.join("train.txt")
    }

    /// Path of the validation image manifest.
    #[must_use]
    pub fn val_manifest_path(&self) -> PathBuf {
        self.training_dir.join("val.txt")
    }

    /// Path of the dataset descriptor handed to the engine.
    #[must_use]
    pub fn dataset_descriptor_path(&self) -> PathBuf {
        self.training_dir.join("data.yaml")
    }

    /// Path the engine writes its best model to.
    #[must_use]
    pub fn trained_model_path(&self) -> PathBuf {
        self.training_dir
            .join(&self.run_name)
            .join("weights")
            .join("best.pt")
    }
}

/// Configuration for the model publishing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Bucket the trained model is uploaded to.
    #[serde(default = "default_model_bucket")]
    pub model_bucket: String,
    /// Key of the uploaded model.
    #[serde(default = "default_model_key")]
    pub model_key: String,
}

fn default_model_bucket() -> String {
    "trainflow-models".to_string()
}

fn default_model_key() -> String {
    "best.pt".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            model_bucket: default_model_bucket(),
            model_key: default_model_key(),
        }
    }
}

impl PublishConfig {
    /// Sets the model bucket.
    #[must_use]
    pub fn with_model_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.model_bucket = bucket.into();
        self
    }

    /// Sets the model key.
    #[must_use]
    pub fn with_model_key(mut self, key: impl Into<String>) -> Self {
        self.model_key = key.into();
        self
    }
}
