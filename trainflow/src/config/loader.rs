//! Whole-pipeline configuration: construction, file loading, overrides and
//! validation.

use super::{IngestionConfig, PublishConfig, TrainingConfig};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides the data bucket.
pub const ENV_DATA_BUCKET: &str = "TRAINFLOW_DATA_BUCKET";
/// Overrides the model bucket.
pub const ENV_MODEL_BUCKET: &str = "TRAINFLOW_MODEL_BUCKET";
/// Overrides the epoch count.
pub const ENV_EPOCHS: &str = "TRAINFLOW_EPOCHS";
/// Overrides the batch size.
pub const ENV_BATCH_SIZE: &str = "TRAINFLOW_BATCH_SIZE";

/// Configuration for a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Ingestion stage parameters.
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Training stage parameters.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Publishing stage parameters.
    #[serde(default)]
    pub publish: PublishConfig,
}

impl PipelineConfig {
    /// Creates a config whose working directories all live under `root`.
    #[must_use]
    pub fn under_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            ingestion: IngestionConfig::under_root(root),
            training: TrainingConfig::under_root(root),
            publish: PublishConfig::default(),
        }
    }

    /// Parses a config from JSON, resolving relative directories against `base`.
    pub fn from_json_str(json: &str, base: &Path) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        config.resolve_paths(base);
        Ok(config)
    }

    /// Loads a config from a JSON file.
    ///
    /// Relative directories are resolved against the file's parent directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let base = std::path::absolute(&base).map_err(|source| ConfigError::Read {
            path: base.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded pipeline config");
        Self::from_json_str(&contents, &base).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Makes every relative directory absolute by joining it onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for dir in [
            &mut self.ingestion.ingestion_dir,
            &mut self.ingestion.feature_store_dir,
            &mut self.training.training_dir,
            &mut self.training.weights_dir,
        ] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bucket) = lookup(ENV_DATA_BUCKET) {
            self.ingestion.data_bucket = bucket;
        }
        if let Some(bucket) = lookup(ENV_MODEL_BUCKET) {
            self.publish.model_bucket = bucket;
        }
        if let Some(epochs) = lookup(ENV_EPOCHS) {
            self.training.epochs = parse_count(ENV_EPOCHS, &epochs)?;
        }
        if let Some(batch) = lookup(ENV_BATCH_SIZE) {
            self.training.batch_size = parse_count(ENV_BATCH_SIZE, &batch)?;
        }
        Ok(())
    }

    /// Checks that the config can drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ingestion.data_bucket", &self.ingestion.data_bucket),
            ("ingestion.dataset_key", &self.ingestion.dataset_key),
            ("training.weights_url", &self.training.weights_url),
            ("training.run_name", &self.training.run_name),
            ("publish.model_bucket", &self.publish.model_bucket),
            ("publish.model_key", &self.publish.model_key),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }

        for (field, dir) in [
            ("ingestion.ingestion_dir", &self.ingestion.ingestion_dir),
            ("ingestion.feature_store_dir", &self.ingestion.feature_store_dir),
            ("training.training_dir", &self.training.training_dir),
            ("training.weights_dir", &self.training.weights_dir),
        ] {
            if !dir.is_absolute() {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be an absolute path, got '{}'", dir.display()),
                ));
            }
        }

        if self
            .ingestion
            .ingestion_dir
            .starts_with(&self.ingestion.feature_store_dir)
        {
            return Err(ConfigError::invalid(
                "ingestion.feature_store_dir",
                "must not contain the ingestion directory; it is cleared before extraction",
            ));
        }

        if self.training.epochs == 0 {
            return Err(ConfigError::invalid("training.epochs", "must be at least 1"));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::invalid("training.batch_size", "must be at least 1"));
        }
        if self.training.class_names.is_empty() {
            return Err(ConfigError::invalid("training.class_names", "must name at least one class"));
        }
        let run_name = self.training.run_name.as_str();
        if run_name.contains(['/', '\\']) || run_name == "." || run_name == ".." {
            return Err(ConfigError::invalid("training.run_name", "must be a single path segment"));
        }

        Ok(())
    }
}

fn parse_count(field: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::invalid(field, format!("'{raw}' is not a count: {e}")))
}
