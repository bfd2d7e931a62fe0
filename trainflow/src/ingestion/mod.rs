//! Data ingestion stage: fetch the dataset archive and unpack it into the
//! feature store.

mod archive;

pub use archive::{extract_zip, ArchiveError};

use crate::config::IngestionConfig;
use crate::core::{IngestionArtifact, StageKind};
use crate::errors::IngestionError;
use crate::stages::Stage;
use crate::storage::StorageClient;
use crate::utils::is_non_empty_file;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of unpacking an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDataset {
    /// The feature-store directory.
    pub root: PathBuf,
    /// Number of regular files extracted.
    pub file_count: usize,
}

/// Downloads and extracts the training dataset.
pub struct DataIngestion {
    config: IngestionConfig,
    storage: Arc<dyn StorageClient>,
}

impl std::fmt::Debug for DataIngestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataIngestion")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DataIngestion {
    /// Creates the stage.
    #[must_use]
    pub fn new(config: IngestionConfig, storage: Arc<dyn StorageClient>) -> Self {
        Self { config, storage }
    }

    /// Returns the stage configuration.
    #[must_use]
    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Downloads the dataset archive into the ingestion directory.
    pub async fn download_data(&self) -> Result<PathBuf, IngestionError> {
        let dir = &self.config.ingestion_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| IngestionError::Directory {
                path: dir.clone(),
                source,
            })?;

        let destination = self.config.archive_path();
        info!(
            bucket = %self.config.data_bucket,
            key = %self.config.dataset_key,
            destination = %destination.display(),
            "Downloading dataset archive"
        );

        let path = self
            .storage
            .get(&self.config.data_bucket, &self.config.dataset_key, &destination)
            .await
            .map_err(|source| IngestionError::Download {
                bucket: self.config.data_bucket.clone(),
                key: self.config.dataset_key.clone(),
                source,
            })?;

        if !is_non_empty_file(&path) {
            return Err(IngestionError::extract(&path, "downloaded archive is missing or empty"));
        }
        Ok(path)
    }

    /// Unpacks `archive_path` into a freshly emptied feature-store directory.
    ///
    /// Anything left there by an earlier run is removed first, so the tree
    /// holds exactly the archive's files. On failure the directory may hold
    /// a partial tree; it is never reported as a dataset.
    pub async fn extract_archive(&self, archive_path: &Path) -> Result<ExtractedDataset, IngestionError> {
        let root = self.config.feature_store_dir.clone();
        match tokio::fs::remove_dir_all(&root).await {
            Ok(()) => debug!(path = %root.display(), "Cleared previous feature store"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(IngestionError::Directory {
                    path: root.clone(),
                    source,
                })
            }
        }
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| IngestionError::Directory {
                path: root.clone(),
                source,
            })?;

        info!(
            archive = %archive_path.display(),
            destination = %root.display(),
            "Extracting dataset archive"
        );

        let archive = archive_path.to_path_buf();
        let out_dir = root.clone();
        let file_count = tokio::task::spawn_blocking(move || extract_zip(&archive, &out_dir))
            .await
            .map_err(|e| IngestionError::extract(archive_path, format!("extraction task aborted: {e}")))?
            .map_err(|e| IngestionError::extract(archive_path, e.to_string()))?;

        info!(files = file_count, "Extraction complete");
        Ok(ExtractedDataset { root, file_count })
    }

    /// Downloads then extracts, returning the ingestion artifact.
    pub async fn run(&self) -> Result<IngestionArtifact, IngestionError> {
        let archive = self.download_data().await?;
        let extracted = self.extract_archive(&archive).await?;
        let artifact = IngestionArtifact::new(archive, extracted.root, extracted.file_count);
        info!(artifact = ?artifact, "Data ingestion finished");
        Ok(artifact)
    }
}

#[async_trait]
impl Stage for DataIngestion {
    type Input = ();
    type Artifact = IngestionArtifact;
    type Error = IngestionError;

    const KIND: StageKind = StageKind::Ingestion;

    async fn execute(&self, _input: ()) -> Result<IngestionArtifact, IngestionError> {
        self.run().await
    }
}
