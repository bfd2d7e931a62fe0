//! Filesystem-backed object store.

use super::{ensure_parent, remove_uploaded, temp_sibling, StorageClient};
use crate::errors::StorageError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Object store keeping each bucket as a directory under a root:
///
/// ```text
/// root/
/// ├── datasets/
/// │   └── dataset.zip
/// └── models/
///     └── best.pt
/// ```
///
/// Useful for local runs and tests; objects are written to a temporary
/// sibling and renamed into place.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Creates a store rooted at `root`, creating the directory.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns where `bucket/key` lives on disk.
    ///
    /// Bucket and key must be relative and free of `..` segments.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        for part in [bucket, key] {
            let path = Path::new(part);
            let escapes = part.is_empty()
                || path
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(StorageError::io(
                    bucket,
                    key,
                    format!("invalid object name '{part}'"),
                ));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

/// Copies `from` to `to` through a temporary sibling of `to`.
async fn copy_into_place(from: &Path, to: &Path) -> std::io::Result<()> {
    ensure_parent(to).await?;
    let temp = temp_sibling(to);
    if let Err(e) = tokio::fs::copy(from, &temp).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    tokio::fs::rename(&temp, to).await
}

#[async_trait]
impl StorageClient for FsObjectStore {
    async fn get(&self, bucket: &str, key: &str, destination: &Path) -> Result<PathBuf, StorageError> {
        let source = self.object_path(bucket, key)?;
        let is_file = tokio::fs::metadata(&source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(StorageError::not_found(bucket, key));
        }

        copy_into_place(&source, destination)
            .await
            .map_err(|e| StorageError::io(bucket, key, e))?;

        info!(
            bucket,
            key,
            destination = %destination.display(),
            "Downloaded object"
        );
        Ok(destination.to_path_buf())
    }

    async fn put(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        remove_local_after: bool,
    ) -> Result<(), StorageError> {
        if !tokio::fs::try_exists(local_path).await.unwrap_or(false) {
            return Err(StorageError::LocalFileMissing {
                path: local_path.to_path_buf(),
            });
        }

        let target = self.object_path(bucket, key)?;
        copy_into_place(local_path, &target)
            .await
            .map_err(|e| StorageError::io(bucket, key, e))?;

        info!(bucket, key, source = %local_path.display(), "Uploaded object");

        if remove_local_after {
            remove_uploaded(local_path, bucket, key).await?;
        }
        Ok(())
    }
}
