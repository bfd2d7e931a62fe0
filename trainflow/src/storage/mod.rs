//! Remote object storage boundary.
//!
//! The pipeline needs exactly two operations from a blob store: download an
//! object to a local file and upload a local file to a key. Listing,
//! versioning and deletion are not part of the contract.

mod fs;
#[cfg(feature = "http")]
mod http;

pub use fs::FsObjectStore;
#[cfg(feature = "http")]
pub use http::HttpObjectStore;

use crate::errors::StorageError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Uniform get/put of named objects against a blob store.
///
/// Implementations always perform the transfer when called. Skipping a
/// download because the destination already exists is the caller's call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Downloads `bucket/key` to `destination`, creating parent directories.
    ///
    /// Returns the local path written.
    async fn get(&self, bucket: &str, key: &str, destination: &Path) -> Result<PathBuf, StorageError>;

    /// Uploads `local_path` to `bucket/key`.
    ///
    /// When `remove_local_after` is set the local file is deleted once the
    /// upload has succeeded.
    async fn put(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        remove_local_after: bool,
    ) -> Result<(), StorageError>;
}

/// Returns a unique temporary path next to `path`.
///
/// Writes land here first and are renamed into place, so a reader never
/// observes a half-written file at `path`.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "object".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial-{}", uuid::Uuid::new_v4().simple()))
}

/// Creates the parent directory of `path` if it has one.
pub(crate) async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

/// Removes the local copy after a successful upload.
pub(crate) async fn remove_uploaded(
    local_path: &Path,
    bucket: &str,
    key: &str,
) -> Result<(), StorageError> {
    tokio::fs::remove_file(local_path)
        .await
        .map_err(|e| StorageError::io(bucket, key, e))?;
    tracing::debug!(path = %local_path.display(), "Removed local copy after upload");
    Ok(())
}
