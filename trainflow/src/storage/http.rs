//! HTTP object store speaking path-style `GET`/`PUT` to
//! `{endpoint}/{bucket}/{key}`, as S3-compatible gateways accept for
//! anonymous buckets.

use super::{ensure_parent, remove_uploaded, temp_sibling, StorageClient};
use crate::errors::StorageError;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Object store backed by a plain HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpObjectStore {
    /// Creates a store for `endpoint` (e.g. `http://minio:9000`).
    pub fn new(endpoint: impl Into<String>) -> reqwest::Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(300))
    }

    /// Creates a store with a per-request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Returns the URL of `bucket/key`.
    ///
    /// Each path segment is percent-encoded, so `#` and `?` in a key stay
    /// part of the object name.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| StorageError::io(bucket, key, e))?;
        url.path_segments_mut()
            .map_err(|()| {
                StorageError::io(bucket, key, format!("{} cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl StorageClient for HttpObjectStore {
    async fn get(&self, bucket: &str, key: &str, destination: &Path) -> Result<PathBuf, StorageError> {
        let url = self.object_url(bucket, key)?;
        debug!(%url, "Fetching object");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| StorageError::io(bucket, key, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(StorageError::not_found(bucket, key)),
            status if !status.is_success() => {
                return Err(StorageError::io(bucket, key, format!("GET {url} returned {status}")));
            }
            _ => {}
        }

        ensure_parent(destination)
            .await
            .map_err(|e| StorageError::io(bucket, key, e))?;
        let temp = temp_sibling(destination);
        let written = async {
            let mut file = tokio::fs::File::create(&temp)
                .await
                .map_err(|e| StorageError::io(bucket, key, e))?;
            let mut total = 0u64;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| StorageError::io(bucket, key, e))?
            {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| StorageError::io(bucket, key, e))?;
                total += chunk.len() as u64;
            }
            file.flush().await.map_err(|e| StorageError::io(bucket, key, e))?;
            Ok::<u64, StorageError>(total)
        }
        .await;

        let total = match written {
            Ok(total) => total,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&temp, destination)
            .await
            .map_err(|e| StorageError::io(bucket, key, e))?;

        info!(bucket, key, bytes = total, destination = %destination.display(), "Downloaded object");
        Ok(destination.to_path_buf())
    }

    async fn put(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        remove_local_after: bool,
    ) -> Result<(), StorageError> {
        let body = match tokio::fs::read(local_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::LocalFileMissing {
                    path: local_path.to_path_buf(),
                });
            }
            Err(e) => return Err(StorageError::io(bucket, key, e)),
        };
        let bytes = body.len();

        let url = self.object_url(bucket, key)?;
        let response = self
            .client
            .put(url.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::io(bucket, key, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::io(bucket, key, format!("PUT {url} returned {status}")));
        }

        info!(bucket, key, bytes, source = %local_path.display(), "Uploaded object");

        if remove_local_after {
            remove_uploaded(local_path, bucket, key).await?;
        }
        Ok(())
    }
}
