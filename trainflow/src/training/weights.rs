//! Initial model weights.

use crate::errors::WeightDownloadError;
use crate::storage::{ensure_parent, temp_sibling};
use std::path::{Path, PathBuf};
use tracing::info;

/// Returns the file name a weights URL is cached under: its last path
/// segment, without query or fragment.
pub fn weights_file_name(url: &str) -> Result<&str, WeightDownloadError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name),
        _ => Err(WeightDownloadError::new(url, "URL has no file name")),
    }
}

/// Fetches the weights at `url` into `weights_dir` unless already present.
///
/// `url` may be `http://`, `https://`, `file://` or a plain local path.
/// Returns the local weights path.
pub async fn ensure_weights(url: &str, weights_dir: &Path) -> Result<PathBuf, WeightDownloadError> {
    let destination = weights_dir.join(weights_file_name(url)?);
    if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
        info!(path = %destination.display(), "Weights already present, skipping download");
        return Ok(destination);
    }

    ensure_parent(&destination)
        .await
        .map_err(|e| WeightDownloadError::new(url, format!("cannot create {}: {e}", weights_dir.display())))?;

    let temp = temp_sibling(&destination);
    let fetched = fetch(url, &temp).await;
    let bytes = match fetched {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
    };
    if bytes == 0 {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(WeightDownloadError::new(url, "weights file is empty"));
    }

    tokio::fs::rename(&temp, &destination)
        .await
        .map_err(|e| WeightDownloadError::new(url, e.to_string()))?;

    info!(url, bytes, path = %destination.display(), "Downloaded weights");
    Ok(destination)
}

async fn fetch(url: &str, into: &Path) -> Result<u64, WeightDownloadError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return fetch_http(url, into).await;
    }
    let source = url.strip_prefix("file://").unwrap_or(url);
    tokio::fs::copy(source, into)
        .await
        .map_err(|e| WeightDownloadError::new(url, e.to_string()))
}

#[cfg(feature = "http")]
async fn fetch_http(url: &str, into: &Path) -> Result<u64, WeightDownloadError> {
    use tokio::io::AsyncWriteExt;

    let mut response = reqwest::get(url).await.map_err(|e| WeightDownloadError::new(url, e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(WeightDownloadError::new(url, format!("server returned {status}")));
    }

    let mut file = tokio::fs::File::create(into).await.map_err(|e| WeightDownloadError::new(url, e.to_string()))?;
    let mut total = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| WeightDownloadError::new(url, e.to_string()))? {
        file.write_all(&chunk).await.map_err(|e| WeightDownloadError::new(url, e.to_string()))?;
        total += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| WeightDownloadError::new(url, e.to_string()))?;
    Ok(total)
}

#[cfg(not(feature = "http"))]
async fn fetch_http(url: &str, _into: &Path) -> Result<u64, WeightDownloadError> {
    Err(WeightDownloadError::new(url, "built without the `http` feature"))
}
