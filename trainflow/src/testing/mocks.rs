//! Stand-in training engines and a recording storage wrapper.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::{StorageError, TrainingEngineError};
use crate::storage::StorageClient;
use crate::training::{TrainingEngine, TrainingRequest};

/// An engine that writes a fixed model file where the real one would.
#[derive(Debug)]
pub struct FakeTrainingEngine {
    model: Vec<u8>,
    write_output: bool,
    calls: AtomicUsize,
    last_request: Mutex<Option<TrainingRequest>>,
}

impl Default for FakeTrainingEngine {
    fn default() -> Self {
        Self::new(b"fake-trained-model".to_vec())
    }
}

impl FakeTrainingEngine {
    /// Creates an engine that writes `model` as `best.pt`.
    #[must_use]
    pub fn new(model: Vec<u8>) -> Self {
        Self {
            model,
            write_output: true,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Creates an engine that reports success without writing anything.
    #[must_use]
    pub fn without_output() -> Self {
        Self {
            write_output: false,
            ..Self::default()
        }
    }

    /// Returns the number of times the engine was called.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<TrainingRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl TrainingEngine for FakeTrainingEngine {
    async fn train(&self, request: &TrainingRequest) -> Result<(), TrainingEngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        if self.write_output {
            let model = request.expected_model_path();
            let write = async {
                if let Some(parent) = model.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&model, &self.model).await
            };
            write.await.map_err(|e| TrainingEngineError::Failed {
                program: "fake".to_string(),
                exit_code: None,
                stderr: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// An engine that always exits non-zero.
#[derive(Debug)]
pub struct FailingTrainingEngine {
    stderr: String,
    calls: AtomicUsize,
}

impl FailingTrainingEngine {
    /// Creates an engine failing with `stderr`.
    #[must_use]
    pub fn new(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the engine was called.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrainingEngine for FailingTrainingEngine {
    async fn train(&self, _request: &TrainingRequest) -> Result<(), TrainingEngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TrainingEngineError::Failed {
            program: "fake".to_string(),
            exit_code: Some(1),
            stderr: self.stderr.clone(),
        })
    }
}

/// A recorded `put` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    /// The local file.
    pub local_path: PathBuf,
    /// The target bucket.
    pub bucket: String,
    /// The target key.
    pub key: String,
    /// Whether the local copy was to be removed.
    pub remove_local_after: bool,
}

/// Wraps a storage client and records every call made through it.
pub struct RecordingStorageClient {
    inner: Arc<dyn StorageClient>,
    gets: Mutex<Vec<(String, String)>>,
    puts: Mutex<Vec<RecordedPut>>,
}

impl std::fmt::Debug for RecordingStorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingStorageClient")
            .field("gets", &self.gets.lock().len())
            .field("puts", &self.puts.lock().len())
            .finish_non_exhaustive()
    }
}

impl RecordingStorageClient {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn StorageClient>) -> Self {
        Self {
            inner,
            gets: Mutex::new(Vec::new()),
            puts: Mutex::new(Vec::new()),
        }
    }

    /// Returns the `(bucket, key)` of every `get`.
    #[must_use]
    pub fn gets(&self) -> Vec<(String, String)> {
        self.gets.lock().clone()
    }

    /// Returns every `put`.
    #[must_use]
    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().clone()
    }
}

#[async_trait]
impl StorageClient for RecordingStorageClient {
    async fn get(&self, bucket: &str, key: &str, destination: &Path) -> Result<PathBuf, StorageError> {
        self.gets.lock().push((bucket.to_string(), key.to_string()));
        self.inner.get(bucket, key, destination).await
    }

    async fn put(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        remove_local_after: bool,
    ) -> Result<(), StorageError> {
        self.puts.lock().push(RecordedPut {
            local_path: local_path.to_path_buf(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            remove_local_after,
        });
        self.inner.put(local_path, bucket, key, remove_local_after).await
    }
}
