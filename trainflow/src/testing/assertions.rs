//! Assertions that artifacts describe things that exist.

use crate::core::{IngestionArtifact, PublishArtifact, TrainingArtifact};
use crate::storage::FsObjectStore;
use crate::utils::{is_non_empty_file, sha256_file};

/// Asserts the archive and the extracted tree exist and hold the reported
/// number of files.
pub fn assert_ingestion_materialized(artifact: &IngestionArtifact) {
    assert!(
        is_non_empty_file(&artifact.dataset_archive_path),
        "archive missing or empty: {}",
        artifact.dataset_archive_path.display()
    );
    let files = walkdir::WalkDir::new(&artifact.extracted_dataset_path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count();
    assert_eq!(
        files, artifact.file_count,
        "extracted tree at {} holds {} files, artifact reports {}",
        artifact.extracted_dataset_path.display(),
        files,
        artifact.file_count
    );
}

/// Asserts the trained model exists and matches the recorded digest.
pub fn assert_training_materialized(artifact: &TrainingArtifact) {
    assert!(
        is_non_empty_file(&artifact.trained_model_path),
        "trained model missing or empty: {}",
        artifact.trained_model_path.display()
    );
    let digest = sha256_file(&artifact.trained_model_path).expect("hash trained model");
    assert_eq!(digest, artifact.model_sha256, "model digest mismatch");
}

/// Asserts the published object exists in `store` with the recorded digest.
pub fn assert_published(store: &FsObjectStore, artifact: &PublishArtifact) {
    let remote = store
        .object_path(&artifact.bucket_name, &artifact.remote_model_key)
        .expect("valid object path");
    assert!(
        is_non_empty_file(&remote),
        "published object missing: {}/{}",
        artifact.bucket_name,
        artifact.remote_model_key
    );
    let digest = sha256_file(&remote).expect("hash published model");
    assert_eq!(digest, artifact.model_sha256, "published digest mismatch");
}
