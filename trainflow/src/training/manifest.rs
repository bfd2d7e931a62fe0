//! Image manifests for the training engine.

use crate::errors::TrainingError;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as training images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// The two manifests written by [`prepare_manifests`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifests {
    /// Manifest listing training images.
    pub train_list: PathBuf,
    /// Manifest listing validation images.
    pub val_list: PathBuf,
    /// Number of lines appended to the training manifest.
    pub train_images: usize,
    /// Number of lines appended to the validation manifest.
    pub val_images: usize,
}

/// Returns true if `path` has an allow-listed image extension.
#[must_use]
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
}

/// Lists the images directly inside `dir` as absolute paths, sorted by name.
pub fn list_images(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = std::path::absolute(dir)?;
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        ));
    }
    let mut images = Vec::new();
    for entry in WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    Ok(images)
}

/// Appends one absolute path per line to `manifest`, creating it if needed.
fn append_lines(manifest: &Path, images: &[PathBuf]) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(manifest)?;
    let mut out = BufWriter::new(file);
    for image in images {
        writeln!(out, "{}", image.display())?;
    }
    out.flush()
}

/// Enumerates `dataset_root/images/{train,val}` and appends the image paths
/// to `train_list` and `val_list`.
///
/// Files without an allow-listed extension are skipped. A missing split
/// directory is an error.
pub fn prepare_manifests(
    dataset_root: &Path,
    train_list: &Path,
    val_list: &Path,
) -> Result<Manifests, TrainingError> {
    let images = dataset_root.join("images");
    let train_dir = images.join("train");
    let val_dir = images.join("val");

    let train = list_images(&train_dir).map_err(|e| TrainingError::prepare(&train_dir, e))?;
    let val = list_images(&val_dir).map_err(|e| TrainingError::prepare(&val_dir, e))?;

    append_lines(train_list, &train).map_err(|e| TrainingError::prepare(train_list, e))?;
    append_lines(val_list, &val).map_err(|e| TrainingError::prepare(val_list, e))?;

    Ok(Manifests {
        train_list: train_list.to_path_buf(),
        val_list: val_list.to_path_buf(),
        train_images: train.len(),
        val_images: val.len(),
    })
}
