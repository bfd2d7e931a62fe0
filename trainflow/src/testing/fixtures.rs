//! On-disk fixtures: dataset archives and weights files.

use crate::storage::FsObjectStore;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use rawzip::{CompressionMethod, ZipArchiveWriter};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes an uncompressed zip holding `entries` to `path`.
pub fn write_stored_zip(path: &Path, entries: &[(&str, &[u8])]) -> io::Result<()> {
    write_zip(path, entries, CompressionMethod::Store)
}

/// Writes a deflate-compressed zip holding `entries` to `path`.
pub fn write_deflated_zip(path: &Path, entries: &[(&str, &[u8])]) -> io::Result<()> {
    write_zip(path, entries, CompressionMethod::Deflate)
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])], method: CompressionMethod) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut archive = ZipArchiveWriter::new(BufWriter::new(file));

    for (name, data) in entries {
        let (mut entry, config) = archive
            .new_file(name)
            .compression_method(method)
            .start()
            .map_err(io::Error::other)?;
        let output = if method == CompressionMethod::Deflate {
            let mut writer = config.wrap(DeflateEncoder::new(&mut entry, Compression::default()));
            writer.write_all(data)?;
            let (encoder, output) = writer.finish().map_err(io::Error::other)?;
            encoder.finish()?;
            output
        } else {
            let mut writer = config.wrap(&mut entry);
            writer.write_all(data)?;
            let (_, output) = writer.finish().map_err(io::Error::other)?;
            output
        };
        entry.finish(output).map_err(io::Error::other)?;
    }

    let mut out = archive.finish().map_err(io::Error::other)?;
    out.flush()
}

/// A small labeled detection dataset laid out the way the trainer expects.
#[derive(Debug, Clone, Default)]
pub struct DatasetFixture {
    entries: Vec<(String, Vec<u8>)>,
}

impl DatasetFixture {
    /// Creates an empty fixture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Two training images, one validation image and their labels.
    #[must_use]
    pub fn animals() -> Self {
        Self::new()
            .with_file("images/train/a.jpg", b"\xff\xd8a")
            .with_file("images/train/b.jpg", b"\xff\xd8b")
            .with_file("images/val/c.jpg", b"\xff\xd8c")
            .with_file("labels/train/a.txt", b"0 0.5 0.5 0.2 0.2\n")
            .with_file("labels/train/b.txt", b"1 0.4 0.4 0.3 0.3\n")
            .with_file("labels/val/c.txt", b"2 0.6 0.6 0.1 0.1\n")
    }

    /// Adds a file.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, contents: &[u8]) -> Self {
        self.entries.push((name.into(), contents.to_vec()));
        self
    }

    /// Returns the files, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    /// Returns the number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the fixture has no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the fixture as a deflated zip, the way dataset exports ship.
    pub fn write_zip(&self, path: &Path) -> io::Result<()> {
        let entries: Vec<(&str, &[u8])> = self
            .entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        write_deflated_zip(path, &entries)
    }

    /// Writes the fixture into `store` as `bucket/key`.
    pub fn publish(&self, store: &FsObjectStore, bucket: &str, key: &str) -> io::Result<PathBuf> {
        let path = store
            .object_path(bucket, key)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.write_zip(&path)?;
        Ok(path)
    }
}

/// Writes a stand-in weights file and returns its `file://` URL.
pub fn write_weights(dir: &Path, name: &str) -> io::Result<String> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, b"pretrained-weights")?;
    Ok(format!("file://{}", path.display()))
}
