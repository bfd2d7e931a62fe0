//! Zip extraction for dataset archives.

use std::io;
use std::path::{Component, Path};

/// Why an archive could not be extracted.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The archive file could not be read.
    #[error("cannot read archive: {0}")]
    Read(#[source] io::Error),

    /// The archive structure is invalid.
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    /// An entry would be written outside the destination.
    #[error("unsafe entry path in archive: {0}")]
    UnsafePath(String),

    /// An entry uses a compression method other than store or deflate.
    #[error("unsupported compression method {method} for entry {entry}")]
    UnsupportedCompression {
        /// The entry name.
        entry: String,
        /// The method, as reported by the reader.
        method: String,
    },

    /// Writing an extracted entry failed.
    #[error("cannot write {entry}: {source}")]
    Write {
        /// The entry name.
        entry: String,
        /// The I/O failure.
        #[source]
        source: io::Error,
    },

    /// The archive contains no regular files.
    #[error("archive contains no files")]
    Empty,
}

/// Extracts every entry of the zip at `zip_path` into `out_dir`.
///
/// Directory structure is preserved. Entries with absolute paths or `..`
/// segments are rejected. Every entry is checked against the CRC and size
/// recorded in the archive; a mismatch is [`ArchiveError::Corrupt`] and the
/// damaged file is removed. Returns the number of regular files written.
pub fn extract_zip(zip_path: &Path, out_dir: &Path) -> Result<usize, ArchiveError> {
    let buf = std::fs::read(zip_path).map_err(ArchiveError::Read)?;
    let archive = rawzip::ZipArchive::from_slice(&buf)
        .map_err(|e| ArchiveError::Corrupt(format!("{e:?}")))?;

    let mut files = 0usize;
    for entry in archive.entries() {
        let entry = entry.map_err(|e| ArchiveError::Corrupt(format!("{e:?}")))?;
        let filename = entry
            .file_path()
            .try_normalize()
            .map_err(|e| ArchiveError::Corrupt(format!("bad entry name: {e:?}")))?
            .as_ref()
            .to_string();

        let relative = Path::new(&filename);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ArchiveError::UnsafePath(filename));
        }

        let out_path = out_dir.join(relative);
        let write_err = |source: io::Error| ArchiveError::Write {
            entry: filename.clone(),
            source,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(write_err)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let slice_entry = archive
            .get_entry(entry.wayfinder())
            .map_err(|e| ArchiveError::Corrupt(format!("entry {filename}: {e:?}")))?;
        let data = slice_entry.data();
        let mut out = std::fs::File::create(&out_path).map_err(write_err)?;

        let copied = match entry.compression_method() {
            rawzip::CompressionMethod::Store => {
                io::copy(&mut slice_entry.verifying_reader(data), &mut out)
            }
            rawzip::CompressionMethod::Deflate => {
                let decoder = flate2::read::DeflateDecoder::new(data);
                io::copy(&mut slice_entry.verifying_reader(decoder), &mut out)
            }
            method => {
                drop(out);
                let _ = std::fs::remove_file(&out_path);
                return Err(ArchiveError::UnsupportedCompression {
                    entry: filename,
                    method: format!("{method:?}"),
                });
            }
        };
        if let Err(e) = copied {
            drop(out);
            let _ = std::fs::remove_file(&out_path);
            return Err(match e.kind() {
                io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
                    ArchiveError::Corrupt(format!("entry {filename}: {e}"))
                }
                _ => write_err(e),
            });
        }
        files += 1;
    }

    if files == 0 {
        return Err(ArchiveError::Empty);
    }
    Ok(files)
}
