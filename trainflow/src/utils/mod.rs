//! Utility functions for run identifiers, timestamps and file digests.

mod digest;
pub mod timestamps;

pub use digest::{is_non_empty_file, sha256_file};
pub use timestamps::{iso_timestamp, run_directory_name, Timestamp};

use uuid::Uuid;

/// Generates a new time-ordered run identifier.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::now_v7()
}
