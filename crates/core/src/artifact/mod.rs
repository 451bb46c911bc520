//! Writing downloaded reports to the results directory.

mod writer;

pub use writer::{decode_payload, sanitize_component, ArtifactWriter};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The payload is not valid base64.
    #[error("Report payload is not valid base64: {0}")]
    Decode(String),

    /// Checksum verification failed.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Failed to create the destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the file.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
