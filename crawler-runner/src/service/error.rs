//! Store error types

use crawler_core::TimestampError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while merging lines into the log store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed (permissions, disk full, ...)
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The last stored line of a file has no readable timestamp
    #[error("cannot read high-water mark of {}: {source}", path.display())]
    Timestamp {
        path: PathBuf,
        #[source]
        source: TimestampError,
    },

    /// Owner key is not usable as a directory name
    #[error("invalid owner key {0:?}")]
    InvalidOwnerKey(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
