//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::sync::error::Error as SyncError;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("issue with path generation from template")]
    Template,
    /// A storage backend operation failed outside of a sync pass.
    #[display("storage operation failed")]
    Storage,
    /// Listing the files a pass works on failed; nothing was processed.
    #[display("could not list files on the {_0} backend")]
    Discovery(#[error(not(source))] String),
    /// A single file failed. The rest of the pass carries on.
    #[display("could not sync {}: {cause}", file.display())]
    Sync { file: PathBuf, cause: String },
}

impl ErrorKind {
    /// Attach the file a sync error concerns, keeping the per-file error tree
    /// as a child.
    #[track_caller]
    pub(crate) fn sync(file: impl Into<PathBuf>, err: SyncError) -> Error {
        let cause = (*err).to_string();
        err.raise(ErrorKind::Sync { file: file.into(), cause })
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The next pass picks failed files up again, storage hiccups included.
        matches!(self, Self::Storage | Self::Discovery(_) | Self::Sync { .. })
    }
}
