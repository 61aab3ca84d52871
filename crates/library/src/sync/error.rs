//! Error types for the [`sync`](super) module.
//!
//! These never leave the module on their own: the pass streams raise them
//! into [`crate::error::ErrorKind::Sync`] along with the file they concern.

use derive_more::{Display, Error};

/// A per-file sync error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for per-file sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies where handling a single file went wrong.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading, writing, renaming or deleting on a backend failed.
    #[display("storage operation failed")]
    Storage,
    /// Copying between backends failed part way.
    #[display("transfer failed")]
    Transfer,
    /// The copy finished early, or late: the remote changed under us.
    #[display("copied {copied} of {expected} bytes")]
    Truncated { expected: u64, copied: u64 },
    /// The library destination could not be rendered or created.
    #[display("could not resolve the library destination")]
    Resolve,
    /// A pre-transfer check could not be carried out.
    #[display("transfer checks failed")]
    Guard,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A broken template stays broken until the configuration changes.
        !matches!(self, Self::Resolve)
    }
}
