//! Application Error Types
//!
//! Everything here is fatal to the run; per-file problems are reported by
//! the sync passes and never reach this far.

use derive_more::{Display, Error};
use seedsync_library::sync::Direction;

/// A fatal error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for the binary.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("naming templates are invalid")]
    Template,
    #[display("could not write the template configuration")]
    Init,
    /// A backend root is missing or unusable.
    #[display("could not open the {_0} storage")]
    Storage(#[error(not(source))] &'static str),
    /// Listing the candidate files failed, so the pass did nothing.
    #[display("{direction} pass aborted: {cause}")]
    Pass { direction: Direction, cause: String },
}
