//! Release Parsing Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use tracing::Level;

/// A parse failure with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a filename could not be turned into a show and an episode number.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// None of the known release group markers appear in the filename.
    #[display("no known release group in name")]
    UnknownConvention,
    /// The name does not split into a show and an episode.
    #[display("malformed release name: {_0}")]
    Malformed(#[error(not(source))] String),
    /// Specials, OVAs and the like. Expected, and not worth shouting about.
    #[display("not a regular episode: {_0}")]
    NotEpisodic(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A filename doesn't change between attempts.
        false
    }

    /// Severity the failure should be reported at.
    pub fn level(&self) -> Level {
        match self {
            Self::NotEpisodic(_) => Level::DEBUG,
            Self::UnknownConvention | Self::Malformed(_) => Level::WARN,
        }
    }
}
