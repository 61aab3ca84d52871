//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything in this enum is fatal: nothing runs on a configuration that
/// failed to load.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No configuration file exists at any of the searched locations.
    #[display("no configuration file found (searched {})", searched(_0))]
    NotFound(#[error(not(source))] Vec<PathBuf>),
    /// The platform has no notion of a user configuration directory.
    #[display("could not determine the user configuration directory")]
    NoConfigDir,
    /// The file (or environment) does not deserialize into a configuration.
    #[display("could not parse configuration")]
    Parse,
    /// The client name is used as a directory name on the seedbox.
    #[display("client name must be a single, non-empty path segment: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// Season keys must be positive integers.
    #[display("show {show:?}: season {season:?} is not a positive integer")]
    InvalidSeason { show: String, season: String },
    /// An episode range with `first > last`.
    #[display("show {show:?} season {season}: episode range [{first}, {last}] is inverted")]
    InvertedRange { show: String, season: u32, first: u32, last: u32 },
    /// A show name or alias that is blank.
    #[display("show names and aliases must not be empty (in {_0:?})")]
    EmptyName(#[error(not(source))] String),
    /// The same alias on two seasons; releases under it would be ambiguous.
    #[display("alias {_0:?} is used by more than one season")]
    DuplicateAlias(#[error(not(source))] String),
    /// An alias that is another show's name; releases under it would match
    /// whichever show sorts first.
    #[display("alias {alias:?} on show {show:?} is the name of another show")]
    AliasShadowsShow { alias: String, show: String },
    /// Refusing to overwrite an existing file with the template.
    #[display("configuration file already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    /// Reading or writing a configuration file failed.
    #[display("I/O error: {_0}")]
    Io(std::io::Error),
}

fn searched(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A broken configuration stays broken until someone edits it.
        false
    }
}
