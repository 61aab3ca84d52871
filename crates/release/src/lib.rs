//! Turn release filenames into catalog positions.
//!
//! Parsing ([`parse_release`]) knows about release groups and nothing about
//! the user's shows; matching ([`Catalog::find`]) knows about the user's shows
//! and nothing about filenames.

mod catalog;
mod consts;
mod convention;
pub mod error;
mod parse;

pub use crate::catalog::{Catalog, EpisodeRange, MatchResult, Season, Show};
pub use crate::convention::Convention;
pub use crate::parse::{ParsedRelease, parse, parse_release};
