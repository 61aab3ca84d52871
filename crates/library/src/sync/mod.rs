//! The two passes that keep the seedbox and the library in step.
//!
//! [`upload`] pushes queued `.torrent` files into the seedbox blackhole and
//! archives them per show; [`download`] pulls finished episodes from the
//! seedbox into their library location. Both stream [`SyncEvent`]s in the
//! same order and both process files one at a time, in path order.
//!
//! A file that can't be handled *yet* (unparseable, unmatched, still being
//! written, no room) is reported as [`Outcome::Skipped`] and left in place
//! for the next pass. A file that fails part way is yielded as an `Err`
//! item and the pass carries on. Only failing to list the candidate files
//! ends a stream early.

mod download;
pub mod error;
mod event;
mod upload;

pub use self::download::download;
pub use self::event::{Direction, Outcome, SyncEvent};
pub use self::upload::upload;

use seedsync_storage::FileInfo;

/// Sort a listing into a stable processing order.
fn in_path_order(mut files: Vec<FileInfo>) -> Vec<FileInfo> {
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

fn count(files: &[FileInfo]) -> u64 {
    // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
    u64::try_from(files.len()).unwrap_or(u64::MAX)
}
