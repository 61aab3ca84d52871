//! Checks run before a transfer is attempted.
//!
//! None of these are errors when they say no: a file that is still being
//! written, that doesn't fit, or that didn't make the rate limit is simply
//! looked at again on the next pass.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use seedsync_storage::BackendHandle;
use seedsync_storage::file::{FileInfo, FileMeta, Settled};
use std::path::Path;
use std::time::Duration;

/// Stat, wait `interval`, stat again. The file is settled when both sizes
/// agree.
///
/// Best effort: a writer that pauses for exactly the interval looks
/// finished. The second observation is the one handed back.
pub async fn stabilize(backend: &BackendHandle, path: &Path, interval: Duration) -> Result<Option<FileInfo<Settled>>> {
    let first = backend.stat(path).await.or_raise(|| ErrorKind::Storage)?;
    tokio::time::sleep(interval).await;
    let second = backend.stat(path).await.or_raise(|| ErrorKind::Storage)?;
    if first.size != second.size {
        tracing::debug!(path = %path.display(), before = first.size, after = second.size, "File is still growing");
        return Ok(None);
    }
    Ok(Some(second.settle(interval)))
}

/// Whether the file at `path` has stopped changing size.
pub async fn is_stable(backend: &BackendHandle, path: &Path, interval: Duration) -> Result<bool> {
    Ok(stabilize(backend, path, interval).await?.is_some())
}

/// Outcome of comparing a file against the free space of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceCheck {
    pub required: u64,
    pub available: u64,
}
impl SpaceCheck {
    /// Free space has to be strictly greater than the file; filling a disk
    /// to the last byte is not a success.
    pub fn sufficient(&self) -> bool {
        self.available > self.required
    }
}

/// Compare the file's size with the free space of the volume `volume` lives on.
pub async fn has_space(file: &FileMeta, volume: &BackendHandle) -> Result<SpaceCheck> {
    let available = volume.available_space().await.or_raise(|| ErrorKind::Storage)?;
    Ok(SpaceCheck { required: file.size, available })
}

/// Items split by the rate limiter, both halves in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimited<T> {
    pub admitted: Vec<T>,
    pub deferred: Vec<T>,
}

/// Admit at most `limit` items, preserving their order.
pub fn rate_limit<T>(mut items: Vec<T>, limit: usize) -> RateLimited<T> {
    let deferred = items.split_off(limit.min(items.len()));
    RateLimited { admitted: items, deferred }
}
