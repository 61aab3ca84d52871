//! File metadata returned by storage backends, for listing operations and
//! transfer decisions.

use std::ops::Deref;
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;

// The typestate is the whole point here: a transfer only accepts a file that
// has been observed twice with the same size. Mixed collections need to
// deref to FileMeta, same as ever.

/// File metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileMeta {
    /// Final path component as UTF-8, if it is one.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

mod sealed {
    pub trait Sealed {}
}
pub trait Observation: sealed::Sealed {
    type Settled;
}

/// Seen once, by a listing or a single `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listed;
impl sealed::Sealed for Listed {}
impl Observation for Listed {
    type Settled = ();
}

/// Seen twice, an interval apart, with the same size both times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled;
impl sealed::Sealed for Settled {}
impl Observation for Settled {
    type Settled = Duration;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo<S: Observation = Listed> {
    meta: FileMeta,
    /// How long the size was observed to hold still.
    pub settled_for: S::Settled,
}
impl<S: Observation> FileInfo<S> {
    // Explicit version of self.deref()
    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    pub fn into_meta(self) -> FileMeta {
        self.meta
    }
}
impl<S: Observation> Deref for FileInfo<S> {
    type Target = FileMeta;
    fn deref(&self) -> &FileMeta {
        &self.meta
    }
}

impl FileInfo {
    /// Create a new FileInfo from a listing operation.
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<OffsetDateTime>) -> Self {
        FileMeta {
            path: path.into(),
            size,
            modified: modified.into(),
        }
        .into()
    }

    /// Mark the file as no longer growing. Only the stability check should
    /// be handing these out.
    pub fn settle(self, interval: Duration) -> FileInfo<Settled> {
        FileInfo { meta: self.meta, settled_for: interval }
    }
}
impl From<FileMeta> for FileInfo<Listed> {
    fn from(meta: FileMeta) -> Self {
        Self { meta, settled_for: () }
    }
}
