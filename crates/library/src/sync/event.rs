use crate::identify::SkipReason;
use derive_more::Display;
use std::fmt;
use std::path::PathBuf;
use tracing::Level;

/// Which way files are moving.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local torrent queue to the seedbox blackhole.
    #[display("upload")]
    Upload,
    /// Seedbox completed directory to the media library.
    #[display("download")]
    Download,
}

/// Progress events emitted by [`upload`](super::upload) and
/// [`download`](super::download).
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    number of candidate files.
/// 3. [`RateLimited`](Self::RateLimited), at most once, uploads only.
/// 4. [`Processed`](Self::Processed), once per file that didn't fail.
/// 5. [`Complete`](Self::Complete), exactly once.
///
/// A discovery failure terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Started(Direction),
    DiscoveryComplete(u64),
    /// More files were queued than the rate limit allows this pass.
    RateLimited { admitted: usize, deferred: usize },
    Processed(Outcome),
    Complete(Direction),
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A torrent went out to the seedbox and into the backup archive.
    Uploaded {
        /// Path in the local queue, now removed.
        torrent: PathBuf,
        /// Path written on the remote.
        remote: PathBuf,
        show: String,
    },
    /// An episode came home.
    Downloaded {
        /// Path on the remote, now removed.
        remote: PathBuf,
        /// Path in the library.
        destination: PathBuf,
        bytes: u64,
    },
    /// Left alone this pass.
    Skipped { file: PathBuf, reason: SkipReason },
}
impl Outcome {
    pub(crate) fn skipped(file: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Self::Skipped { file: file.into(), reason }
    }

    /// Severity the outcome should be reported at.
    pub fn level(&self) -> Level {
        match self {
            Self::Uploaded { .. } | Self::Downloaded { .. } => Level::INFO,
            Self::Skipped { reason, .. } => reason.level(),
        }
    }
}
impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded { torrent, show, .. } => {
                write!(f, "Uploaded {} ({show})", display_name(torrent))
            },
            Self::Downloaded { destination, bytes, .. } => {
                write!(f, "Downloaded {} ({bytes} bytes)", destination.display())
            },
            Self::Skipped { file, reason } => write!(f, "Skipped {}: {reason}", display_name(file)),
        }
    }
}

fn display_name(path: &std::path::Path) -> std::borrow::Cow<'_, str> {
    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy()
}
