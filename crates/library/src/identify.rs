use derive_more::Display;
use seedsync_release::error::ErrorKind as ReleaseErrorKind;
use seedsync_release::{Catalog, MatchResult, parse_release};
use tracing::Level;

/// Why a file was left where it is this pass.
///
/// Skips are not errors: the file is looked at again next time. Each one
/// renders as a single human-readable line.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The filename doesn't follow a known release convention.
    #[display("{_0}")]
    Unparseable(ReleaseErrorKind),
    /// Parsed fine, but no catalog entry claims it.
    #[display("no rule for {show:?} episode {episode}")]
    Unmatched { show: String, episode: u32 },
    /// The remote file was still growing.
    #[display("still being written")]
    InProgress,
    /// The library volume can't take it.
    #[display("not enough space ({required} bytes needed, {available} free)")]
    InsufficientSpace { required: u64, available: u64 },
    /// Over this pass's upload allowance. Reported at `DEBUG`: the pass
    /// emits one `RateLimited` summary event with the counts, which stands
    /// in for the per-file lines at the default level.
    #[display("rate limited, deferred to the next run")]
    RateLimited,
}
impl SkipReason {
    /// Severity the skip should be reported at.
    pub fn level(&self) -> Level {
        match self {
            Self::Unparseable(kind) => kind.level(),
            // One summary line covers the whole deferred batch.
            Self::RateLimited => Level::DEBUG,
            Self::InProgress => Level::INFO,
            Self::Unmatched { .. } | Self::InsufficientSpace { .. } => Level::WARN,
        }
    }
}

/// Parse a release filename and find where it belongs in the catalog.
pub fn identify<'c>(catalog: &'c Catalog, filename: &str) -> Result<MatchResult<'c>, SkipReason> {
    let release = parse_release(filename).map_err(|e| SkipReason::Unparseable((*e).clone()))?;
    catalog.find(&release).ok_or(SkipReason::Unmatched {
        show: release.show_token,
        episode: release.episode,
    })
}
