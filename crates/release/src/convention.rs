use std::fmt::{Display, Formatter, Result as FmtResult};

/// Release group naming conventions.
///
/// Detection only looks for the group's marker tag; what to clean up once a
/// convention is known is a separate concern (see [`noise()`](Self::noise)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// `[HorribleSubs] Show - 01 [1080p].mkv`
    HorribleSubs,
    /// `[SubsPlease] Show - 01 (1080p) [ABCD1234].mkv`
    SubsPlease,
    /// No known marker.
    Unrecognized,
}
impl Convention {
    /// Known conventions, in detection order.
    pub const KNOWN: [Convention; 2] = [Convention::HorribleSubs, Convention::SubsPlease];

    /// Pick the convention whose marker appears in the filename. The first
    /// marker found in [`KNOWN`](Self::KNOWN) order wins.
    ///
    /// ```
    /// use seedsync_release::Convention;
    /// assert_eq!(Convention::detect("[SubsPlease] Show - 01 (1080p).mkv"), Convention::SubsPlease);
    /// assert_eq!(Convention::detect("Show.S01E01.1080p.mkv"), Convention::Unrecognized);
    /// ```
    pub fn detect(filename: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|convention| convention.marker().is_some_and(|marker| filename.contains(marker)))
            .unwrap_or(Self::Unrecognized)
    }

    /// The exact tag identifying the release group.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::HorribleSubs => Some("[HorribleSubs]"),
            Self::SubsPlease => Some("[SubsPlease]"),
            Self::Unrecognized => None,
        }
    }

    /// Literal fragments this group adds that brackets-removal won't catch.
    pub(crate) fn noise(&self) -> &'static [&'static str] {
        match self {
            Self::SubsPlease => &[" (1080p)"],
            Self::HorribleSubs | Self::Unrecognized => &[],
        }
    }
}

impl Display for Convention {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::HorribleSubs => write!(f, "HorribleSubs"),
            Self::SubsPlease => write!(f, "SubsPlease"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}
