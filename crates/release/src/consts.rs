use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Media extensions stripped from the end of a release name.
pub(crate) const MEDIA_EXTENSIONS: [&str; 2] = [".mkv", ".mp4"];

// Group tags, CRCs and resolutions: "[SubsPlease]", "[ABCD1234]", "[1080p]".
regex!(BRACKET_TAG_REGEX, r"\[\w*\]");
// "02v2", "12v3"
regex!(VERSIONED_EPISODE_REGEX, r"^(\d+)v\d+$");
// "05", "12.5"
regex!(NUMERIC_EPISODE_REGEX, r"^(\d+)(?:\.\d+)?$");
