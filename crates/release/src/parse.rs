use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::instrument;

use crate::consts::{BRACKET_TAG_REGEX, MEDIA_EXTENSIONS, NUMERIC_EPISODE_REGEX, VERSIONED_EPISODE_REGEX};
use crate::convention::Convention;
use crate::error::{ErrorKind, Result};

/// A release filename reduced to the two things that matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRelease {
    /// Show name exactly as the release group spelled it.
    pub show_token: String,
    /// Episode part as it appeared (`"05"`, `"02v2"`, `"12.5"`).
    pub episode_token: String,
    /// The episode token reduced to an integer.
    pub episode: u32,
}

impl Display for ParsedRelease {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} - {}", self.show_token, self.episode_token)
    }
}

/// Detect the convention and parse in one go.
///
/// ```
/// use seedsync_release::parse_release;
/// let parsed = parse_release("[SubsPlease] Example Anime - 05 (1080p) [ABCD1234].mkv").unwrap();
/// assert_eq!(parsed.show_token, "Example Anime");
/// assert_eq!(parsed.episode, 5);
/// ```
pub fn parse_release(filename: &str) -> Result<ParsedRelease> {
    parse(filename, Convention::detect(filename))
}

/// Parse a release filename following the given group's convention.
#[instrument(level = "debug")]
pub fn parse(filename: &str, convention: Convention) -> Result<ParsedRelease> {
    if convention == Convention::Unrecognized {
        exn::bail!(ErrorKind::UnknownConvention);
    }

    let mut name = filename.to_string();
    for noise in convention.noise() {
        name = name.replace(noise, "");
    }
    let name = BRACKET_TAG_REGEX.replace_all(&name, "");
    let name = strip_extension(name.trim_end());

    let Some((show, episode)) = name.rsplit_once('-') else {
        exn::bail!(ErrorKind::Malformed(filename.to_string()));
    };
    let (show, episode) = (show.trim(), episode.trim());
    if show.is_empty() || episode.is_empty() {
        exn::bail!(ErrorKind::Malformed(filename.to_string()));
    }

    Ok(ParsedRelease {
        show_token: show.to_string(),
        episode_token: episode.to_string(),
        episode: episode_number(episode)?,
    })
}

fn strip_extension(name: &str) -> &str {
    MEDIA_EXTENSIONS.iter().find_map(|ext| name.strip_suffix(ext)).unwrap_or(name)
}

/// `"05"` is 5, `"02v2"` is 2, `"12.5"` is 12. Anything mentioning an OVA
/// is not an episode at all.
fn episode_number(token: &str) -> Result<u32> {
    if token.contains("OVA") {
        exn::bail!(ErrorKind::NotEpisodic(token.to_string()));
    }
    let digits = VERSIONED_EPISODE_REGEX
        .captures(token)
        .or_else(|| NUMERIC_EPISODE_REGEX.captures(token))
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| ErrorKind::Malformed(token.to_string()))?;
    // Only fails on overflow; nobody is releasing episode four billion.
    Ok(digits.as_str().parse().map_err(|_| ErrorKind::Malformed(token.to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("[SubsPlease] Example Anime - 05 (1080p) [ABCD1234].mkv", "Example Anime", "05", 5)]
    #[case("[SubsPlease] Anime-Name II - 03 (1080p) [1234].mkv", "Anime-Name II", "03", 3)]
    #[case("[HorribleSubs] Example Anime - 12 [1080p].mkv", "Example Anime", "12", 12)]
    #[case("[HorribleSubs] Re-Zero - 05 [720p].mkv", "Re-Zero", "05", 5)]
    #[case("[SubsPlease] Re-Zero kara Hajimeru Isekai Seikatsu - 51 (1080p) [0F6A1B2C].mkv", "Re-Zero kara Hajimeru Isekai Seikatsu", "51", 51)]
    #[case("[SubsPlease] Made in Abyss - Retsujitsu no Ougonkyou - 02 (1080p) [A386198C].mkv", "Made in Abyss - Retsujitsu no Ougonkyou", "02", 2)]
    #[case("[SubsPlease] Show - 02v2 (1080p) [ABCD1234].mkv", "Show", "02v2", 2)]
    #[case("[SubsPlease] Show - 12.5 (1080p) [ABCD1234].mkv", "Show", "12.5", 12)]
    #[case("[SubsPlease] Show - 1000 (1080p).mp4", "Show", "1000", 1000)]
    #[case("[SubsPlease] Show - 00 (1080p).mkv", "Show", "00", 0)]
    fn test_parse(#[case] filename: &str, #[case] show: &str, #[case] token: &str, #[case] episode: u32) {
        let parsed = parse_release(filename).unwrap();
        assert_eq!(parsed.show_token, show);
        assert_eq!(parsed.episode_token, token);
        assert_eq!(parsed.episode, episode);
    }

    #[rstest]
    #[case("[ABCD1234] [SubsPlease] Show - 05 (1080p).mkv")]
    #[case("[SubsPlease][ABCD1234] Show - 05 (1080p).mkv")]
    #[case("[SubsPlease] Show - 05 (1080p) [ABCD1234][1080p].mkv")]
    #[case("[SubsPlease] Show [] - 05 (1080p).mkv")]
    fn test_bracket_removal_is_position_independent(#[case] filename: &str) {
        let parsed = parse_release(filename).unwrap();
        assert_eq!(parsed.show_token, "Show");
        assert_eq!(parsed.episode, 5);
    }

    #[test]
    fn test_every_tag_occurrence_is_removed() {
        let parsed = parse_release("[SubsPlease] Show [ABCD] - 05 (1080p) [ABCD].mkv").unwrap();
        assert_eq!(parsed.show_token, "Show");
    }

    #[test]
    fn test_resolution_noise_is_convention_specific() {
        // HorribleSubs never writes "(1080p)", so it is left alone and ends
        // up in the episode token.
        let err = parse("[HorribleSubs] Show - 05 (1080p).mkv", Convention::HorribleSubs).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
    }

    #[rstest]
    #[case("[SubsPlease] Show - OVA (1080p).mkv")]
    #[case("[SubsPlease] Show - 01 OVA (1080p).mkv")]
    #[case("[HorribleSubs] Show - OVA2 [1080p].mkv")]
    fn test_ova_is_not_episodic(#[case] filename: &str) {
        let err = parse_release(filename).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotEpisodic(_)));
    }

    #[rstest]
    #[case("[SubsPlease] Show 05 (1080p).mkv")]
    #[case("[SubsPlease] Show - (1080p).mkv")]
    #[case("[SubsPlease] - 05 (1080p).mkv")]
    #[case("[SubsPlease] Show - Special (1080p).mkv")]
    #[case("[SubsPlease] Show - 5v (1080p).mkv")]
    #[case("[SubsPlease] Show - 99999999999 (1080p).mkv")]
    #[case("[SubsPlease]")]
    fn test_malformed(#[case] filename: &str) {
        let err = parse_release(filename).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)), "{filename}: {:?}", &*err);
    }

    #[rstest]
    #[case("Show - 05.mkv")]
    #[case("[Erai-raws] Show - 05 [1080p].mkv")]
    fn test_unknown_convention(#[case] filename: &str) {
        let err = parse_release(filename).unwrap_err();
        assert_eq!(&*err, &ErrorKind::UnknownConvention);
    }

    #[test]
    fn test_explicit_unrecognized_convention_fails() {
        let err = parse("[SubsPlease] Show - 05.mkv", Convention::Unrecognized).unwrap_err();
        assert_eq!(&*err, &ErrorKind::UnknownConvention);
    }

    #[test]
    fn test_extension_only_stripped_as_suffix() {
        let parsed = parse_release("[SubsPlease] Show.mkv Fans - 05 (1080p).mkv").unwrap();
        assert_eq!(parsed.show_token, "Show.mkv Fans");
    }

    #[rstest]
    #[case("Example Anime", 1)]
    #[case("Re-Zero", 13)]
    #[case("Anime-Name II", 120)]
    fn test_generated_filename_parses_back(#[case] show: &str, #[case] episode: u32) {
        let filename = format!("[SubsPlease] {show} - {episode:02} (1080p) [ABCD1234].mkv");
        let parsed = parse_release(&filename).unwrap();
        assert_eq!((parsed.show_token.as_str(), parsed.episode), (show, episode));
    }
}
