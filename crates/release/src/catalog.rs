//! The user's catalog of shows, and matching parsed releases against it.
//!
//! A catalog maps a canonical show name to its seasons; each season owns an
//! inclusive range of the release group's episode numbers and, optionally, an
//! alias. Release groups often number a new season from 1 again under a
//! different title ("Anime-Name II"), which is what the alias is for.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use crate::parse::ParsedRelease;

/// Inclusive range of episode numbers, `first <= last` guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeRange {
    first: u32,
    last: u32,
}
impl EpisodeRange {
    /// Returns `None` when the range is inverted.
    pub fn new(first: u32, last: u32) -> Option<Self> {
        (first <= last).then_some(Self { first, last })
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    pub fn contains(&self, episode: u32) -> bool {
        (self.first..=self.last).contains(&episode)
    }

    pub fn overlaps(&self, other: &EpisodeRange) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    /// One-based position of `episode` within the range. `None` when the
    /// episode is outside it, or the position doesn't fit in a `u32`.
    fn relative(&self, episode: u32) -> Option<u32> {
        if !self.contains(episode) {
            return None;
        }
        (episode - self.first).checked_add(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub episodes: EpisodeRange,
    /// Alternate show name this season, and only this season, is released as.
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Show {
    /// Iterated in ascending season order.
    pub seasons: BTreeMap<NonZeroU32, Season>,
}
impl Show {
    fn answers_to(&self, name: &str, token: &str) -> bool {
        name == token || self.seasons.values().any(|season| season.alias.as_deref() == Some(token))
    }

    /// Pairs of seasons whose ranges overlap. Harmless when an alias tells
    /// them apart, otherwise the lower season always wins.
    pub fn overlapping_seasons(&self) -> Vec<(NonZeroU32, NonZeroU32)> {
        let seasons: Vec<_> = self.seasons.iter().collect();
        seasons
            .iter()
            .enumerate()
            .flat_map(|(i, (a, first))| {
                seasons[i + 1..]
                    .iter()
                    .filter(move |(_, second)| first.episodes.overlaps(&second.episodes))
                    .map(move |(b, _)| (**a, **b))
            })
            .collect()
    }
}

/// Where a release belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult<'c> {
    /// Canonical show name, never the alias.
    pub show: &'c str,
    pub season: NonZeroU32,
    /// Position of the episode within its season, starting at 1.
    pub relative_episode: u32,
}

/// Ordered mapping of canonical show name to [`Show`]. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    shows: Vec<(String, Show)>,
}
impl Catalog {
    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Show> {
        self.shows.iter().find(|(show, _)| show == name).map(|(_, show)| show)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Show)> {
        self.shows.iter().map(|(name, show)| (name.as_str(), show))
    }

    /// Find the season a parsed release belongs to.
    ///
    /// A show is considered if its name, or one of its seasons' aliases, is
    /// the release's show token. Within it, a season matches when the
    /// episode is in range and the token is either the show's name or that
    /// season's own alias. Shows are tried in catalog order and seasons in
    /// ascending order; the first match wins.
    ///
    /// ```
    /// use seedsync_release::{Catalog, EpisodeRange, Season, Show, parse_release};
    /// use std::num::NonZeroU32;
    ///
    /// let season = |first, last, alias: Option<&str>| Season {
    ///     episodes: EpisodeRange::new(first, last).unwrap(),
    ///     alias: alias.map(String::from),
    /// };
    /// let one = NonZeroU32::new(1).unwrap();
    /// let two = NonZeroU32::new(2).unwrap();
    /// let catalog = Catalog::from_iter([(
    ///     "Example Anime".to_string(),
    ///     Show { seasons: [(one, season(0, 13, None)), (two, season(0, 13, Some("Anime-Name II")))].into() },
    /// )]);
    ///
    /// let parsed = parse_release("[SubsPlease] Anime-Name II - 03 (1080p) [1234].mkv").unwrap();
    /// let matched = catalog.find(&parsed).unwrap();
    /// assert_eq!((matched.show, matched.season.get(), matched.relative_episode), ("Example Anime", 2, 4));
    /// ```
    pub fn find(&self, release: &ParsedRelease) -> Option<MatchResult<'_>> {
        let token = release.show_token.as_str();
        self.shows
            .iter()
            .filter(|(name, show)| show.answers_to(name, token))
            .find_map(|(name, show)| {
                show.seasons
                    .iter()
                    .filter(|(_, season)| name == token || season.alias.as_deref() == Some(token))
                    .find_map(|(number, season)| {
                        Some(MatchResult {
                            show: name.as_str(),
                            season: *number,
                            relative_episode: season.episodes.relative(release.episode)?,
                        })
                    })
            })
    }
}

/// Later duplicates of a show name are kept but can never match.
impl FromIterator<(String, Show)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, Show)>>(iter: I) -> Self {
        Self { shows: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_release;
    use rstest::{fixture, rstest};

    fn nz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn season(first: u32, last: u32, alias: Option<&str>) -> Season {
        Season {
            episodes: EpisodeRange::new(first, last).unwrap(),
            alias: alias.map(String::from),
        }
    }

    fn release(show: &str, episode: u32) -> ParsedRelease {
        ParsedRelease {
            show_token: show.to_string(),
            episode_token: format!("{episode:02}"),
            episode,
        }
    }

    #[fixture]
    fn catalog() -> Catalog {
        Catalog::from_iter([
            (
                "Example Anime".to_string(),
                Show {
                    seasons: [(nz(1), season(0, 13, None)), (nz(2), season(0, 13, Some("Anime-Name II")))].into(),
                },
            ),
            (
                "Other Anime".to_string(),
                Show {
                    seasons: [(nz(1), season(1, 12, None)), (nz(2), season(13, 24, None))].into(),
                },
            ),
        ])
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(EpisodeRange::new(13, 0).is_none());
        assert!(EpisodeRange::new(5, 5).is_some());
    }

    #[rstest]
    #[case(1, 12, 13, 24, false)]
    #[case(1, 12, 12, 24, true)]
    #[case(0, 13, 0, 13, true)]
    #[case(5, 5, 1, 10, true)]
    fn test_overlaps(#[case] a: u32, #[case] b: u32, #[case] c: u32, #[case] d: u32, #[case] expected: bool) {
        let (left, right) = (EpisodeRange::new(a, b).unwrap(), EpisodeRange::new(c, d).unwrap());
        assert_eq!(left.overlaps(&right), expected);
        assert_eq!(right.overlaps(&left), expected);
    }

    #[rstest]
    fn test_scenario(catalog: Catalog) {
        let parsed = parse_release("[SubsPlease] Example Anime - 05 (1080p) [ABCD1234].mkv").unwrap();
        let matched = catalog.find(&parsed).unwrap();
        assert_eq!(matched, MatchResult { show: "Example Anime", season: nz(1), relative_episode: 6 });

        let parsed = parse_release("[SubsPlease] Anime-Name II - 03 (1080p) [1234].mkv").unwrap();
        let matched = catalog.find(&parsed).unwrap();
        assert_eq!(matched, MatchResult { show: "Example Anime", season: nz(2), relative_episode: 4 });
    }

    #[rstest]
    #[case(0, None)]
    #[case(12, Some((1, 12)))]
    #[case(13, Some((2, 1)))]
    #[case(24, Some((2, 12)))]
    #[case(25, None)]
    fn test_range_boundaries(catalog: Catalog, #[case] episode: u32, #[case] expected: Option<(u32, u32)>) {
        let matched = catalog.find(&release("Other Anime", episode));
        assert_eq!(matched.map(|m| (m.season.get(), m.relative_episode)), expected);
    }

    #[test]
    fn test_relative_episode_that_does_not_fit_is_unmatched() {
        let catalog = Catalog::from_iter([(
            "Show".to_string(),
            Show { seasons: [(nz(1), season(0, u32::MAX, None))].into() },
        )]);
        let parsed = parse_release("[SubsPlease] Show - 4294967295 (1080p).mkv").unwrap();
        assert_eq!(parsed.episode, u32::MAX);
        assert!(catalog.find(&parsed).is_none());

        let matched = catalog.find(&release("Show", u32::MAX - 1)).unwrap();
        assert_eq!(matched.relative_episode, u32::MAX);
    }

    #[rstest]
    fn test_every_episode_in_range_matches(catalog: Catalog) {
        for episode in 0..=13 {
            let matched = catalog.find(&release("Example Anime", episode)).unwrap();
            assert_eq!(matched.season, nz(1));
            assert_eq!(matched.relative_episode, episode + 1);
        }
        assert!(catalog.find(&release("Example Anime", 14)).is_none());
    }

    #[rstest]
    fn test_alias_is_season_scoped(catalog: Catalog) {
        // The alias only ever resolves to its own season, never season 1.
        for episode in 0..=13 {
            let matched = catalog.find(&release("Anime-Name II", episode)).unwrap();
            assert_eq!(matched.season, nz(2));
        }
        assert!(catalog.find(&release("Anime-Name II", 14)).is_none());
    }

    #[rstest]
    fn test_unknown_show(catalog: Catalog) {
        assert!(catalog.find(&release("Unknown Anime", 1)).is_none());
        assert!(catalog.find(&release("example anime", 1)).is_none());
    }

    #[test]
    fn test_first_catalog_entry_wins() {
        let catalog = Catalog::from_iter([
            ("Show".to_string(), Show { seasons: [(nz(1), season(1, 12, None))].into() }),
            ("Sequel".to_string(), Show { seasons: [(nz(1), season(1, 12, Some("Show")))].into() }),
        ]);
        assert_eq!(catalog.find(&release("Show", 3)).unwrap().show, "Show");
        // Out of the first show's range, the alias on the second one takes over.
        let catalog = Catalog::from_iter([
            ("Show".to_string(), Show { seasons: [(nz(1), season(1, 12, None))].into() }),
            ("Sequel".to_string(), Show { seasons: [(nz(1), season(13, 24, Some("Show")))].into() }),
        ]);
        let matched = catalog.find(&release("Show", 14)).unwrap();
        assert_eq!((matched.show, matched.relative_episode), ("Sequel", 2));
    }

    #[test]
    fn test_overlapping_seasons() {
        let show = Show {
            seasons: [(nz(1), season(0, 13, None)), (nz(2), season(0, 13, Some("II"))), (nz(3), season(14, 26, None))]
                .into(),
        };
        assert_eq!(show.overlapping_seasons(), vec![(nz(1), nz(2))]);
    }

    #[rstest]
    fn test_lookup(catalog: Catalog) {
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("Other Anime").is_some());
        assert!(catalog.get("Anime-Name II").is_none());
        assert_eq!(catalog.iter().map(|(name, _)| name).collect::<Vec<_>>(), ["Example Anime", "Other Anime"]);
    }
}
