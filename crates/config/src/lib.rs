//! Configuration loading and validation.
//!
//! A single file (YAML, TOML or JSON, picked by extension) merged with
//! `SEEDSYNC_`-prefixed environment variables, then validated into a
//! [`Config`] whose [`Catalog`] can be trusted by everything downstream.

pub mod error;
mod raw;
mod template;

use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use seedsync_release::{Catalog, EpisodeRange, Season, Show};
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorKind, Result};
use crate::raw::{RawConfig, RawShow};
pub use crate::template::{TEMPLATE, write_template};

/// Locations tried, in order, before the user configuration directory.
const SYSTEM_PATHS: [&str; 4] =
    ["/config/seedsync.yaml", "/config/seedsync.yml", "/etc/seedsync/config.yaml", "/etc/seedsync/config.yml"];
const USER_FILES: [&str; 3] = ["config.yaml", "config.yml", "config.toml"];
const ENV_PREFIX: &str = "SEEDSYNC_";

/// Where the seedbox file area lives, and the two directories used on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Mount point of the remote file area.
    pub root: PathBuf,
    /// Watched directory, relative to `root`.
    pub blackhole: PathBuf,
    /// Finished downloads, relative to `root`.
    pub completed: PathBuf,
}

/// Library layout templates, compiled later by the path resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub directory: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Per-client directory name on the seedbox.
    pub name: String,
    pub library_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub torrent_dir: PathBuf,
    /// Maximum uploads per pass. Zero defers everything.
    pub rate_limit: usize,
    pub stability_interval: Duration,
    pub webhook_url: Option<String>,
    pub verbose: bool,
    pub remote: Remote,
    pub naming: Naming,
    pub catalog: Catalog,
}

impl Config {
    /// Load from an explicit path, or from the first file found in
    /// [`search_paths()`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => exn::bail!(ErrorKind::NotFound(vec![path.to_path_buf()])),
            None => {
                let candidates = search_paths();
                match candidates.iter().find(|path| path.is_file()) {
                    Some(path) => path.clone(),
                    None => exn::bail!(ErrorKind::NotFound(candidates)),
                }
            },
        };
        tracing::debug!(path = %path.display(), "Loading configuration");
        Self::from_figment(figment_for(&path))
    }

    /// Extract and validate from an already assembled [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let raw: RawConfig = figment.extract().or_raise(|| ErrorKind::Parse)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self> {
        let name = raw.name.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            exn::bail!(ErrorKind::InvalidName(raw.name));
        }
        Ok(Self {
            name: name.to_string(),
            library_dir: raw.library_dir,
            backup_dir: raw.backup_dir,
            torrent_dir: raw.torrent_dir,
            rate_limit: raw.rate_limit,
            stability_interval: Duration::from_secs(raw.stability_interval),
            webhook_url: raw.webhook_url.filter(|url| !url.trim().is_empty()),
            verbose: raw.verbose,
            remote: Remote {
                root: raw.remote.root,
                blackhole: raw.remote.blackhole,
                completed: raw.remote.completed,
            },
            naming: Naming {
                directory: raw.naming.directory,
                file: raw.naming.file,
            },
            catalog: catalog(raw.anime)?,
        })
    }
}

/// Every location [`Config::load`] looks at, in order.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = SYSTEM_PATHS.iter().map(PathBuf::from).collect();
    if let Some(dir) = user_config_dir() {
        paths.extend(USER_FILES.iter().map(|file| dir.join(file)));
    }
    paths
}

/// Where `seedsync init` writes the template.
pub fn default_path() -> Result<PathBuf> {
    Ok(user_config_dir().ok_or_raise(|| ErrorKind::NoConfigDir)?.join(USER_FILES[0]))
}

fn user_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "seedsync").map(|dirs| dirs.config_dir().to_path_buf())
}

fn figment_for(path: &Path) -> Figment {
    let file = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Figment::from(Toml::file(path)),
        Some("json") => Figment::from(Json::file(path)),
        _ => Figment::from(Yaml::file(path)),
    };
    file.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

fn catalog(raw: BTreeMap<String, RawShow>) -> Result<Catalog> {
    let names: HashSet<String> = raw.keys().cloned().collect();
    let mut aliases = HashSet::new();
    let mut shows = Vec::with_capacity(raw.len());
    for (name, raw_show) in raw {
        if name.trim().is_empty() {
            exn::bail!(ErrorKind::EmptyName(name));
        }
        let mut show = Show::default();
        for (key, raw_season) in raw_show.seasons {
            let number = key
                .trim()
                .parse::<NonZeroU32>()
                .or_raise(|| ErrorKind::InvalidSeason { show: name.clone(), season: key.clone() })?;
            let [first, last] = raw_season.episodes;
            let episodes = EpisodeRange::new(first, last).ok_or_raise(|| ErrorKind::InvertedRange {
                show: name.clone(),
                season: number.get(),
                first,
                last,
            })?;
            let alias = match raw_season.alias {
                Some(alias) if alias.trim().is_empty() => exn::bail!(ErrorKind::EmptyName(name)),
                Some(alias) => {
                    // Shows are held in name order, so a release name must
                    // never be claimed by two of them.
                    if alias != name && names.contains(&alias) {
                        exn::bail!(ErrorKind::AliasShadowsShow { alias, show: name });
                    }
                    if !aliases.insert(alias.clone()) {
                        exn::bail!(ErrorKind::DuplicateAlias(alias));
                    }
                    Some(alias)
                },
                None => None,
            };
            // "1" and "01" are the same season.
            if show.seasons.insert(number, Season { episodes, alias }).is_some() {
                exn::bail!(ErrorKind::InvalidSeason { show: name, season: key });
            }
        }
        for (a, b) in show.overlapping_seasons() {
            tracing::warn!(show = %name, first = a.get(), second = b.get(), "Seasons have overlapping episode ranges, the earlier one wins unless an alias tells them apart");
        }
        shows.push((name, show));
    }
    Ok(Catalog::from_iter(shows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    const MINIMAL: &str = r#"
name: client
library_dir: /srv/library
backup_dir: /srv/backup
torrent_dir: /srv/torrents
remote:
  root: /mnt/seedbox
anime:
  Example Anime:
    seasons:
      "1": { episodes: [0, 13] }
      "2": { episodes: [0, 13], alias: "Anime-Name II" }
"#;

    fn from_yaml(yaml: &str) -> Result<Config> {
        Config::from_figment(Figment::from(Yaml::string(yaml)))
    }

    fn with_anime(anime: &str) -> String {
        let head = MINIMAL.split("anime:").next().unwrap();
        format!("{head}anime:\n{anime}")
    }

    #[test]
    fn test_defaults() {
        let config = from_yaml(MINIMAL).unwrap();
        assert_eq!(config.name, "client");
        assert_eq!(config.rate_limit, 50);
        assert_eq!(config.stability_interval, Duration::from_secs(1));
        assert_eq!(config.webhook_url, None);
        assert!(!config.verbose);
        assert_eq!(config.remote.blackhole, Path::new("blackhole"));
        assert_eq!(config.remote.completed, Path::new("files/hs"));
        assert_eq!(config.naming.directory, raw::DEFAULT_DIRECTORY_TEMPLATE);
        assert_eq!(config.naming.file, raw::DEFAULT_FILE_TEMPLATE);
    }

    #[test]
    fn test_catalog_is_typed() {
        let config = from_yaml(MINIMAL).unwrap();
        let show = config.catalog.get("Example Anime").unwrap();
        let second = &show.seasons[&NonZeroU32::new(2).unwrap()];
        assert_eq!(second.episodes, EpisodeRange::new(0, 13).unwrap());
        assert_eq!(second.alias.as_deref(), Some("Anime-Name II"));
    }

    #[test]
    fn test_seasons_are_numerically_ordered() {
        let yaml = with_anime("  Long Show:\n    seasons:\n      \"10\": { episodes: [91, 100] }\n      \"2\": { episodes: [11, 20] }\n      \"1\": { episodes: [1, 10] }\n");
        let config = from_yaml(&yaml).unwrap();
        let seasons: Vec<u32> = config.catalog.get("Long Show").unwrap().seasons.keys().map(|n| n.get()).collect();
        assert_eq!(seasons, [1, 2, 10]);
    }

    #[rstest]
    #[case::missing_field("name: client\n")]
    #[case::negative_episode("name: client\nlibrary_dir: /a\nbackup_dir: /b\ntorrent_dir: /c\nremote: { root: /d }\nanime:\n  Show:\n    seasons:\n      \"1\": { episodes: [-1, 2] }\n")]
    fn test_parse_errors(#[case] yaml: &str) {
        let err = from_yaml(yaml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse));
    }

    #[rstest]
    #[case::zero("  Show:\n    seasons:\n      \"0\": { episodes: [1, 2] }\n")]
    #[case::negative("  Show:\n    seasons:\n      \"-1\": { episodes: [1, 2] }\n")]
    #[case::word("  Show:\n    seasons:\n      first: { episodes: [1, 2] }\n")]
    #[case::duplicate("  Show:\n    seasons:\n      \"1\": { episodes: [1, 2] }\n      \"01\": { episodes: [3, 4] }\n")]
    fn test_invalid_season(#[case] anime: &str) {
        let err = from_yaml(&with_anime(anime)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidSeason { .. }), "{:?}", &*err);
    }

    #[test]
    fn test_inverted_range() {
        let err = from_yaml(&with_anime("  Show:\n    seasons:\n      \"1\": { episodes: [13, 0] }\n")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvertedRange { season: 1, first: 13, last: 0, .. }));
    }

    #[rstest]
    #[case::show_name("  \" \":\n    seasons:\n      \"1\": { episodes: [1, 2] }\n")]
    #[case::alias("  Show:\n    seasons:\n      \"1\": { episodes: [1, 2], alias: \"  \" }\n")]
    fn test_empty_names(#[case] anime: &str) {
        let err = from_yaml(&with_anime(anime)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptyName(_)));
    }

    #[test]
    fn test_duplicate_alias() {
        let anime = "  One:\n    seasons:\n      \"2\": { episodes: [1, 2], alias: Sequel }\n  Two:\n    seasons:\n      \"2\": { episodes: [1, 2], alias: Sequel }\n";
        let err = from_yaml(&with_anime(anime)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicateAlias(alias) if alias == "Sequel"));
    }

    #[rstest]
    #[case::listed_first("  Zeta:\n    seasons:\n      \"1\": { episodes: [1, 12] }\n  Alpha:\n    seasons:\n      \"1\": { episodes: [1, 12], alias: Zeta }\n")]
    #[case::listed_last("  Alpha:\n    seasons:\n      \"1\": { episodes: [1, 12], alias: Zeta }\n  Zeta:\n    seasons:\n      \"1\": { episodes: [13, 24] }\n")]
    fn test_alias_naming_another_show(#[case] anime: &str) {
        let err = from_yaml(&with_anime(anime)).unwrap_err();
        assert!(
            matches!(&*err, ErrorKind::AliasShadowsShow { alias, show } if alias == "Zeta" && show == "Alpha"),
            "{:?}",
            &*err
        );
    }

    #[test]
    fn test_alias_may_repeat_its_own_show_name() {
        let anime = "  Zeta:\n    seasons:\n      \"1\": { episodes: [1, 12] }\n      \"2\": { episodes: [1, 12], alias: Zeta }\n";
        let config = from_yaml(&with_anime(anime)).unwrap();
        assert_eq!(config.catalog.get("Zeta").unwrap().seasons.len(), 2);
    }

    #[rstest]
    #[case("")]
    #[case("a/b")]
    #[case("..")]
    fn test_invalid_client_name(#[case] name: &str) {
        let yaml = MINIMAL.replace("name: client", &format!("name: \"{name}\""));
        let err = from_yaml(&yaml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
    }

    #[test]
    fn test_zero_rate_limit_is_allowed() {
        let config = from_yaml(&format!("rate_limit: 0\n{MINIMAL}")).unwrap();
        assert_eq!(config.rate_limit, 0);
    }

    #[test]
    fn test_blank_webhook_is_none() {
        let config = from_yaml(&format!("webhook_url: \"\"\n{MINIMAL}")).unwrap();
        assert_eq!(config.webhook_url, None);
    }

    #[test]
    fn test_template_is_a_valid_config() {
        let config = from_yaml(TEMPLATE).unwrap();
        assert_eq!(config.catalog.len(), 2);
        assert_eq!(config.rate_limit, 50);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(paths) if paths == &[path.clone()]));
    }

    #[test]
    fn test_load_toml_by_extension() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
name = "client"
library_dir = "/srv/library"
backup_dir = "/srv/backup"
torrent_dir = "/srv/torrents"
rate_limit = 5

[remote]
root = "/mnt/seedbox"

[anime."Example Anime".seasons.1]
episodes = [0, 13]
"#,
            )?;
            let config = Config::load(Some(Path::new("config.toml"))).map_err(|e| format!("{}", &*e))?;
            assert_eq!(config.rate_limit, 5);
            assert!(config.catalog.get("Example Anime").is_some());
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", MINIMAL)?;
            jail.set_env("SEEDSYNC_RATE_LIMIT", "7");
            jail.set_env("SEEDSYNC_REMOTE__ROOT", "/mnt/elsewhere");
            let config = Config::load(Some(Path::new("config.yaml"))).map_err(|e| format!("{}", &*e))?;
            assert_eq!(config.rate_limit, 7);
            assert_eq!(config.remote.root, Path::new("/mnt/elsewhere"));
            Ok(())
        });
    }

    #[test]
    fn test_search_paths_start_with_system_locations() {
        let paths = search_paths();
        assert_eq!(paths[0], Path::new("/config/seedsync.yaml"));
        assert_eq!(paths[3], Path::new("/etc/seedsync/config.yml"));
    }
}
