//! The configuration file as written, before validation.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub(crate) const DEFAULT_RATE_LIMIT: usize = 50;
pub(crate) const DEFAULT_STABILITY_INTERVAL: u64 = 1;
pub(crate) const DEFAULT_BLACKHOLE: &str = "blackhole";
pub(crate) const DEFAULT_COMPLETED: &str = "files/hs";
pub(crate) const DEFAULT_DIRECTORY_TEMPLATE: &str = "{{ show }}/Season {{ season|pad }}";
pub(crate) const DEFAULT_FILE_TEMPLATE: &str = "{{ show }} - s{{ season|pad }}e{{ episode|pad }}.mkv";

#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    pub name: String,
    pub library_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub torrent_dir: PathBuf,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    /// Seconds.
    #[serde(default = "default_stability_interval")]
    pub stability_interval: u64,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub verbose: bool,
    pub remote: RawRemote,
    #[serde(default)]
    pub naming: RawNaming,
    pub anime: BTreeMap<String, RawShow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRemote {
    pub root: PathBuf,
    #[serde(default = "default_blackhole")]
    pub blackhole: PathBuf,
    #[serde(default = "default_completed")]
    pub completed: PathBuf,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawNaming {
    #[serde(default = "default_directory_template")]
    pub directory: String,
    #[serde(default = "default_file_template")]
    pub file: String,
}
impl Default for RawNaming {
    fn default() -> Self {
        Self {
            directory: default_directory_template(),
            file: default_file_template(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawShow {
    // Dictionary keys are always strings by the time figment is done with
    // them, even when the YAML says `1:`.
    pub seasons: BTreeMap<String, RawSeason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSeason {
    pub episodes: [u32; 2],
    #[serde(default)]
    pub alias: Option<String>,
}

fn default_rate_limit() -> usize {
    DEFAULT_RATE_LIMIT
}
fn default_stability_interval() -> u64 {
    DEFAULT_STABILITY_INTERVAL
}
fn default_blackhole() -> PathBuf {
    PathBuf::from(DEFAULT_BLACKHOLE)
}
fn default_completed() -> PathBuf {
    PathBuf::from(DEFAULT_COMPLETED)
}
fn default_directory_template() -> String {
    DEFAULT_DIRECTORY_TEMPLATE.to_string()
}
fn default_file_template() -> String {
    DEFAULT_FILE_TEMPLATE.to_string()
}
