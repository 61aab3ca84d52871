//! Path templating for the media library.
//!
//! Converts a [`MatchResult`] into a deterministic library location using two
//! user-configured [upon] templates, one for the directory and one for the
//! filename. The template syntax follows upon's Mustache-like conventions
//! (`{{ variable }}`, `{{ value|formatter }}`), extended with one formatter:
//!
//! - **`pad`**: zero-pads integers to at least two digits (`6` becomes `06`,
//!   `120` stays `120`).
//!
//! # Template Variables
//!
//! | Variable  | Type     | Description                                    |
//! |-----------|----------|------------------------------------------------|
//! | `show`    | `String` | Canonical show name from the catalog           |
//! | `season`  | `u32`    | Season number                                  |
//! | `episode` | `u32`    | Episode number within the season, from 1       |
//!
//! # Example
//!
//! ```
//! use seedsync_library::{DEFAULT_DIRECTORY_TEMPLATE, DEFAULT_FILE_TEMPLATE, PathResolver};
//! use seedsync_release::MatchResult;
//! use std::num::NonZeroU32;
//!
//! let resolver = PathResolver::new(DEFAULT_DIRECTORY_TEMPLATE, DEFAULT_FILE_TEMPLATE).unwrap();
//! let matched = MatchResult { show: "Example Anime", season: NonZeroU32::new(1).unwrap(), relative_episode: 6 };
//! let destination = resolver.destination(&matched).unwrap();
//! assert_eq!(destination.path().to_str(), Some("Example Anime/Season 01/Example Anime - s01e06.mkv"));
//! ```

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use seedsync_release::MatchResult;
use seedsync_storage::{BackendHandle, validate_path};
use std::path::{Path, PathBuf};
use tracing::instrument;
use upon::{Engine, Template};

pub const DEFAULT_DIRECTORY_TEMPLATE: &str = "{{ show }}/Season {{ season|pad }}";
pub const DEFAULT_FILE_TEMPLATE: &str = "{{ show }} - s{{ season|pad }}e{{ episode|pad }}.mkv";

/// Where an episode goes, relative to the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    pub directory: PathBuf,
    pub filename: String,
}
impl ResolvedDestination {
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Renders library locations from a pair of compiled templates.
///
/// Both templates are compiled eagerly so that syntax errors surface when
/// the run starts rather than halfway through a pass. Rendered directories
/// are normalized and validated by [`seedsync_storage::validate_path`]; the
/// rendered filename must be a single path component.
pub struct PathResolver {
    engine: Engine<'static>,
    directory: Template<'static>,
    file: Template<'static>,
}
impl PathResolver {
    /// Compile the directory and file templates. Returns
    /// [`ErrorKind::Template`] if either has a syntax error.
    pub fn new(directory: impl Into<String>, file: impl Into<String>) -> Result<Self> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let directory = engine.compile(directory.into()).or_raise(|| ErrorKind::Template)?;
        let file = engine.compile(file.into()).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, directory, file })
    }

    /// Render the destination of a matched episode. Pure: nothing touches
    /// the filesystem.
    #[instrument(level = "debug", skip_all, fields(show = matched.show, season = matched.season.get(), episode = matched.relative_episode))]
    pub fn destination(&self, matched: &MatchResult<'_>) -> Result<ResolvedDestination> {
        let directory = self.render(&self.directory, matched)?;
        let directory = normalize(&directory)?;
        let filename = self.render(&self.file, matched)?;
        let filename = filename.trim();
        let file_path = validate_path(filename).or_raise(|| ErrorKind::Template)?;
        if file_path.components().count() != 1 || file_path != Path::new(filename) {
            exn::bail!(ErrorKind::Template);
        }
        Ok(ResolvedDestination {
            directory,
            filename: filename.to_string(),
        })
    }

    /// Render the destination and make sure its directory exists in the
    /// library. Creating a directory that is already there is not an error.
    pub async fn resolve(&self, library: &BackendHandle, matched: &MatchResult<'_>) -> Result<ResolvedDestination> {
        let destination = self.destination(matched)?;
        library.create_dir(&destination.directory).await.or_raise(|| ErrorKind::Storage)?;
        Ok(destination)
    }

    fn render(&self, template: &Template<'static>, matched: &MatchResult<'_>) -> Result<String> {
        template.render(&self.engine, Self::parameters(matched)).to_string().or_raise(|| ErrorKind::Template)
    }

    /// Builds the [`upon::Value`] map exposed to the templates.
    fn parameters(matched: &MatchResult<'_>) -> upon::Value {
        upon::value! {
            show: matched.show,
            season: i64::from(matched.season.get()),
            episode: i64::from(matched.relative_episode),
        }
    }
}

/// Trims each path segment, joins them with `/`, then validates via
/// [`seedsync_storage::validate_path`].
fn normalize(s: &str) -> Result<PathBuf> {
    let path = s.trim().split('/').map(str::trim).collect::<Vec<_>>().join("/");
    let validated = validate_path(&path).or_raise(|| ErrorKind::Template)?;
    // Show names come from the catalog, but "Show/.." would still quietly
    // land somewhere else.
    validated.to_str().filter(|p| *p == path).ok_or_raise(|| ErrorKind::Template)?;
    Ok(validated)
}

/// Custom [`upon`] extensions for library paths.
mod addons {
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Zero-pads integers to a width of two; wider numbers are never cut.
    fn pad_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::Integer(n) => write!(f, "{n:02}")?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Registers the `pad` formatter on the given engine.
    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("pad", pad_formatter);
    }
}
