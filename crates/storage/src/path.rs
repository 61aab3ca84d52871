//! Path validation.
//!
//! Every path handed to a backend is relative to that backend's root. Release
//! names come from strangers on the internet, so nothing gets near the
//! filesystem until it has been through [`validate`].

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalize a path relative to a backend root, refusing anything that would
/// leave it.
///
/// `.` and repeated or trailing separators disappear, `..` climbs back out of
/// a directory entered earlier in the same path. A leading `/` is ignored
/// rather than treated as absolute. NUL bytes, Windows prefixes and paths
/// that normalize to nothing are [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use seedsync_storage::validate_path;
///
/// assert!(validate_path("Example Anime/Season 01/Example Anime - s01e06.mkv").is_ok());
/// assert!(validate_path("blackhole/client/meta-episode.torrent").is_ok());
/// assert!(validate_path("Season 01/../Season 02").is_ok());
///
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("Season 01/../../..").is_err());
/// assert!(validate_path("a\0b").is_err());
///
/// assert_eq!(
///     validate_path("files/../files/./hs//client/episode.mkv/").unwrap(),
///     Path::new("files/hs/client/episode.mkv")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf()));
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            // Unix lets NUL through components(); the syscall would truncate.
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir | Component::RootDir => {},
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(invalid());
                }
            },
            Component::Prefix(_) => return Err(invalid()),
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(invalid());
    }
    Ok(normalized)
}
