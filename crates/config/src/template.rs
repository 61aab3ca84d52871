use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::{ErrorKind, Result};

/// Starting point written by `seedsync init`.
pub const TEMPLATE: &str = r#"# seedsync configuration
#
# Every value can be overridden from the environment with a SEEDSYNC_ prefix,
# nested keys separated by a double underscore: SEEDSYNC_REMOTE__ROOT=/mnt/box

# Unique name of this client. Torrents are dropped into <blackhole>/<name>/
# on the seedbox and finished downloads are picked up from <completed>/<name>/.
name: unique-name

# Root of the media library episodes are filed into.
library_dir: /path/to/anime/library
# Uploaded torrent files are archived here, one directory per show.
backup_dir: /path/to/backup/dir
# Directory your RSS client drops .torrent files into.
torrent_dir: /path/to/torrents

# Maximum number of torrents uploaded per run; the rest wait for the next one.
rate_limit: 50
# Seconds between the two size checks that decide whether a file is finished.
stability_interval: 1
# Optional Discord-compatible webhook that receives every log line.
webhook_url: null
verbose: false

remote:
  # Where the seedbox file area is mounted (sshfs, rclone, NFS...).
  root: /mnt/seedbox
  blackhole: blackhole
  completed: files/hs

naming:
  directory: "{{ show }}/Season {{ season|pad }}"
  file: "{{ show }} - s{{ season|pad }}e{{ episode|pad }}.mkv"

# Shows to file away. Episode ranges are inclusive and use the numbering of
# the release group; an alias is the name one particular season is released
# under.
anime:
  Example Anime:
    seasons:
      "1":
        episodes: [0, 13]
      "2":
        episodes: [0, 13]
        alias: Anime-Name II
  Other Anime:
    seasons:
      "1":
        episodes: [0, 13]
      "2":
        episodes: [14, 26]
"#;

/// Write [`TEMPLATE`] to `path`, creating parent directories. Never
/// overwrites an existing file.
pub fn write_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ErrorKind::Io)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
        _ => ErrorKind::Io(e),
    })?;
    file.write_all(TEMPLATE.as_bytes()).map_err(ErrorKind::Io)?;
    tracing::info!(path = %path.display(), "Wrote configuration template");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seedsync/config.yaml");
        write_template(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TEMPLATE);

        std::fs::write(&path, "name: mine").unwrap();
        let err = write_template(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "name: mine");
    }
}
