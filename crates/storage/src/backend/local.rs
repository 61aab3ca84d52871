//! A directory on disk. The library, the torrent queue, the backup archive
//! and the mounted seedbox all end up here.

use crate::backend::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Files under an absolute root directory, through `tokio::fs`.
///
/// # Examples
///
/// ```no_run
/// use seedsync_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = LocalBackend::new("library", "/srv/media/anime")?;
/// let seedbox = LocalBackend::new("remote", "/mnt/seedbox")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory for the backend
    root: PathBuf,
}
impl LocalBackend {
    /// Open `root`, creating it if it doesn't exist yet. Fails on a relative
    /// path, or on one that exists but isn't a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }

        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Inverse of `absolute_path`, for paths found while walking the root.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!(
                "attempting to get relative path of non-absolute path `{:?}`",
                absolute
            )))
        }
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_path(relative)
    }

    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(FileInfo::new(PathBuf::from(path), metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Pulled out of the stream loop below, where `?` isn't an option.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_path(&path)?;
        if metadata.is_dir() {
            // Only descend into directories that can still contain matches.
            return Ok(match prefix {
                Some(pfx) if !relative.starts_with(pfx) && !pfx.starts_with(&relative) => WalkEntry::Skip,
                _ => WalkEntry::Descend(path),
            });
        }
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(Self::metadata(&relative, metadata)?));
        }
        // Note: silently drop what is most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }
}

/// Free space of the disk whose mount point is the longest prefix of `path`.
fn volume_space(path: &Path) -> Option<u64> {
    let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };

        let start_dir = validated_prefix
            .as_ref()
            // Walk from the parent directory of the prefix path. Avoids
            // erroring on prefixes where the leaf component doesn't exist yet
            // or is a file. Path::starts_with is component-based, so
            // "files/hs/client" does not match "files/hs/client2/episode.mkv".
            .map(|prefix| self.root.join(prefix).parent().unwrap_or(&self.root).to_path_buf())
            .unwrap_or_else(|| self.root.clone());
        let mut stack = vec![start_dir];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // Asking for the contents of a directory that doesn't
                    // exist (yet) is an empty list, not an error.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let file = fs::File::create(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, to))?;
        }
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, from))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        Self::metadata(path, metadata)
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        // `create_dir_all` already tolerates a directory appearing underneath
        // it halfway through.
        Ok(fs::create_dir_all(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn available_space(&self) -> Result<u64> {
        let root = self.root.clone();
        // Refreshing the disk list hits the OS for every mount.
        tokio::task::spawn_blocking(move || volume_space(&root))
            .await
            .or_raise(|| ErrorKind::BackendError("disk query task failed".into()))?
            .ok_or_raise(|| ErrorKind::Unsupported("free space of an unknown volume"))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("library", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("library", "relative/path").is_err());
        assert!(LocalBackend::new("library", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("not/yet/there");
        LocalBackend::new("backup", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", temp_dir.path()).unwrap();
        let expected = temp_dir.path().join("Show/Season 01/Show - s01e01.mkv");
        assert_eq!(backend.absolute_path(Path::new("Show/Season 01/Show - s01e01.mkv")).unwrap(), expected);
        assert!(backend.absolute_path(Path::new("../etc/passwd")).is_err());
    }

    #[test]
    fn test_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", temp_dir.path()).unwrap();
        let abs = temp_dir.path().join("Show/episode.mkv");
        assert_eq!(backend.relative_path(&abs).unwrap(), Path::new("Show/episode.mkv"));
        assert!(backend.relative_path(PathBuf::from("/other/file.mkv")).is_err());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("torrents", temp_dir.path()).unwrap();
        backend.write(Path::new("meta-episode.torrent"), b"d8:announce").await.unwrap();
        assert_eq!(backend.read(Path::new("meta-episode.torrent")).await.unwrap(), b"d8:announce");
    }

    #[tokio::test]
    async fn test_streaming_reader_and_writer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", temp_dir.path()).unwrap();
        backend.write(Path::new("source.mkv"), b"0123456789").await.unwrap();
        let mut reader = backend.reader(Path::new("source.mkv")).await.unwrap();
        let mut writer = backend.writer(Path::new("nested/target.mkv")).await.unwrap();
        let copied = tokio::task::spawn_blocking(move || {
            let copied = std::io::copy(&mut reader, &mut writer).unwrap();
            writer.flush().unwrap();
            copied
        })
        .await
        .unwrap();
        assert_eq!(copied, 10);
        assert_eq!(backend.read(Path::new("nested/target.mkv")).await.unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_reader_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("remote", temp_dir.path()).unwrap();
        let err = backend.reader(Path::new("missing.mkv")).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_prefix() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("remote", temp_dir.path()).unwrap();
        backend.write(Path::new("files/hs/client/a.mkv"), b"a").await.unwrap();
        backend.write(Path::new("files/hs/client2/b.mkv"), b"b").await.unwrap();
        backend.write(Path::new("files/hs/clientfile.mkv"), b"c").await.unwrap();
        let mut files = backend.list(Some(Path::new("files/hs/client"))).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files.pop().unwrap().path, Path::new("files/hs/client/a.mkv"));
    }

    #[tokio::test]
    async fn test_list_nonexistent_prefix() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("remote", temp_dir.path()).unwrap();
        assert!(backend.list(Some(Path::new("files/hs/nobody"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_all_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("torrents", temp_dir.path()).unwrap();
        backend.write(Path::new("a.torrent"), b"data").await.unwrap();
        backend.write(Path::new("b.torrent"), b"data").await.unwrap();
        backend.write(Path::new("nested/c.torrent"), b"data").await.unwrap();
        assert_eq!(backend.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("remote", temp_dir.path()).unwrap();
        backend.write(Path::new("episode.mkv"), b"data").await.unwrap();
        backend.delete(Path::new("episode.mkv")).await.unwrap();
        assert!(!backend.exists(Path::new("episode.mkv")).await.unwrap());
        let err = backend.delete(Path::new("episode.mkv")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_creates_directories_and_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", temp_dir.path()).unwrap();
        backend.write(Path::new("Show/Season 01/e.mkv"), b"old").await.unwrap();
        backend.write(Path::new("e.mkv.part"), b"new").await.unwrap();
        backend.rename(Path::new("e.mkv.part"), Path::new("Show/Season 01/e.mkv")).await.unwrap();
        assert!(!backend.exists(Path::new("e.mkv.part")).await.unwrap());
        assert_eq!(backend.read(Path::new("Show/Season 01/e.mkv")).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_stat() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("remote", temp_dir.path()).unwrap();
        backend.write(Path::new("episode.mkv"), b"Hello, world!").await.unwrap();
        let info = backend.stat(Path::new("episode.mkv")).await.unwrap();
        assert_eq!(info.path, PathBuf::from("episode.mkv"));
        assert_eq!(info.size, 13);
    }

    #[tokio::test]
    async fn test_stat_directory_is_not_a_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("remote", temp_dir.path()).unwrap();
        backend.create_dir(Path::new("folder")).await.unwrap();
        assert!(backend.stat(Path::new("folder")).await.is_err());
    }

    #[tokio::test]
    async fn test_create_dir_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", temp_dir.path()).unwrap();
        backend.create_dir(Path::new("Show/Season 01")).await.unwrap();
        backend.create_dir(Path::new("Show/Season 01")).await.unwrap();
        assert!(temp_dir.path().join("Show/Season 01").is_dir());
    }

    #[tokio::test]
    async fn test_create_dir_over_file_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", temp_dir.path()).unwrap();
        backend.write(Path::new("Show"), b"not a directory").await.unwrap();
        assert!(backend.create_dir(Path::new("Show")).await.is_err());
    }

    #[tokio::test]
    async fn test_path_security() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", temp_dir.path()).unwrap();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../etc/passwd"), b"data").await.is_err());
        assert!(backend.create_dir(Path::new("../../escape")).await.is_err());
    }
}
