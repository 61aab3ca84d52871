//! Where files live.
//!
//! [`StorageBackend`] is implemented once for a real directory
//! ([`LocalBackend`]), once as a dry-run decorator ([`ReadOnlyBackend`]) and
//! once in memory for tests.
//!
//! The seedbox is reached through a mount (sshfs, rclone, NFS...) and is
//! therefore just another [`LocalBackend`] as far as this crate is concerned.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::{Read, Write};
use std::path::Path;
use std::pin::Pin;

type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
type BoxSyncRead = Box<dyn Read + Send + 'static>;
type BoxSyncWrite = Box<dyn Write + Send + 'static>;

/// One root directory's worth of files: the seedbox mount, the library, the
/// torrent queue or the backup archive.
///
/// Every path is relative to the backend root and goes through
/// [`validate_path`](crate::validate_path) before it touches anything, so a
/// release name can never point outside the root.
///
/// ```
/// use seedsync_storage::{backend::StorageBackend, error::Result};
///
/// async fn queued_torrents(backend: &dyn StorageBackend) -> Result<usize> {
///     let files = backend.list(None).await?;
///     Ok(files.iter().filter(|f| f.path.extension().is_some_and(|e| e == "torrent")).count())
/// }
/// ```
///
/// # Streaming
/// Episodes run to gigabytes. Copy them through [`reader`](Self::reader) and
/// [`writer`](Self::writer) on a blocking thread rather than via
/// [`read`](Self::read):
///
/// ```no_run
/// use std::path::Path;
/// use seedsync_storage::backend::StorageBackend;
/// use seedsync_storage::error::{ErrorKind, Result};
///
/// async fn copy_between(
///     source: &dyn StorageBackend,
///     target: &dyn StorageBackend,
///     path: &Path,
/// ) -> Result<u64> {
///     let mut reader = source.reader(path).await?;
///     let mut writer = target.writer(path).await?;
///     let copied = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
///         let copied = std::io::copy(&mut reader, &mut writer)?;
///         std::io::Write::flush(&mut writer)?;
///         Ok(copied)
///     }).await;
///     Ok(copied.unwrap().map_err(ErrorKind::Io)?)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// `remote`, `library`, `torrents` or `backup`. Only used in logs and
    /// error messages.
    fn name(&self) -> &str;

    /// Every file under `prefix` (or the whole root), collected from
    /// [`list_stream()`](Self::list_stream).
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Files under `prefix`, as they are found.
    ///
    /// The prefix matches whole components: `files/hs` does not match
    /// `files/hsx`. A prefix that doesn't exist is an empty listing. Order is
    /// whatever the backend finds convenient; sort if it matters.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use seedsync_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("files/hs/client")));
    /// while let Some(file) = stream.try_next().await? {
    ///     println!("{} ({} bytes)", file.path.display(), file.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Whole file into memory. Fine for torrent descriptors, not for
    /// episodes. [`NotFound`](crate::error::ErrorKind::NotFound) if missing.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Blocking reader for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking); the file is already
    /// open when this returns. [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if missing.
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Create or replace a file, creating missing parent directories.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Blocking writer counterpart of [`reader`](Self::reader), creating
    /// missing parent directories.
    ///
    /// Call `flush()` before dropping it: some backends only commit on
    /// flush, and dropping swallows errors.
    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite>;

    /// [`NotFound`](crate::error::ErrorKind::NotFound) if missing.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Move within this backend, replacing whatever is at `to` and creating
    /// its parent directories. [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if `from` is missing.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Size and modification time, without opening the file.
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if missing.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;

    /// Create a directory (and its parents) if it does not exist yet.
    ///
    /// Idempotent: an existing directory, including one created concurrently
    /// by another process, is not an error.
    async fn create_dir(&self, path: &Path) -> Result<()>;

    /// Free bytes on the volume holding this backend's root.
    ///
    /// Returns [`Unsupported`](crate::error::ErrorKind::Unsupported) when the
    /// backend has no way of knowing.
    async fn available_space(&self) -> Result<u64>;
}
