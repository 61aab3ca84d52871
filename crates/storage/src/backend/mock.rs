//! In-memory storage backend for testing.

use super::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use time::UtcDateTime;

use crate::StorageBackend;

type Files = HashMap<PathBuf, (UtcDateTime, Vec<u8>)>;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. The lock is a
/// blocking one because writers handed out by
/// [`writer()`](StorageBackend::writer) commit from inside
/// [`spawn_blocking`](tokio::task::spawn_blocking).
///
/// # Examples
///
/// ```
/// use seedsync_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("files/hs/client/[SubsPlease] Show - 01 (1080p).mkv", b"episode"),
/// ]);
/// assert!(backend.exists(Path::new("files/hs/client/[SubsPlease] Show - 01 (1080p).mkv")).await?);
///
/// backend.write(Path::new("blackhole/client/show.torrent"), b"d8:announce").await?;
/// assert!(backend.exists(Path::new("blackhole/client/show.torrent")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: Arc<RwLock<Files>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
    available: u64,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    ///
    /// # Example
    ///
    /// ```
    /// use seedsync_storage::backend::MockBackend;
    ///
    /// let backend = MockBackend::with_files([
    ///     ("one.torrent", b"data file 1"),
    ///     ("dir/two.torrent", b"data file 2"),
    /// ]);
    /// ```
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = UtcDateTime::now();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: Arc::new(RwLock::new(map)),
            dirs: RwLock::new(BTreeSet::new()),
            available: u64::MAX,
        }
    }

    /// Change the name of the mock backend.
    ///
    /// # Example
    ///
    /// ```
    /// use seedsync_storage::backend::MockBackend;
    ///
    /// let backend = MockBackend::default().with_name("library");
    /// ```
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Report a fixed amount of free space. Unlimited unless set.
    pub fn with_available_space(mut self, bytes: u64) -> Self {
        self.available = bytes;
        self
    }

    /// Whether [`create_dir()`](StorageBackend::create_dir) was called for
    /// this path.
    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        validate_path(path.as_ref()).is_ok_and(|path| self.dirs().contains(&path))
    }

    fn files(&self) -> RwLockReadGuard<'_, Files> {
        self.storage.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn files_mut(&self) -> RwLockWriteGuard<'_, Files> {
        self.storage.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dirs(&self) -> RwLockReadGuard<'_, BTreeSet<PathBuf>> {
        self.dirs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn file_info(&self, path: &Path, size: u64, inserted: UtcDateTime) -> FileInfo {
        FileInfo::new(path, size, inserted)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

/// Buffers everything written and commits it to the map on `flush()`.
struct MockWriter {
    storage: Arc<RwLock<Files>>,
    path: PathBuf,
    buffer: Vec<u8>,
}
impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut guard = self.storage.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(self.path.clone(), (UtcDateTime::now(), self.buffer.clone()));
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<(PathBuf, (UtcDateTime, u64))> = {
                let guard = self.files();
                guard
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .map(|(path, (inserted, data))| (path.clone(), (*inserted, data.len() as u64)))
                    .collect()
            };
            for (path, (inserted, size)) in entries {
                yield Ok(self.file_info(&path, size, inserted));
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files().contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let (_inserted, data) =
            self.files().get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let data = self.read(path).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.files_mut().insert(path, (UtcDateTime::now(), data.to_vec()));
        Ok(())
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let path = validate_path(path)?;
        Ok(Box::new(MockWriter {
            storage: Arc::clone(&self.storage),
            path,
            buffer: Vec::new(),
        }))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.files_mut().remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        let mut guard = self.files_mut();
        let data = guard.remove(&from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from)))?;
        guard.insert(to, data);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let guard = self.files();
        let (inserted, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(self.file_info(&path, data.len() as u64, *inserted))
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        if self.files().contains_key(&path) {
            exn::bail!(ErrorKind::AlreadyExists(path));
        }
        self.dirs.write().unwrap_or_else(|poisoned| poisoned.into_inner()).insert(path);
        Ok(())
    }

    async fn available_space(&self) -> Result<u64> {
        Ok(self.available)
    }
}
