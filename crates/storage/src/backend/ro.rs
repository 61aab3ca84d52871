//! Dry-run decorator: every mutation is logged and reported as a success
//! without touching the wrapped backend.

use async_trait::async_trait;
use std::path::Path;

use crate::backend::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::{BackendHandle, StorageBackend, error::Result, file::FileInfo};

/// Passes reads, listings and queries through to `inner`; writes, deletes,
/// renames and directory creation only produce an `info` event.
///
/// Callers see the same results they would on a real run, minus the side
/// effects: a `writer()` accepts and discards everything.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        self.inner.reader(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), bytes = data.len(), "Dry run: not writing");
        Ok(())
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        tracing::info!(backend = self.name(), path = %path.display(), "Dry run: discarding streamed write");
        Ok(Box::new(std::io::sink()))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), "Dry run: not deleting");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(
            backend = self.name(),
            from = %from.display(),
            to = %to.display(),
            "Dry run: not moving"
        );
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path).await
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), "Dry run: not creating directory");
        Ok(())
    }

    async fn available_space(&self) -> Result<u64> {
        self.inner.available_space().await
    }
}
