use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::identify::{SkipReason, identify};
use crate::resolver::ResolvedDestination;
use crate::sync::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use crate::sync::event::{Direction, Outcome, SyncEvent};
use crate::sync::{count, in_path_order};
use crate::{Backends, Context, has_space, stabilize};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use seedsync_release::error::ErrorKind as ReleaseErrorKind;
use seedsync_storage::file::Settled;
use seedsync_storage::{BackendHandle, FileInfo};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Streams [`SyncEvent`]s while pulling finished episodes from the seedbox
/// into the library.
///
/// Candidates are the direct children of `<completed>/<name>` on the remote.
/// Each one must hold still for `ctx.stability_interval`, identify against
/// the catalog and fit on the library volume before it is copied. The copy
/// lands next to its destination as `<filename>.part` and is renamed into
/// place once complete; only then is the remote copy deleted.
pub fn download<'a>(backends: &'a Backends, ctx: &'a Context) -> impl Stream<Item = LibraryResult<SyncEvent>> + 'a {
    stream!({
        yield Ok(SyncEvent::Started(Direction::Download));

        let directory = ctx.completed_dir();
        let files = match backends.remote.list(Some(&directory)).await {
            Ok(files) => in_path_order(files.into_iter().filter(|f| f.path.parent() == Some(&*directory)).collect()),
            Err(e) => {
                yield Err(e.raise(LibraryErrorKind::Discovery(backends.remote.name().to_string())));
                return;
            },
        };
        yield Ok(SyncEvent::DiscoveryComplete(count(&files)));

        for file in files {
            let path = file.path.clone();
            yield download_file(backends, ctx, file)
                .await
                .map(SyncEvent::Processed)
                .map_err(|e| LibraryErrorKind::sync(path, e));
        }

        yield Ok(SyncEvent::Complete(Direction::Download));
    })
}

async fn download_file(backends: &Backends, ctx: &Context, file: FileInfo) -> SyncResult<Outcome> {
    let Some(file) = stabilize(&backends.remote, &file.path, ctx.stability_interval)
        .await
        .or_raise(|| SyncErrorKind::Guard)?
    else {
        return Ok(Outcome::skipped(file.into_meta().path, SkipReason::InProgress));
    };
    let Some(filename) = file.file_name() else {
        let reason = SkipReason::Unparseable(ReleaseErrorKind::Malformed(file.path.display().to_string()));
        return Ok(Outcome::skipped(file.into_meta().path, reason));
    };
    let matched = match identify(&ctx.catalog, filename) {
        Ok(matched) => matched,
        Err(reason) => return Ok(Outcome::skipped(file.into_meta().path, reason)),
    };
    let destination = ctx.resolver.resolve(&backends.library, &matched).await.or_raise(|| SyncErrorKind::Resolve)?;

    let space = has_space(&file, &backends.library).await.or_raise(|| SyncErrorKind::Guard)?;
    if !space.sufficient() {
        let reason = SkipReason::InsufficientSpace {
            required: space.required,
            available: space.available,
        };
        return Ok(Outcome::skipped(file.into_meta().path, reason));
    }

    if ctx.dry_run {
        tracing::info!(remote = %file.path.display(), destination = %destination.path().display(), "Dry run, not transferring");
    } else {
        transfer(&backends.remote, &backends.library, &file, &destination).await?;
        backends.remote.delete(&file.path).await.or_raise(|| SyncErrorKind::Storage)?;
    }

    Ok(Outcome::Downloaded {
        bytes: file.size,
        remote: file.into_meta().path,
        destination: destination.path(),
    })
}

/// Copy a settled remote file to its destination through a `.part` file,
/// removing the partial copy if anything goes wrong.
async fn transfer(
    remote: &BackendHandle,
    library: &BackendHandle,
    file: &FileInfo<Settled>,
    destination: &ResolvedDestination,
) -> SyncResult<u64> {
    let part = part_path(destination);
    let result = copy_verified(remote, library, file, &part, &destination.path()).await;
    if result.is_err() {
        // Nothing useful can be done if the cleanup fails too; the next
        // successful transfer overwrites it.
        if let Err(e) = library.delete(&part).await {
            tracing::debug!(part = %part.display(), error = ?e, "Could not remove partial download");
        }
    }
    result
}

async fn copy_verified(
    remote: &BackendHandle,
    library: &BackendHandle,
    file: &FileInfo<Settled>,
    part: &Path,
    target: &Path,
) -> SyncResult<u64> {
    let mut reader = remote.reader(&file.path).await.or_raise(|| SyncErrorKind::Storage)?;
    let mut writer = library.writer(part).await.or_raise(|| SyncErrorKind::Storage)?;
    let copied = tokio::task::spawn_blocking(move || -> io::Result<u64> {
        let copied = io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(copied)
    })
    .await
    .or_raise(|| SyncErrorKind::Transfer)?
    .or_raise(|| SyncErrorKind::Transfer)?;
    if copied != file.size {
        exn::bail!(SyncErrorKind::Truncated { expected: file.size, copied });
    }
    library.rename(part, target).await.or_raise(|| SyncErrorKind::Storage)?;
    Ok(copied)
}

fn part_path(destination: &ResolvedDestination) -> PathBuf {
    destination.directory.join(format!("{}.part", destination.filename))
}
