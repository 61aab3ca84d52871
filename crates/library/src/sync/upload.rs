use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::identify::{SkipReason, identify};
use crate::sync::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use crate::sync::event::{Direction, Outcome, SyncEvent};
use crate::sync::{count, in_path_order};
use crate::{Backends, Context, rate_limit};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use seedsync_release::error::ErrorKind as ReleaseErrorKind;
use seedsync_storage::FileInfo;
use std::path::Path;

const TORRENT_EXTENSION: &str = ".torrent";
/// Added by some indexers to torrents fetched through their API.
const META_PREFIX: &str = "meta-";

/// Streams [`SyncEvent`]s while moving queued `.torrent` files to the
/// seedbox blackhole.
///
/// Only top-level `.torrent` files of the queue are candidates. At most
/// `ctx.rate_limit` of them are handled per pass; the rest are reported as
/// skipped and stay queued. Each handled torrent is written to
/// `<blackhole>/<name>/` on the remote, archived under `<show>/` in the
/// backup and then removed from the queue.
pub fn upload<'a>(backends: &'a Backends, ctx: &'a Context) -> impl Stream<Item = LibraryResult<SyncEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(SyncEvent::Started(Direction::Upload));

        let files = match backends.torrents.list(None).await {
            Ok(files) => in_path_order(files.into_iter().filter(is_queued_torrent).collect()),
            Err(e) => {
                yield Err(e.raise(LibraryErrorKind::Discovery(backends.torrents.name().to_string())));
                return;
            },
        };
        yield Ok(SyncEvent::DiscoveryComplete(count(&files)));

        let limited = rate_limit(files, ctx.rate_limit);
        if !limited.deferred.is_empty() {
            tracing::info!(limit = ctx.rate_limit, deferred = limited.deferred.len(), "Upload rate limit reached");
            yield Ok(SyncEvent::RateLimited {
                admitted: limited.admitted.len(),
                deferred: limited.deferred.len(),
            });
            for file in limited.deferred {
                yield Ok(SyncEvent::Processed(Outcome::skipped(file.into_meta().path, SkipReason::RateLimited)));
            }
        }

        for file in limited.admitted {
            let path = file.path.clone();
            yield upload_file(backends, ctx, file)
                .await
                .map(SyncEvent::Processed)
                .map_err(|e| LibraryErrorKind::sync(path, e));
        }

        yield Ok(SyncEvent::Complete(Direction::Upload));
    })
}

async fn upload_file(backends: &Backends, ctx: &Context, file: FileInfo) -> SyncResult<Outcome> {
    let Some(filename) = file.file_name() else {
        let reason = SkipReason::Unparseable(ReleaseErrorKind::Malformed(file.path.display().to_string()));
        return Ok(Outcome::skipped(file.into_meta().path, reason));
    };
    let matched = match identify(&ctx.catalog, release_name(filename)) {
        Ok(matched) => matched,
        Err(reason) => return Ok(Outcome::skipped(file.into_meta().path, reason)),
    };

    let data = backends.torrents.read(&file.path).await.or_raise(|| SyncErrorKind::Storage)?;
    let remote = ctx.blackhole_dir().join(filename);
    backends.remote.write(&remote, &data).await.or_raise(|| SyncErrorKind::Storage)?;
    // Once the blackhole has it, losing the queued copy is the worst case:
    // archive first so it survives a failed delete.
    let archived = Path::new(matched.show).join(filename);
    backends.backup.write(&archived, &data).await.or_raise(|| SyncErrorKind::Storage)?;
    backends.torrents.delete(&file.path).await.or_raise(|| SyncErrorKind::Storage)?;

    tracing::debug!(torrent = %file.path.display(), remote = %remote.display(), "Torrent uploaded");
    Ok(Outcome::Uploaded {
        show: matched.show.to_string(),
        torrent: file.into_meta().path,
        remote,
    })
}

fn is_queued_torrent(file: &FileInfo) -> bool {
    file.path.components().count() == 1 && file.file_name().is_some_and(|name| name.ends_with(TORRENT_EXTENSION))
}

/// The release filename a torrent was named after.
fn release_name(filename: &str) -> &str {
    let name = filename.strip_suffix(TORRENT_EXTENSION).unwrap_or(filename);
    name.strip_prefix(META_PREFIX).unwrap_or(name)
}
