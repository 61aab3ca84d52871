//! Everything between a parsed release and a file on disk: where episodes
//! go in the library, whether a transfer may start, and the passes that move
//! torrents out to the seedbox and episodes back in.

pub mod error;
mod guard;
mod identify;
mod resolver;
pub mod sync;

pub use crate::guard::{RateLimited, SpaceCheck, has_space, is_stable, rate_limit, stabilize};
pub use crate::identify::{SkipReason, identify};
pub use crate::resolver::{DEFAULT_DIRECTORY_TEMPLATE, DEFAULT_FILE_TEMPLATE, PathResolver, ResolvedDestination};
use seedsync_release::Catalog;
use seedsync_storage::BackendHandle;
use std::path::PathBuf;
use std::time::Duration;

/// Everything a pass needs to know that isn't a storage backend.
pub struct Context {
    /// Per-client directory name on the seedbox.
    pub name: String,
    pub catalog: Catalog,
    pub resolver: PathResolver,
    /// Maximum uploads per pass.
    pub rate_limit: usize,
    pub stability_interval: Duration,
    /// Watched directory on the remote, relative to its root.
    pub blackhole: PathBuf,
    /// Finished downloads on the remote, relative to its root.
    pub completed: PathBuf,
    /// Decide everything, move nothing. Pair with read-only backends.
    pub dry_run: bool,
}
impl Context {
    /// `<blackhole>/<name>`, where uploaded torrents are dropped.
    pub fn blackhole_dir(&self) -> PathBuf {
        self.blackhole.join(&self.name)
    }

    /// `<completed>/<name>`, where this client's finished episodes appear.
    pub fn completed_dir(&self) -> PathBuf {
        self.completed.join(&self.name)
    }
}

/// The four places files live.
pub struct Backends {
    /// The seedbox file area.
    pub remote: BackendHandle,
    /// Media library root.
    pub library: BackendHandle,
    /// Local queue of `.torrent` files waiting to be uploaded.
    pub torrents: BackendHandle,
    /// Archive of uploaded torrents, one directory per show.
    pub backup: BackendHandle,
}
