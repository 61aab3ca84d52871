mod error;
mod notify;

use crate::error::{ErrorKind, Result};
use crate::notify::Notifier;
use clap::{Parser, Subcommand};
use exn::ResultExt;
use futures::{Stream, StreamExt};
use seedsync_config::Config;
use seedsync_config::error::ErrorKind as ConfigErrorKind;
use seedsync_library::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use seedsync_library::sync::{self, Direction, SyncEvent};
use seedsync_library::{Backends, Context, PathResolver, identify};
use seedsync_storage::BackendHandle;
use seedsync_storage::backend::{LocalBackend, ReadOnlyBackend};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seedsync", version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON). Searched for when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Decide everything, change nothing.
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
enum Command {
    /// Upload queued torrents, then download finished episodes (default).
    Sync,
    /// Upload queued torrents to the seedbox.
    Upload,
    /// Download finished episodes into the library.
    Download,
    /// Show where each release would be filed, without touching anything.
    Identify {
        #[arg(required = true)]
        filenames: Vec<String>,
    },
    /// Write a commented template configuration.
    Init {
        /// Defaults to the user configuration directory.
        path: Option<PathBuf>,
    },
}
impl Command {
    fn directions(&self) -> &'static [Direction] {
        match self {
            Self::Upload => &[Direction::Upload],
            Self::Download => &[Direction::Download],
            _ => &[Direction::Upload, Direction::Download],
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Sync);

    if let Command::Init { path } = &command {
        init_logging(cli.verbose);
        return match init(path.as_deref()) {
            Ok(path) => {
                println!("Wrote {}", path.display());
                ExitCode::SUCCESS
            },
            Err(e) => fatal(&Notifier::new(None), &e).await,
        };
    }

    let config = Config::load(cli.config.as_deref());
    init_logging(cli.verbose || config.as_ref().is_ok_and(|c| c.verbose));
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            if matches!(&*e, ConfigErrorKind::NotFound(_)) {
                eprintln!("Run `seedsync init` to create a configuration file.");
            }
            return fatal(&Notifier::new(None), &e).await;
        },
    };
    let notifier = Notifier::new(config.webhook_url.clone());

    let result = match &command {
        Command::Identify { filenames } => identify_all(config, filenames),
        command => run(&notifier, config, cli.dry_run, command.directions()).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(&notifier, &e).await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder().with_default_directive(default.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn init(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => seedsync_config::default_path().or_raise(|| ErrorKind::Init)?,
    };
    seedsync_config::write_template(&path).or_raise(|| ErrorKind::Init)?;
    Ok(path)
}

/// Report an error that ends the run. The full error tree only goes to the
/// debug log; the notification gets the top-level message.
async fn fatal<E>(notifier: &Notifier, err: &exn::Exn<E>) -> ExitCode
where
    E: std::error::Error + Send + Sync + 'static,
{
    tracing::debug!("{err:?}");
    notifier.send(Level::ERROR, &format!("Run aborted: {}", &**err)).await;
    ExitCode::FAILURE
}

fn backends(config: &Config, dry_run: bool) -> Result<Backends> {
    // A missing remote root usually means the mount went away. Creating it
    // would hide that behind an empty listing.
    if !config.remote.root.is_dir() {
        exn::bail!(ErrorKind::Storage("remote"));
    }
    let open = |name: &'static str, root: &Path| -> Result<BackendHandle> {
        let local: BackendHandle = Arc::new(LocalBackend::new(name, root).or_raise(|| ErrorKind::Storage(name))?);
        let handle: BackendHandle = if dry_run { Arc::new(ReadOnlyBackend::new(local)) } else { local };
        Ok(handle)
    };
    Ok(Backends {
        remote: open("remote", &config.remote.root)?,
        library: open("library", &config.library_dir)?,
        torrents: open("torrents", &config.torrent_dir)?,
        backup: open("backup", &config.backup_dir)?,
    })
}

fn context(config: Config, dry_run: bool) -> Result<Context> {
    let resolver = PathResolver::new(config.naming.directory, config.naming.file).or_raise(|| ErrorKind::Template)?;
    Ok(Context {
        name: config.name,
        catalog: config.catalog,
        resolver,
        rate_limit: config.rate_limit,
        stability_interval: config.stability_interval,
        blackhole: config.remote.blackhole,
        completed: config.remote.completed,
        dry_run,
    })
}

async fn run(notifier: &Notifier, config: Config, dry_run: bool, directions: &[Direction]) -> Result<()> {
    let backends = backends(&config, dry_run)?;
    let ctx = context(config, dry_run)?;
    if dry_run {
        tracing::info!("Dry run: nothing will be written, moved or deleted");
    }
    for &direction in directions {
        let events = match direction {
            Direction::Upload => sync::upload(&backends, &ctx).boxed_local(),
            Direction::Download => sync::download(&backends, &ctx).boxed_local(),
        };
        report(notifier, direction, events).await?;
    }
    Ok(())
}

async fn report(
    notifier: &Notifier,
    direction: Direction,
    events: impl Stream<Item = LibraryResult<SyncEvent>>,
) -> Result<()> {
    let mut events = pin!(events);
    while let Some(event) = events.next().await {
        match event {
            Ok(SyncEvent::Started(_)) => tracing::debug!(%direction, "Pass started"),
            Ok(SyncEvent::DiscoveryComplete(count)) => tracing::info!(%direction, count, "Files discovered"),
            Ok(SyncEvent::RateLimited { admitted, deferred }) => {
                let line = format!("Rate limit reached: uploading {admitted}, {deferred} deferred to the next run");
                notifier.send(Level::INFO, &line).await;
            },
            Ok(SyncEvent::Processed(outcome)) => notifier.send(outcome.level(), &outcome.to_string()).await,
            Ok(SyncEvent::Complete(_)) => tracing::debug!(%direction, "Pass complete"),
            // One file failed; it is picked up again next pass.
            Err(e) if matches!(&*e, LibraryErrorKind::Sync { .. }) => {
                tracing::debug!("{e:?}");
                notifier.send(Level::ERROR, &(*e).to_string()).await;
            },
            Err(e) => {
                let cause = (*e).to_string();
                return Err(e.raise(ErrorKind::Pass { direction, cause }));
            },
        }
    }
    Ok(())
}

/// Print where each filename would end up. Directory components of the
/// argument are ignored so paths can be pasted straight from a listing.
fn identify_all(config: Config, filenames: &[String]) -> Result<()> {
    let resolver = PathResolver::new(config.naming.directory, config.naming.file).or_raise(|| ErrorKind::Template)?;
    for filename in filenames {
        let name = Path::new(filename).file_name().and_then(|n| n.to_str()).unwrap_or(filename.as_str());
        let line = match identify(&config.catalog, name) {
            Ok(matched) => match resolver.destination(&matched) {
                Ok(destination) => destination.path().display().to_string(),
                Err(e) => format!("error: {}", &*e),
            },
            Err(reason) => format!("skipped: {reason}"),
        };
        println!("{filename}\n  {line}");
    }
    Ok(())
}
