//! Real-time organization of files as they appear in a folder.
//!
//! [`start_watching`] subscribes to non-recursive filesystem events for one
//! folder and hands every newly created file to the [`Organizer`]. Events are
//! processed one at a time, in arrival order, on a dedicated worker thread,
//! so the caller gets control back immediately.

use crate::file_organizer::{OrganizeError, OrganizeOutcome, Organizer};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that prevent a watch session from starting.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The folder does not exist or cannot be resolved.
    #[error("cannot watch {}: {source}", path.display())]
    InvalidFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The path exists but is not a directory.
    #[error("cannot watch {}: not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// The OS-level subscription could not be established.
    #[error("failed to subscribe to events for {}: {source}", path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// The worker thread could not be spawned.
    #[error("failed to start watch worker: {0}")]
    Spawn(#[source] io::Error),
}

/// Counters kept by the worker for the lifetime of a session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    /// Arrival events handed to the organizer.
    pub events: usize,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum WatchMessage {
    Event(notify::Result<Event>),
    Shutdown,
}

/// A live subscription to one folder.
///
/// The session runs until [`WatchSession::stop`] is called or the handle is
/// dropped.
pub struct WatchSession {
    folder: PathBuf,
    watcher: Option<RecommendedWatcher>,
    control: Sender<WatchMessage>,
    worker: Option<JoinHandle<WatchStats>>,
}

/// Starts organizing files created in `folder` from now on.
///
/// The folder is canonicalized first. Existing files are left alone; run the
/// batch scanner after this call to pick them up without a gap.
///
/// # Errors
///
/// Returns a [`WatchError`] if the folder is invalid or the subscription
/// cannot be established. No session exists in that case.
///
/// # Examples
///
/// ```no_run
/// use tidywatch::config::SorterConfig;
/// use tidywatch::file_organizer::Organizer;
/// use tidywatch::watcher::start_watching;
/// use std::path::Path;
///
/// let organizer = Organizer::new(SorterConfig::builtin());
/// let session = start_watching(organizer, Path::new("/home/me/Downloads"))?;
/// // ... later
/// let stats = session.stop();
/// println!("moved {} files", stats.moved);
/// # Ok::<(), tidywatch::watcher::WatchError>(())
/// ```
pub fn start_watching(organizer: Organizer, folder: &Path) -> Result<WatchSession, WatchError> {
    let folder = fs::canonicalize(folder).map_err(|source| WatchError::InvalidFolder {
        path: folder.to_path_buf(),
        source,
    })?;
    if !folder.is_dir() {
        return Err(WatchError::NotADirectory(folder));
    }

    let (tx, rx) = mpsc::channel();
    let event_tx = tx.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = event_tx.send(WatchMessage::Event(res));
    })
    .map_err(|source| WatchError::Subscribe {
        path: folder.clone(),
        source,
    })?;

    watcher
        .watch(&folder, RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::Subscribe {
            path: folder.clone(),
            source,
        })?;

    let worker_folder = folder.clone();
    let worker = thread::Builder::new()
        .name("tidywatch-worker".to_string())
        .spawn(move || run_worker(organizer, worker_folder, rx))
        .map_err(WatchError::Spawn)?;

    info!(folder = %folder.display(), "watching for new files");

    Ok(WatchSession {
        folder,
        watcher: Some(watcher),
        control: tx,
        worker: Some(worker),
    })
}

impl WatchSession {
    /// The canonical path being watched.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Tears down the subscription, lets the worker finish the events
    /// already queued and waits for it.
    pub fn stop(mut self) -> WatchStats {
        self.shutdown()
    }

    /// Blocks the calling thread for as long as the session runs.
    ///
    /// Only another thread dropping the subscription or process termination
    /// ends a session that is being joined.
    pub fn join(mut self) -> WatchStats {
        match self.worker.take() {
            Some(worker) => join_worker(worker),
            None => WatchStats::default(),
        }
    }

    fn shutdown(&mut self) -> WatchStats {
        if self.watcher.take().is_some() {
            debug!(folder = %self.folder.display(), "unsubscribed");
        }
        let _ = self.control.send(WatchMessage::Shutdown);

        match self.worker.take() {
            Some(worker) => {
                let stats = join_worker(worker);
                info!(
                    folder = %self.folder.display(),
                    moved = stats.moved,
                    failed = stats.failed,
                    "stopped watching"
                );
                stats
            }
            None => WatchStats::default(),
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_worker(worker: JoinHandle<WatchStats>) -> WatchStats {
    worker.join().unwrap_or_else(|_| {
        error!("watch worker panicked");
        WatchStats::default()
    })
}

fn run_worker(organizer: Organizer, folder: PathBuf, rx: Receiver<WatchMessage>) -> WatchStats {
    let mut stats = WatchStats::default();

    while let Ok(message) = rx.recv() {
        match message {
            WatchMessage::Event(Ok(event)) => handle_event(&organizer, &folder, &event, &mut stats),
            WatchMessage::Event(Err(e)) => error!(error = %e, "watcher error"),
            WatchMessage::Shutdown => break,
        }
    }

    stats
}

/// Creation, or a rename that lands in the folder.
fn is_arrival(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any))
    )
}

fn handle_event(organizer: &Organizer, folder: &Path, event: &Event, stats: &mut WatchStats) {
    if !is_arrival(&event.kind) {
        return;
    }

    for path in &event.paths {
        if path.parent() != Some(folder) {
            continue;
        }
        debug!(path = %path.display(), kind = ?event.kind, "new entry detected");
        stats.events += 1;

        match organizer.organize_one(path) {
            Ok(OrganizeOutcome::Moved(_)) => stats.moved += 1,
            Ok(OrganizeOutcome::Skipped { .. }) => stats.skipped += 1,
            Err(OrganizeError::FileVanished { .. }) => {
                debug!(path = %path.display(), "entry gone before it could be organized");
                stats.skipped += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not organize new file");
                stats.failed += 1;
            }
        }
    }
}
