//! Filesystem change watcher
//!
//! Subscribes to a package directory (non-recursive, like the package
//! itself) and turns raw notify events into debounced triggers. Dropping
//! the watcher unsubscribes from the OS and stops the debounce task.

use crate::error::{MirrorError, MirrorResult};
use crate::watch::debounce::Debouncer;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One debounced burst of changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Number of raw events collapsed into this trigger
    pub events: usize,

    /// Distinct paths touched by the burst
    pub paths: Vec<PathBuf>,
}

/// Whether an event should wake the pipeline
fn is_relevant(event: &Event, ignore: &[PathBuf]) -> bool {
    let kind_matters = matches!(
        event.kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !kind_matters {
        return false;
    }

    // Writes into an ignored tree (the cache root) are our own doing
    event.paths.is_empty()
        || !event
            .paths
            .iter()
            .all(|p| ignore.iter().any(|i| p.starts_with(i)))
}

/// Debounced subscription to a directory
pub struct ChangeWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    batches: mpsc::Receiver<Vec<notify::Result<Event>>>,
    debounce: JoinHandle<()>,
}

impl ChangeWatcher {
    /// Start watching `path`.
    ///
    /// Must be called inside a tokio runtime. Events under any of the
    /// `ignore` prefixes are dropped before debouncing.
    pub fn start(path: &Path, quiet: Duration, ignore: Vec<PathBuf>) -> MirrorResult<Self> {
        let watch_failed = |e: notify::Error| MirrorError::WatchFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let forward = match &res {
                Ok(event) => is_relevant(event, &ignore),
                Err(_) => true,
            };
            if forward {
                // The receiver is gone once the watcher is shutting down
                let _ = raw_tx.send(res);
            }
        })
        .map_err(watch_failed)?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(watch_failed)?;

        let (batch_tx, batch_rx) = mpsc::channel(1);
        let debounce = Debouncer::new(quiet).spawn(raw_rx, batch_tx);

        debug!("Watching {} (quiet interval {:?})", path.display(), quiet);
        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
            batches: batch_rx,
            debounce,
        })
    }

    /// Path being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next trigger.
    ///
    /// `None` once the notification source has closed; an error when it
    /// reported a failure, after which the watcher should be dropped.
    pub async fn next(&mut self) -> Option<MirrorResult<Trigger>> {
        let batch = self.batches.recv().await?;
        let events = batch.len();

        let mut paths: Vec<PathBuf> = Vec::new();
        for result in batch {
            match result {
                Ok(event) => paths.extend(event.paths),
                Err(e) => {
                    return Some(Err(MirrorError::WatchFailed {
                        path: self.path.clone(),
                        reason: e.to_string(),
                    }))
                }
            }
        }

        paths.sort();
        paths.dedup();
        Some(Ok(Trigger { events, paths }))
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.debounce.abort();
        debug!("Stopped watching {}", self.path.display());
    }
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("path", &self.path)
            .finish()
    }
}
