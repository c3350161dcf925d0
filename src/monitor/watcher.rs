//! Filesystem watch collaborator
//!
//! The monitor only needs at-least-once delivery of create/delete events for
//! the sentinel file name; it coalesces bursts itself. [`MarkerWatch`]
//! captures that contract so tests can feed events from a plain channel,
//! while production uses a notify-backed watcher.

use std::path::PathBuf;

use async_trait::async_trait;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Deleted,
    Other,
}

/// A change event for one file in a watched directory
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// A cancellable stream of directory change events.
///
/// Delivery stops when the implementation is dropped. `None` from
/// [`next_event`](Self::next_event) means the watch has ended.
#[async_trait]
pub trait MarkerWatch: Send + 'static {
    /// Wait for the next change event.
    async fn next_event(&mut self) -> Option<WatchEvent>;

    /// Drain one already-queued event without waiting.
    fn try_next_event(&mut self) -> Option<WatchEvent>;
}

/// Tests drive the monitor through a plain channel.
#[async_trait]
impl MarkerWatch for mpsc::Receiver<WatchEvent> {
    async fn next_event(&mut self) -> Option<WatchEvent> {
        self.recv().await
    }

    fn try_next_event(&mut self) -> Option<WatchEvent> {
        self.try_recv().ok()
    }
}

/// notify-backed directory watch - drop to stop watching
pub struct NotifyMarkerWatch {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<WatchEvent>,
}

impl NotifyMarkerWatch {
    /// Start watching the given directories, non-recursively.
    ///
    /// Directories that do not exist are skipped; the sentinel cannot appear
    /// in them either.
    pub fn start(directories: &[PathBuf]) -> Result<Self> {
        let (tx, rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let kind = translate_kind(&event.kind);
                    for path in event.paths {
                        let _ = tx.blocking_send(WatchEvent { path, kind });
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "File watch error");
                }
            },
            Config::default(),
        )?;

        for directory in directories {
            if directory.is_dir() {
                tracing::debug!(directory = %directory.display(), "Watching for update marker");
                watcher.watch(directory, RecursiveMode::NonRecursive)?;
            } else {
                tracing::warn!(directory = %directory.display(), "Not a directory, skipping watch");
            }
        }

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }
}

#[async_trait]
impl MarkerWatch for NotifyMarkerWatch {
    async fn next_event(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }

    fn try_next_event(&mut self) -> Option<WatchEvent> {
        self.rx.try_recv().ok()
    }
}

fn translate_kind(kind: &EventKind) -> WatchEventKind {
    match kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Remove(_) => WatchEventKind::Deleted,
        _ => WatchEventKind::Other,
    }
}

/// Whether an event concerns the sentinel file appearing or disappearing.
#[must_use]
pub fn is_marker_event(event: &WatchEvent) -> bool {
    matches!(
        event.kind,
        WatchEventKind::Created | WatchEventKind::Deleted
    ) && event.path.file_name().is_some_and(|name| name == super::probe::MARKER_FILENAME)
}
