//! Monitor for pending offline updates
//!
//! Watches the candidate directories for the `system-update` sentinel,
//! re-probes on relevant change events, and publishes the pending flag
//! together with the owning backend as one atomic snapshot. Detection
//! passes are serialized; events arriving mid-pass coalesce into a single
//! trailing pass.

pub mod probe;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::backends::UpdateBackend;
use crate::config::Settings;
use crate::core::Result;
use self::watcher::{MarkerWatch, NotifyMarkerWatch, is_marker_event};

/// The jointly-published monitor output.
///
/// `backend` is only ever `Some` while `pending` is true; both fields change
/// in one publication, so an observer never pairs the flag with a stale
/// backend identity.
#[derive(Clone, Default)]
pub struct UpdateState {
    /// Whether an offline update is pending
    pub pending: bool,
    /// The backend that claimed the pending update, if any
    pub backend: Option<Arc<dyn UpdateBackend>>,
}

impl UpdateState {
    /// Name of the owning backend, for logging and assertions.
    #[must_use]
    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }
}

impl std::fmt::Debug for UpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateState")
            .field("pending", &self.pending)
            .field("backend", &self.backend_name())
            .finish()
    }
}

impl PartialEq for UpdateState {
    fn eq(&self, other: &Self) -> bool {
        self.pending == other.pending && self.backend_name() == other.backend_name()
    }
}

/// Monitor for pending system updates.
///
/// Dropping the monitor (or calling [`shutdown`](Self::shutdown)) stops the
/// detection task and releases the underlying filesystem watch; no state is
/// published afterwards.
pub struct UpdateMonitor {
    state_rx: watch::Receiver<UpdateState>,
    check_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl UpdateMonitor {
    /// Start a monitor over the configured directories with a notify-backed
    /// filesystem watch.
    pub async fn start(
        settings: &Settings,
        backends: Vec<Arc<dyn UpdateBackend>>,
    ) -> Result<Self> {
        // Subscribe before the initial pass so a marker appearing in between
        // is not missed.
        let watch = NotifyMarkerWatch::start(&settings.watch_directories)?;
        Ok(Self::spawn(
            settings.watch_directories.clone(),
            backends,
            watch,
            settings.debounce(),
        )
        .await)
    }

    /// Start a monitor with an explicit watch implementation.
    ///
    /// The initial detection pass completes before this returns; a detection
    /// error at startup is logged and leaves the initial `pending=false`
    /// state in place.
    pub async fn spawn<W: MarkerWatch + Sync>(
        directories: Vec<PathBuf>,
        backends: Vec<Arc<dyn UpdateBackend>>,
        watch: W,
        debounce: Duration,
    ) -> Self {
        let (state_tx, state_rx) = tokio::sync::watch::channel(UpdateState::default());
        let (check_tx, check_rx) = mpsc::channel(8);

        let mut task = MonitorTask {
            directories,
            backends,
            watch,
            check_rx,
            state_tx,
            debounce,
        };

        if let Err(error) = task.run_pass().await {
            tracing::error!(%error, "Initial update detection failed");
        }

        let task = tokio::spawn(task.run());
        Self {
            state_rx,
            check_tx,
            task,
        }
    }

    /// Subscribe to state snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state_rx.clone()
    }

    /// The currently published state.
    #[must_use]
    pub fn state(&self) -> UpdateState {
        self.state_rx.borrow().clone()
    }

    /// Request a detection pass outside of filesystem events.
    ///
    /// The pass runs on the monitor task, serialized with event-triggered
    /// passes. Returns immediately.
    pub fn recheck(&self) {
        // A full queue already guarantees a pass will run after this call.
        let _ = self.check_tx.try_send(());
    }

    /// Stop the monitor and wait for the detection task to finish.
    pub async fn shutdown(self) {
        let Self {
            state_rx,
            check_tx,
            task,
        } = self;
        drop(state_rx);
        drop(check_tx);
        let _ = task.await;
    }
}

struct MonitorTask<W> {
    directories: Vec<PathBuf>,
    backends: Vec<Arc<dyn UpdateBackend>>,
    watch: W,
    check_rx: mpsc::Receiver<()>,
    state_tx: watch::Sender<UpdateState>,
    debounce: Duration,
}

impl<W: MarkerWatch> MonitorTask<W> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                request = self.check_rx.recv() => match request {
                    Some(()) => self.recheck(false).await,
                    // The handle is gone; tear down.
                    None => break,
                },
                event = self.watch.next_event() => match event {
                    Some(event) if is_marker_event(&event) => {
                        tracing::debug!(?event, "Update marker changed");
                        self.recheck(true).await;
                    }
                    Some(_) => {}
                    // The watch was cancelled underneath us.
                    None => break,
                },
            }
        }
        tracing::debug!("Update monitor stopped");
    }

    /// Run detection until no further trigger is queued (last-one-wins).
    async fn recheck(&mut self, debounce: bool) {
        if debounce && !self.debounce.is_zero() {
            // Let the event burst settle, then collapse it into one pass.
            tokio::time::sleep(self.debounce).await;
        }
        self.drain_triggers();
        loop {
            if let Err(error) = self.run_pass().await {
                tracing::error!(%error, "Update detection failed");
            }
            if !self.drain_triggers() {
                break;
            }
        }
    }

    /// Discard queued triggers, reporting whether any were relevant.
    fn drain_triggers(&mut self) -> bool {
        let mut relevant = false;
        while let Some(event) = self.watch.try_next_event() {
            if is_marker_event(&event) {
                relevant = true;
            }
        }
        while self.check_rx.try_recv().is_ok() {
            relevant = true;
        }
        relevant
    }

    /// One detection pass: probe the marker, re-classify, publish.
    ///
    /// A probe failure aborts the pass; the previously published state stays
    /// in place.
    async fn run_pass(&mut self) -> Result<()> {
        let marker = probe::locate_marker(&self.directories).await?;
        let pending = marker.is_some();

        if pending == self.state_tx.borrow().pending {
            return Ok(());
        }

        let backend = match marker {
            Some(marker) => self.claim_backend(&marker).await,
            None => None,
        };

        tracing::info!(
            pending,
            backend = backend.as_ref().map(|b| b.name()),
            "Offline update state changed"
        );
        self.state_tx.send_replace(UpdateState { pending, backend });
        Ok(())
    }

    /// Ask every backend concurrently whether it owns `marker`; pick the
    /// first claimant in registration order, regardless of which answer
    /// arrived first.
    async fn claim_backend(&self, marker: &std::path::Path) -> Option<Arc<dyn UpdateBackend>> {
        let probes = self.backends.iter().map(|backend| async move {
            match backend.is_supported(marker).await {
                Ok(claimed) => claimed,
                Err(error) => {
                    tracing::warn!(backend = backend.name(), %error, "Backend probe failed");
                    false
                }
            }
        });

        let claims = future::join_all(probes).await;
        self.backends
            .iter()
            .zip(claims)
            .find_map(|(backend, claimed)| claimed.then(|| Arc::clone(backend)))
    }
}
