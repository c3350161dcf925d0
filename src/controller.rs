//! Controller for pending offline updates
//!
//! Wraps whichever backend currently owns the pending update and exposes
//! cancellation and inspection. The bound backend is rebound externally,
//! typically by mirroring the monitor's published state; each call captures
//! the reference once at call start and uses that snapshot throughout.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backends::{PackageUpdate, UpdateBackend};
use crate::core::Result;
use crate::monitor::UpdateState;

/// What a cancellation request actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The bound backend's cancel action ran and succeeded
    Cancelled,
    /// No backend was bound; nothing to do
    NothingPending,
}

/// A controller for pending offline updates.
#[derive(Default)]
pub struct UpdateController {
    backend: Mutex<Option<Arc<dyn UpdateBackend>>>,
    // Serializes backend cancel invocations; concurrent callers queue up
    // rather than racing two external commands.
    cancel_gate: tokio::sync::Mutex<()>,
}

impl UpdateController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebind the controller to a new owning backend (or to none).
    pub fn bind(&self, backend: Option<Arc<dyn UpdateBackend>>) {
        *self.backend.lock() = backend;
    }

    /// The currently bound backend.
    #[must_use]
    pub fn bound_backend(&self) -> Option<Arc<dyn UpdateBackend>> {
        self.backend.lock().clone()
    }

    /// Cancel the pending offline update.
    ///
    /// With no bound backend this is a successful no-op. A backend failure
    /// propagates untouched so the caller can report it to the user.
    /// Concurrent calls are serialized but not deduplicated; each caller
    /// gets its own backend invocation.
    pub async fn cancel_pending_update(&self) -> Result<CancelOutcome> {
        let Some(backend) = self.bound_backend() else {
            tracing::info!("No backend for offline update, nothing to cancel");
            return Ok(CancelOutcome::NothingPending);
        };

        let _gate = self.cancel_gate.lock().await;
        tracing::info!(backend = backend.name(), "Cancelling pending offline update");
        backend.cancel().await?;
        Ok(CancelOutcome::Cancelled)
    }

    /// The packages the pending update would install.
    ///
    /// Empty without a bound backend. Never cached: the underlying package
    /// set can change between calls.
    pub async fn packages_to_update(&self) -> Result<Vec<PackageUpdate>> {
        match self.bound_backend() {
            Some(backend) => backend.packages().await,
            None => Ok(Vec::new()),
        }
    }
}

/// Keep `controller`'s bound backend mirroring the monitor's published one.
///
/// The initial binding happens before this returns; the returned task keeps
/// following published changes until the monitor shuts down.
pub fn bind_to_monitor(
    controller: Arc<UpdateController>,
    mut updates: watch::Receiver<UpdateState>,
) -> JoinHandle<()> {
    controller.bind(updates.borrow_and_update().backend.clone());
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let backend = updates.borrow_and_update().backend.clone();
            tracing::debug!(
                backend = backend.as_ref().map(|b| b.name()),
                "Rebinding update controller"
            );
            controller.bind(backend);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockBackend;
    use crate::core::UpmonError;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_without_backend_is_a_noop() {
        let controller = UpdateController::new();
        let outcome = controller.cancel_pending_update().await.unwrap();
        assert_eq!(outcome, CancelOutcome::NothingPending);
    }

    #[tokio::test]
    async fn packages_without_backend_are_empty() {
        let controller = UpdateController::new();
        assert!(controller.packages_to_update().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_delegates_to_bound_backend() {
        let backend = Arc::new(MockBackend::claiming("mock"));
        let controller = UpdateController::new();
        controller.bind(Some(backend.clone()));

        let outcome = controller.cancel_pending_update().await.unwrap();
        assert_eq!(outcome, CancelOutcome::Cancelled);
        assert_eq!(backend.cancel_calls(), 1);
    }

    #[tokio::test]
    async fn cancel_failure_propagates() {
        let backend = Arc::new(MockBackend::claiming("mock").with_failing_cancel());
        let controller = UpdateController::new();
        controller.bind(Some(backend.clone()));

        let err = controller.cancel_pending_update().await.unwrap_err();
        assert!(matches!(err, UpmonError::CommandFailed { .. }));
        assert_eq!(backend.cancel_calls(), 1);
    }

    #[tokio::test]
    async fn rebind_during_cancel_does_not_switch_backends() {
        let slow = Arc::new(
            MockBackend::claiming("slow").with_cancel_delay(Duration::from_millis(50)),
        );
        let other = Arc::new(MockBackend::claiming("other"));
        let controller = Arc::new(UpdateController::new());
        controller.bind(Some(slow.clone()));

        let cancelling = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.cancel_pending_update().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.bind(Some(other.clone()));

        let outcome = cancelling.await.unwrap().unwrap();
        assert_eq!(outcome, CancelOutcome::Cancelled);
        assert_eq!(slow.cancel_calls(), 1);
        assert_eq!(other.cancel_calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_cancels_each_reach_the_backend() {
        let backend = Arc::new(
            MockBackend::claiming("mock").with_cancel_delay(Duration::from_millis(10)),
        );
        let controller = Arc::new(UpdateController::new());
        controller.bind(Some(backend.clone()));

        let a = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.cancel_pending_update().await })
        };
        let b = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.cancel_pending_update().await })
        };

        assert_eq!(a.await.unwrap().unwrap(), CancelOutcome::Cancelled);
        assert_eq!(b.await.unwrap().unwrap(), CancelOutcome::Cancelled);
        // Serialized, not deduplicated.
        assert_eq!(backend.cancel_calls(), 2);
    }
}
