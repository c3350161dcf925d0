//! Power-saver policy
//!
//! The host environment owns the power-profile signal; this module only
//! consumes a boolean "power saver enabled" stream and reacts by cancelling
//! a pending update through the controller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::controller::{CancelOutcome, UpdateController};
use crate::core::format_error_with_suggestion;
use crate::monitor::UpdateState;

/// Cancel pending updates whenever the power saver is (or becomes) active.
///
/// Two triggers: the power saver switching on while a backend is bound, and
/// a backend appearing while the power saver is already on. The second case
/// waits out `settle_delay` first; the delay is a tunable heuristic giving
/// the update mechanism time to finish staging, not a synchronization
/// guarantee.
///
/// The task ends when either input channel closes.
pub fn spawn_auto_cancel(
    controller: Arc<UpdateController>,
    mut power_saver: watch::Receiver<bool>,
    mut updates: watch::Receiver<UpdateState>,
    settle_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Catch a power saver that was already on at startup.
        if *power_saver.borrow_and_update() && updates.borrow_and_update().backend.is_some() {
            cancel(&controller).await;
        }

        loop {
            tokio::select! {
                changed = power_saver.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let enabled = *power_saver.borrow_and_update();
                    tracing::debug!(enabled, "Power saver changed");
                    if enabled && updates.borrow().backend.is_some() {
                        cancel(&controller).await;
                    }
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let has_backend = updates.borrow_and_update().backend.is_some();
                    if has_backend && *power_saver.borrow() {
                        tokio::time::sleep(settle_delay).await;
                        if *power_saver.borrow() {
                            cancel(&controller).await;
                        }
                    }
                }
            }
        }
        tracing::debug!("Power-saver policy stopped");
    })
}

async fn cancel(controller: &UpdateController) {
    match controller.cancel_pending_update().await {
        Ok(CancelOutcome::Cancelled) => {
            tracing::info!("Cancelled pending update because power saver is on");
        }
        Ok(CancelOutcome::NothingPending) => {}
        Err(error) => {
            tracing::error!(
                "Failed to cancel pending update: {}",
                format_error_with_suggestion(&error)
            );
        }
    }
}
