//! Offline-update backends
//!
//! Each backend recognizes one update mechanism and supplies cancellation
//! and inspection for it. Backends are registered as an ordered list; the
//! monitor asks each in turn whether it owns a detected update.

pub mod mock;
mod pacman_offline;
mod traits;
mod types;

pub use pacman_offline::PacmanOfflineBackend;
pub use traits::UpdateBackend;
pub use types::{PackageUpdate, parse_package_update};

use std::sync::Arc;

/// The backends available on this system, in priority order.
#[must_use]
pub fn default_backends() -> Vec<Arc<dyn UpdateBackend>> {
    vec![Arc::new(PacmanOfflineBackend::new())]
}
