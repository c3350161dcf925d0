//! Offline-update backend trait definition

use std::path::Path;

use async_trait::async_trait;

use super::types::PackageUpdate;
use crate::core::Result;

/// Trait for offline-update backends
///
/// A backend recognizes the update mechanism that staged a pending offline
/// update and knows how to cancel and inspect it. Implementations are
/// stateless between calls; all update-specific state lives in the system
/// itself.
#[async_trait]
pub trait UpdateBackend: Send + Sync {
    /// Get the name of this backend, for logging and diagnostics
    fn name(&self) -> &'static str;

    /// Whether this backend owns the update staged behind `marker`.
    ///
    /// A pure classification query; must not mutate any state. Errors are
    /// treated as "does not claim" by the monitor.
    async fn is_supported(&self, marker: &Path) -> Result<bool>;

    /// Cancel the pending offline update.
    ///
    /// Must fail loudly when the underlying action reports failure; callers
    /// surface the error to the user.
    async fn cancel(&self) -> Result<()>;

    /// Packages which will be updated.
    ///
    /// May return stale or empty data when no update is staged; callers only
    /// invoke this while a backend is bound.
    async fn packages(&self) -> Result<Vec<PackageUpdate>>;
}
