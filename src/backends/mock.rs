//! Mock update backend for isolated testing
//!
//! Configurable claim answers, injected failures, and invocation counters so
//! tests can drive the monitor and controller without touching the system.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::UpdateBackend;
use super::types::PackageUpdate;
use crate::core::{Result, UpmonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeAnswer {
    Claim,
    Decline,
    Fail,
}

/// A scriptable [`UpdateBackend`]
pub struct MockBackend {
    name: &'static str,
    probe: ProbeAnswer,
    probe_delay: Duration,
    cancel_fails: bool,
    cancel_delay: Duration,
    packages: Vec<PackageUpdate>,
    cancel_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl MockBackend {
    /// A backend that claims every marker it is probed with.
    #[must_use]
    pub fn claiming(name: &'static str) -> Self {
        Self::with_answer(name, ProbeAnswer::Claim)
    }

    /// A backend that never claims a marker.
    #[must_use]
    pub fn declining(name: &'static str) -> Self {
        Self::with_answer(name, ProbeAnswer::Decline)
    }

    /// A backend whose ownership check always errors.
    #[must_use]
    pub fn failing_probe(name: &'static str) -> Self {
        Self::with_answer(name, ProbeAnswer::Fail)
    }

    fn with_answer(name: &'static str, probe: ProbeAnswer) -> Self {
        Self {
            name,
            probe,
            probe_delay: Duration::ZERO,
            cancel_fails: false,
            cancel_delay: Duration::ZERO,
            packages: Vec::new(),
            cancel_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    /// Make `cancel()` report a failed external command.
    #[must_use]
    pub fn with_failing_cancel(mut self) -> Self {
        self.cancel_fails = true;
        self
    }

    /// Delay `is_supported()` answers, to exercise tie-break ordering.
    #[must_use]
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Delay `cancel()`, to exercise rebind-during-cancel races.
    #[must_use]
    pub fn with_cancel_delay(mut self, delay: Duration) -> Self {
        self.cancel_delay = delay;
        self
    }

    /// Set the package diff returned by `packages()`.
    #[must_use]
    pub fn with_packages(mut self, packages: Vec<PackageUpdate>) -> Self {
        self.packages = packages;
        self
    }

    /// How many times `cancel()` ran.
    #[must_use]
    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// How many times `is_supported()` ran.
    #[must_use]
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpdateBackend for MockBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_supported(&self, _marker: &Path) -> Result<bool> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        match self.probe {
            ProbeAnswer::Claim => Ok(true),
            ProbeAnswer::Decline => Ok(false),
            ProbeAnswer::Fail => Err(UpmonError::Config(format!(
                "mock backend {} probe failure",
                self.name
            ))),
        }
    }

    async fn cancel(&self) -> Result<()> {
        if !self.cancel_delay.is_zero() {
            tokio::time::sleep(self.cancel_delay).await;
        }
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.cancel_fails {
            use std::os::unix::process::ExitStatusExt;
            // Same shape a real backend produces for a non-zero exit.
            return Err(UpmonError::CommandFailed {
                command: format!("mock-cancel --backend {}", self.name),
                status: std::process::ExitStatus::from_raw(1 << 8),
            });
        }
        Ok(())
    }

    async fn packages(&self) -> Result<Vec<PackageUpdate>> {
        Ok(self.packages.clone())
    }
}
