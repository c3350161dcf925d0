//! upmon Settings and Configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Result, UpmonError, paths};

/// upmon configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directories watched for the `system-update` sentinel.
    ///
    /// Fixed for the lifetime of the monitor; changing this requires a
    /// restart.
    pub watch_directories: Vec<PathBuf>,

    /// Cancel a staged update automatically when the power saver turns on
    pub auto_cancel_on_power_saver: bool,

    /// Grace period before auto-cancelling when a backend appears while the
    /// power saver is already active (seconds)
    pub backend_settle_delay_secs: u64,

    /// Settle window for bursts of filesystem events (milliseconds)
    pub debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // systemd's offline-updates convention puts the sentinel in /
            // with /etc as the writable fallback.
            watch_directories: vec![PathBuf::from("/"), PathBuf::from("/etc")],
            auto_cancel_on_power_saver: true,
            backend_settle_delay_secs: 5,
            debounce_ms: 100,
        }
    }
}

impl Settings {
    /// Load settings from the default config path.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Load settings from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&raw)
            .map_err(|e| UpmonError::Config(format!("{}: {e}", path.display())))
    }

    #[must_use]
    pub fn backend_settle_delay(&self) -> Duration {
        Duration::from_secs(self.backend_settle_delay_secs)
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
