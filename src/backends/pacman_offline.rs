//! pacman-offline backend
//!
//! pacman-offline stages a reboot-time upgrade by symlinking the
//! `system-update` sentinel at the pacman package cache. Cancellation and
//! package listing shell out to pacman-offline and pacman respectively.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::traits::UpdateBackend;
use super::types::{PackageUpdate, parse_package_update};
use crate::core::{Result, UpmonError, paths};

pub struct PacmanOfflineBackend {
    cache_dir: PathBuf,
    cancel_command: PathBuf,
    pacman_command: PathBuf,
}

impl PacmanOfflineBackend {
    /// Create a backend using the system paths (overridable via `UPMON_*`
    /// environment variables, see [`crate::core::paths`]).
    #[must_use]
    pub fn new() -> Self {
        Self::with_paths(
            paths::pacman_cache_dir(),
            paths::pacman_offline_path(),
            paths::pacman_path(),
        )
    }

    /// Create a backend with explicit paths, for tests and sandboxes.
    #[must_use]
    pub fn with_paths(cache_dir: PathBuf, cancel_command: PathBuf, pacman_command: PathBuf) -> Self {
        Self {
            cache_dir,
            cancel_command,
            pacman_command,
        }
    }
}

impl Default for PacmanOfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateBackend for PacmanOfflineBackend {
    fn name(&self) -> &'static str {
        "pacman-offline"
    }

    async fn is_supported(&self, marker: &Path) -> Result<bool> {
        match tokio::fs::read_link(marker).await {
            Ok(target) => Ok(target == self.cache_dir),
            // EINVAL: the marker exists but is not a symlink, so it was not
            // staged by pacman-offline.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(false),
            Err(e) => Err(UpmonError::MarkerCheck {
                path: marker.to_path_buf(),
                source: e,
            }),
        }
    }

    async fn cancel(&self) -> Result<()> {
        let command = format!("{} -a", self.cancel_command.display());
        tracing::info!(%command, "Cancelling staged pacman offline update");

        let status = Command::new(&self.cancel_command)
            .arg("-a")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| UpmonError::CommandSpawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(UpmonError::CommandFailed { command, status });
        }
        Ok(())
    }

    async fn packages(&self) -> Result<Vec<PackageUpdate>> {
        let command = format!("{} -Qu --color=never", self.pacman_command.display());
        tracing::debug!(%command, "Listing staged package updates");

        let output = Command::new(&self.pacman_command)
            .args(["-Qu", "--color=never"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|source| UpmonError::CommandSpawn {
                command: command.clone(),
                source,
            })?;

        // pacman -Qu exits non-zero when no updates are available, so the
        // exit status carries no signal here; only stdout does.
        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| UpmonError::CommandOutput { command })?;
        stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(parse_package_update)
            .collect()
    }
}
