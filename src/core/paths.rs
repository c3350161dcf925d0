//! Shared filesystem paths with test-friendly overrides.

use std::path::PathBuf;

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).map(PathBuf::from)
}

fn fallback_home_dir() -> PathBuf {
    home::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Config directory (default: XDG config dir or ~/.config/upmon).
#[must_use]
pub fn config_dir() -> PathBuf {
    env_path("UPMON_CONFIG_DIR").unwrap_or_else(|| {
        dirs::config_dir()
            .map(|d| d.join("upmon"))
            .unwrap_or_else(|| fallback_home_dir().join(".config/upmon"))
    })
}

/// Config file path (default: config dir + config.toml).
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Pacman package cache directory (default: /var/cache/pacman/pkg).
///
/// The `system-update` sentinel staged by pacman-offline is a symlink to
/// this directory.
#[must_use]
pub fn pacman_cache_dir() -> PathBuf {
    env_path("UPMON_PACMAN_CACHE_DIR").unwrap_or_else(|| PathBuf::from("/var/cache/pacman/pkg"))
}

/// pacman-offline executable (default: /usr/bin/pacman-offline).
#[must_use]
pub fn pacman_offline_path() -> PathBuf {
    env_path("UPMON_PACMAN_OFFLINE").unwrap_or_else(|| PathBuf::from("/usr/bin/pacman-offline"))
}

/// pacman executable (default: resolved from PATH).
#[must_use]
pub fn pacman_path() -> PathBuf {
    env_path("UPMON_PACMAN").unwrap_or_else(|| PathBuf::from("pacman"))
}
