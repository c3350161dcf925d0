//! Error types for upmon with helpful suggestions

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Convenience Result type for upmon operations
pub type Result<T> = std::result::Result<T, UpmonError>;

#[derive(Error, Debug)]
pub enum UpmonError {
    /// The sentinel existence check failed for a reason other than the file
    /// being absent. "Not found" is never an error, it means no update.
    #[error("Failed to check update marker {path}: {source}")]
    MarkerCheck {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("Command `{command}` produced non-UTF-8 output")]
    CommandOutput { command: String },

    #[error("Failed to parse package update from line: {line}")]
    PackageLine { line: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpmonError {
    /// Get a helpful suggestion for how to fix this error
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MarkerCheck { .. } => {
                Some("Check read permissions on / and /etc, or adjust watch_directories")
            }
            Self::CommandSpawn { .. } => {
                Some("Check that the backend tooling (e.g. pacman-offline) is installed")
            }
            Self::CommandFailed { .. } => {
                Some("The staged update may already be gone; re-run with RUST_LOG=debug for details")
            }
            Self::PackageLine { .. } | Self::CommandOutput { .. } => {
                Some("The package manager's output format changed; please report a bug")
            }
            Self::Config(_) => {
                Some("Check ~/.config/upmon/config.toml for syntax errors, or delete it to use defaults")
            }
            Self::Watch(_) | Self::Io(_) => None,
        }
    }
}

/// Format an error with its suggestion for display
pub fn format_error_with_suggestion(err: &UpmonError) -> String {
    let mut msg = format!("Error: {err}");
    if let Some(suggestion) = err.suggestion() {
        msg.push_str("\n\n💡 ");
        msg.push_str(suggestion);
    }
    msg
}
