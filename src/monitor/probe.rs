//! Sentinel marker probe

use std::path::{Path, PathBuf};

use futures::future;

use crate::core::{Result, UpmonError};

/// The file name indicating a pending offline update.
pub const MARKER_FILENAME: &str = "system-update";

/// Locate the `system-update` sentinel in the candidate directories.
///
/// All directories are checked concurrently; the result is the first
/// directory in input order that holds the sentinel, so that backend probing
/// sees a deterministic marker path across passes. Only "not found"
/// collapses to absence; any other failure fails the whole probe.
pub async fn locate_marker(directories: &[PathBuf]) -> Result<Option<PathBuf>> {
    let checks = directories.iter().map(|dir| {
        let path = dir.join(MARKER_FILENAME);
        async move {
            let present = marker_exists(&path).await?;
            Ok::<_, UpmonError>(present.then_some(path))
        }
    });

    let mut located = None;
    for result in future::join_all(checks).await {
        match result? {
            Some(path) if located.is_none() => located = Some(path),
            _ => {}
        }
    }
    Ok(located)
}

/// Whether the marker exists, without following it as a symlink.
async fn marker_exists(path: &Path) -> Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(UpmonError::MarkerCheck {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_everywhere_is_none() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();

        let located = locate_marker(&[a.path().into(), b.path().into()])
            .await
            .unwrap();
        assert_eq!(located, None);
    }

    #[tokio::test]
    async fn first_directory_in_input_order_wins() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(a.path().join(MARKER_FILENAME), "").unwrap();
        std::fs::write(b.path().join(MARKER_FILENAME), "").unwrap();

        let located = locate_marker(&[a.path().into(), b.path().into()])
            .await
            .unwrap();
        assert_eq!(located, Some(a.path().join(MARKER_FILENAME)));

        let located = locate_marker(&[b.path().into(), a.path().into()])
            .await
            .unwrap();
        assert_eq!(located, Some(b.path().join(MARKER_FILENAME)));
    }

    #[tokio::test]
    async fn marker_in_second_directory_only() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(b.path().join(MARKER_FILENAME), "").unwrap();

        let located = locate_marker(&[a.path().into(), b.path().into()])
            .await
            .unwrap();
        assert_eq!(located, Some(b.path().join(MARKER_FILENAME)));
    }

    #[tokio::test]
    async fn dangling_symlink_still_counts_as_present() {
        let a = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/nonexistent-target", a.path().join(MARKER_FILENAME))
            .unwrap();

        let located = locate_marker(&[a.path().into()]).await.unwrap();
        assert_eq!(located, Some(a.path().join(MARKER_FILENAME)));
    }

    #[tokio::test]
    async fn non_notfound_failure_propagates() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(a.path().join(MARKER_FILENAME), "").unwrap();
        // A path component that is a regular file makes the check fail with
        // ENOTDIR rather than ENOENT.
        let file = b.path().join("plain-file");
        std::fs::write(&file, "").unwrap();

        let err = locate_marker(&[a.path().into(), file]).await.unwrap_err();
        assert!(matches!(err, UpmonError::MarkerCheck { .. }));
    }
}
