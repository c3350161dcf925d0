#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::pedantic,
    clippy::nursery
)]
//! End-to-end scenario: detection, claiming, and a failing cancellation
//!
//! Uses the real pacman-offline backend against a sandboxed filesystem and
//! stub commands; only the notify watch is replaced by a channel.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use upmon_lib::backends::{PacmanOfflineBackend, UpdateBackend};
use upmon_lib::controller::{CancelOutcome, UpdateController, bind_to_monitor};
use upmon_lib::core::UpmonError;
use upmon_lib::monitor::UpdateMonitor;
use upmon_lib::monitor::probe::MARKER_FILENAME;
use upmon_lib::monitor::watcher::{WatchEvent, WatchEventKind};

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn failed_cancellation_surfaces_and_keeps_state() {
    // ===== ARRANGE: a sandboxed /etc, a pacman cache, stub commands =====
    let sandbox = tempfile::tempdir().unwrap();
    let etc = sandbox.path().join("etc");
    let cache = sandbox.path().join("cache");
    std::fs::create_dir_all(&etc).unwrap();
    std::fs::create_dir_all(&cache).unwrap();

    let cancel_cmd = script(sandbox.path(), "pacman-offline", "exit 1");
    let pacman_cmd = script(
        sandbox.path(),
        "pacman",
        r#"echo "linux 6.1-1 -> 6.2-1""#,
    );

    let backend: Arc<dyn UpdateBackend> = Arc::new(PacmanOfflineBackend::with_paths(
        cache.clone(),
        cancel_cmd,
        pacman_cmd,
    ));

    let (tx, rx) = mpsc::channel(16);
    let monitor = UpdateMonitor::spawn(
        vec![etc.clone()],
        vec![backend],
        rx,
        Duration::from_millis(5),
    )
    .await;
    let mut states = monitor.subscribe();
    states.borrow_and_update();

    let controller = Arc::new(UpdateController::new());
    let _binding = bind_to_monitor(Arc::clone(&controller), monitor.subscribe());

    // ===== ACT: pacman-offline stages an update =====
    let marker = etc.join(MARKER_FILENAME);
    std::os::unix::fs::symlink(&cache, &marker).unwrap();
    tx.send(WatchEvent::new(marker.clone(), WatchEventKind::Created))
        .await
        .unwrap();

    // ===== ASSERT: detected and claimed =====
    tokio::time::timeout(Duration::from_secs(2), states.changed())
        .await
        .unwrap()
        .unwrap();
    let state = states.borrow_and_update().clone();
    assert!(state.pending);
    assert_eq!(state.backend_name(), Some("pacman-offline"));

    // Give the rebinding task a moment to observe the same snapshot.
    tokio::time::timeout(Duration::from_secs(2), async {
        while controller.bound_backend().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let packages = controller.packages_to_update().await.unwrap();
    assert_eq!(packages.len(), 1);
    assert!(packages[0].important);

    // ===== ACT: the cancellation command exits non-zero =====
    let err = controller.cancel_pending_update().await.unwrap_err();
    match err {
        UpmonError::CommandFailed {
            ref command,
            status,
        } => {
            assert!(command.contains("pacman-offline"));
            assert_eq!(status.code(), Some(1));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }

    // A failed cancellation does not clear the pending state; only a marker
    // deletion event does.
    let state = monitor.state();
    assert!(state.pending);
    assert_eq!(state.backend_name(), Some("pacman-offline"));

    // ===== ACT: the marker disappears =====
    std::fs::remove_file(&marker).unwrap();
    tx.send(WatchEvent::new(marker, WatchEventKind::Deleted))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), states.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(!states.borrow_and_update().pending);

    // The controller follows the monitor back to "nothing to do".
    tokio::time::timeout(Duration::from_secs(2), async {
        while controller.bound_backend().is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(
        controller.cancel_pending_update().await.unwrap(),
        CancelOutcome::NothingPending
    );
    assert!(controller.packages_to_update().await.unwrap().is_empty());

    monitor.shutdown().await;
}

#[tokio::test]
async fn successful_cancellation_reports_cancelled() {
    let sandbox = tempfile::tempdir().unwrap();
    let etc = sandbox.path().join("etc");
    let cache = sandbox.path().join("cache");
    std::fs::create_dir_all(&etc).unwrap();
    std::fs::create_dir_all(&cache).unwrap();

    // The stub removes the marker like the real tool would.
    let marker = etc.join(MARKER_FILENAME);
    let cancel_cmd = script(
        sandbox.path(),
        "pacman-offline",
        &format!("rm -f {}", marker.display()),
    );

    let backend: Arc<dyn UpdateBackend> = Arc::new(PacmanOfflineBackend::with_paths(
        cache.clone(),
        cancel_cmd,
        PathBuf::from("/bin/true"),
    ));

    std::os::unix::fs::symlink(&cache, &marker).unwrap();
    let (_tx, rx) = mpsc::channel(16);
    let monitor = UpdateMonitor::spawn(
        vec![etc],
        vec![backend],
        rx,
        Duration::from_millis(5),
    )
    .await;
    assert!(monitor.state().pending);

    let controller = Arc::new(UpdateController::new());
    controller.bind(monitor.state().backend);

    assert_eq!(
        controller.cancel_pending_update().await.unwrap(),
        CancelOutcome::Cancelled
    );
    assert!(!marker.exists());

    monitor.shutdown().await;
}
