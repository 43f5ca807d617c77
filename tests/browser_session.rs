//! Browser session lifecycle tests.
//!
//! These launch a real headless Chromium, so they are ignored by default;
//! run them with `cargo test -- --ignored` on a machine with Chrome or
//! Chromium installed.

use butterfly_updater::browser::delays::{DelayProfile, Delays};
use butterfly_updater::browser::{BrowserSession, SessionOptions};

fn options(screenshot_dir: &std::path::Path) -> SessionOptions {
    SessionOptions {
        headless: true,
        delays: Delays::new(DelayProfile::Fast),
        screenshot_dir: screenshot_dir.to_path_buf(),
    }
}

#[tokio::test]
#[ignore = "requires a local Chromium install"]
async fn test_close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let session = BrowserSession::launch(&options(dir.path())).await.unwrap();

    assert!(!session.is_closed().await);
    assert_eq!(session.screenshot_dir(), dir.path());

    session.close().await;
    assert!(session.is_closed().await);

    // Closing again must be a no-op, not a second teardown of the same
    // child process.
    session.close().await;
    assert!(session.is_closed().await);
}

#[tokio::test]
#[ignore = "requires a local Chromium install"]
async fn test_drop_without_close_does_not_hang() {
    let dir = tempfile::tempdir().unwrap();
    let session = BrowserSession::launch(&options(dir.path())).await.unwrap();

    // Dropping an open session leans on the backstop that aborts the CDP
    // event loop; the test passes by returning instead of hanging on a
    // still-running handler task.
    drop(session);
}
