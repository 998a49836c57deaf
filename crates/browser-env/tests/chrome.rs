//! Real-browser tests for the chromiumoxide backend.
//!
//! These require Chrome/Chromium to be installed and are marked #[ignore]
//! by default. Run with: cargo test --package browser-env -- --ignored

use browser_env::{
    BrowserDriver, BrowserKind, BrowserLifecycle, ChromeDriver, LaunchOptions, ResolvedConfig,
    TestEnvironment,
};
use std::sync::Arc;
use std::time::Duration;

fn chrome_worker() -> (Arc<dyn BrowserDriver>, Arc<BrowserLifecycle>) {
    (
        Arc::new(ChromeDriver::new()),
        Arc::new(BrowserLifecycle::with_close_delay(Duration::from_millis(50))),
    )
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn launch_reuse_and_deferred_close() {
    let (driver, lifecycle) = chrome_worker();
    let config = ResolvedConfig::default();

    let first = lifecycle
        .get_or_launch(driver.as_ref(), &config)
        .await
        .expect("failed to launch Chromium");
    let second = lifecycle
        .get_or_launch(driver.as_ref(), &config)
        .await
        .expect("reuse should succeed");
    assert!(Arc::ptr_eq(&first, &second), "same browser must be reused");

    lifecycle.schedule_close();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(!lifecycle.has_browser().await, "deferred close must fire");
    assert!(first.is_closed().await);
}

#[tokio::test]
#[ignore]
async fn full_environment_cycle_against_chromium() {
    let (driver, lifecycle) = chrome_worker();

    let mut env = TestEnvironment::new(
        Arc::clone(&driver),
        Arc::clone(&lifecycle),
        ResolvedConfig::default(),
    );

    let cx = env.setup().await.expect("setup should succeed");
    assert!(!cx.browser.is_closed().await);

    // The page is live enough to stop at a breakpoint statement.
    cx.page
        .trigger_breakpoint()
        .await
        .expect("breakpoint evaluation should succeed");

    env.teardown().await.expect("teardown should succeed");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!lifecycle.has_browser().await);
}

#[tokio::test]
#[ignore]
async fn device_emulation_applies_to_created_pages() {
    let (driver, lifecycle) = chrome_worker();
    let config = ResolvedConfig::from_json_str(r#"{"device": "Pixel 5"}"#)
        .expect("config should parse");

    let mut env = TestEnvironment::new(Arc::clone(&driver), Arc::clone(&lifecycle), config);
    env.setup().await.expect("setup should succeed");
    env.teardown().await.expect("teardown should succeed");

    tokio::time::sleep(Duration::from_millis(500)).await;
}

#[tokio::test]
#[ignore]
async fn launch_options_translate_to_process_arguments() {
    let driver = ChromeDriver::new();
    let options = LaunchOptions {
        args: vec!["--lang=de".to_string()],
        ..LaunchOptions::default()
    };

    let browser = driver
        .launch(BrowserKind::Chromium, &options)
        .await
        .expect("failed to launch Chromium with extra args");
    browser.close().await.expect("failed to close Chromium");
}
