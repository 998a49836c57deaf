//! Runner-level tests driving full setup/teardown cycles against the stub
//! driver, the way a worker process would — no browser required.

use browser_env::{
    BrowserKind, BrowserLifecycle, EnvError, PAUSE_TIMEOUT, ResolvedConfig, RunnerTimeouts,
    StubDriver, TestEnvironment,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn worker(close_delay: Duration) -> (Arc<StubDriver>, Arc<BrowserLifecycle>) {
    (
        Arc::new(StubDriver::new()),
        Arc::new(BrowserLifecycle::with_close_delay(close_delay)),
    )
}

fn file_environment(
    driver: &Arc<StubDriver>,
    lifecycle: &Arc<BrowserLifecycle>,
    config: ResolvedConfig,
) -> TestEnvironment {
    let driver: Arc<dyn browser_env::BrowserDriver> = driver.clone();
    TestEnvironment::new(driver, Arc::clone(lifecycle), config)
}

#[tokio::test]
async fn sequential_test_files_share_one_browser_launch() {
    // The debounce is far longer than the gap between files, so every
    // setup cancels the previous teardown's deferred close.
    let (driver, lifecycle) = worker(Duration::from_secs(5));

    for _ in 0..4 {
        let mut env = file_environment(&driver, &lifecycle, ResolvedConfig::default());
        let cx = env.setup().await.expect("setup should succeed");
        assert!(!cx.browser.is_closed().await);
        env.teardown().await.expect("teardown should succeed");
    }

    assert_eq!(driver.launch_count(), 1, "browser must be reused across files");
    assert_eq!(driver.close_count(), 0, "debounce must still be pending");
}

#[tokio::test]
async fn an_idle_worker_closes_its_browser_exactly_once() {
    let (driver, lifecycle) = worker(Duration::from_millis(10));

    let mut env = file_environment(&driver, &lifecycle, ResolvedConfig::default());
    env.setup().await.expect("setup should succeed");
    env.teardown().await.expect("teardown should succeed");

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(driver.close_count(), 1);
    assert!(!lifecycle.has_browser().await);
}

#[tokio::test]
async fn teardown_releases_the_page_but_not_the_browser() {
    let (driver, lifecycle) = worker(Duration::from_secs(5));

    let mut env = file_environment(&driver, &lifecycle, ResolvedConfig::default());
    env.setup().await.expect("setup should succeed");

    let page = driver.last_page().expect("setup created a page");
    assert!(page.has_error_handler(), "setup installs the error forwarder");
    assert!(!page.is_closed());

    env.teardown().await.expect("teardown should succeed");

    assert!(page.is_closed(), "teardown closes the file's page");
    assert!(!page.has_error_handler(), "teardown detaches the forwarder");
    assert!(
        lifecycle.has_browser().await,
        "the browser stays alive for the next file"
    );
}

#[tokio::test]
async fn a_failed_setup_leaves_the_browser_alive_for_later_files() {
    let (driver, lifecycle) = worker(Duration::from_secs(5));

    // First file launches the browser.
    let mut first = file_environment(&driver, &lifecycle, ResolvedConfig::default());
    first.setup().await.expect("first setup should succeed");
    first.teardown().await.expect("first teardown should succeed");

    // Second file fails on configuration, after the browser exists.
    let bad_config = ResolvedConfig {
        device: Some(browser_env::DeviceSelection::Name("Nokia 3310".into())),
        ..ResolvedConfig::default()
    };
    let mut second = file_environment(&driver, &lifecycle, bad_config);
    let err = second.setup().await.expect_err("unknown device must fail");
    assert!(err.is_configuration());

    // Third file still reuses the original launch.
    let mut third = file_environment(&driver, &lifecycle, ResolvedConfig::default());
    third.setup().await.expect("third setup should succeed");

    assert_eq!(driver.launch_count(), 1);
    assert_eq!(driver.close_count(), 0);
}

#[tokio::test]
async fn launch_failures_surface_as_setup_failures() {
    let (driver, lifecycle) = worker(Duration::from_secs(5));
    driver.fail_next_launch("chrome executable missing");

    let mut env = file_environment(&driver, &lifecycle, ResolvedConfig::default());
    let err = env.setup().await.expect_err("launch was told to fail");

    match err {
        EnvError::LaunchFailed { reason, .. } => {
            assert_eq!(reason, "chrome executable missing");
        }
        other => panic!("expected LaunchFailed, got {other}"),
    }
}

#[tokio::test]
async fn unsupported_browser_never_reaches_the_driver() {
    let (driver, lifecycle) = worker(Duration::from_secs(5));
    let config = ResolvedConfig {
        browser: Some(BrowserKind::Firefox),
        ..ResolvedConfig::default()
    };

    let mut env = file_environment(&driver, &lifecycle, config);
    let err = env.setup().await.expect_err("firefox is unsupported");

    assert!(err.is_configuration());
    let message = err.to_string();
    assert!(message.contains("firefox"));
    assert!(message.contains("chromium"));
    assert_eq!(driver.launch_count(), 0);
}

#[tokio::test]
async fn launch_options_are_ignored_on_reuse() {
    // First launch wins: a later file's launch options have no effect
    // while the worker's browser is still running.
    let (driver, lifecycle) = worker(Duration::from_secs(5));

    let headless = ResolvedConfig::from_json_str(r#"{"launch": {"headless": true}}"#)
        .expect("config should parse");
    let mut first = file_environment(&driver, &lifecycle, headless);
    first.setup().await.expect("first setup should succeed");
    first.teardown().await.expect("first teardown should succeed");

    let headed = ResolvedConfig::from_json_str(r#"{"launch": {"headless": false}}"#)
        .expect("config should parse");
    let mut second = file_environment(&driver, &lifecycle, headed);
    second.setup().await.expect("second setup should succeed");

    assert_eq!(driver.launch_count(), 1);
    let seen = driver.last_launch_options().expect("one launch happened");
    assert!(seen.headless, "the first file's launch options stay in effect");
}

#[tokio::test]
async fn debug_pause_raises_the_test_timeout_and_hits_a_breakpoint() {
    let (driver, lifecycle) = worker(Duration::from_secs(5));

    let legacy = Arc::new(AtomicU64::new(5_000));
    let timeouts = RunnerTimeouts::new().with_legacy_slot(legacy.clone());

    let mut env = file_environment(&driver, &lifecycle, ResolvedConfig::default())
        .with_timeouts(timeouts.clone());
    let cx = env.setup().await.expect("setup should succeed");

    // Drive the two observable steps of debug() directly; the stdin wait
    // itself is covered by the pause module's unit tests.
    env.set_timeout(PAUSE_TIMEOUT);
    cx.page
        .trigger_breakpoint()
        .await
        .expect("breakpoint should trigger");

    assert_eq!(
        legacy.load(Ordering::SeqCst),
        PAUSE_TIMEOUT.as_millis() as u64,
        "the legacy timeout slot must hold the pause timeout"
    );
    assert_eq!(timeouts.effective(), PAUSE_TIMEOUT);

    let page = driver.last_page().expect("setup created a page");
    assert_eq!(page.breakpoint_count(), 1);
}

#[tokio::test]
async fn page_errors_fail_the_worker_not_the_void() {
    let (driver, lifecycle) = worker(Duration::from_secs(5));

    let failures: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = failures.clone();

    let mut env = file_environment(&driver, &lifecycle, ResolvedConfig::default())
        .with_uncaught_handler(Arc::new(move |page_error| {
            sink.lock().expect("sink lock").push(page_error.to_string());
        }));
    env.setup().await.expect("setup should succeed");

    driver
        .last_page()
        .expect("setup created a page")
        .emit_error("TypeError: undefined is not a function");

    let seen = failures.lock().expect("sink lock");
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("TypeError"));
}
