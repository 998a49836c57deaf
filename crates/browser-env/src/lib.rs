//! # browser-env
//!
//! Per-worker browser environment management for test runners.
//!
//! Test runners isolate test files into worker processes that share no
//! memory and offer no worker-level lifecycle hooks — only "this file's
//! setup runs now" and "this file's teardown just ran". Launching a
//! browser is slow, so relaunching per file is wasteful, but a worker that
//! never closes its browser leaks a process. This crate reconciles the two
//! with a process-wide lifecycle manager and a debounced deferred close:
//! teardown arms a short timer, and the next file's setup cancels it and
//! reuses the still-open browser.
//!
//! ## Architecture
//!
//! - **`BrowserLifecycle`**: owns the worker's single browser; get-or-launch
//!   plus schedule/cancel of the deferred close
//! - **`TestEnvironment`**: the per-test-file adapter (setup, teardown,
//!   timeout override) handing each file a `TestContext`
//! - **`TestContext`**: browser/context/page for one file, plus the
//!   operator `debug()` pause
//! - **`BrowserDriver`** and friends: trait seams over the automation
//!   driver; `ChromeDriver` is the CDP backend, `StubDriver` the in-memory
//!   one for tests
//!
//! ## Example
//!
//! ```ignore
//! use browser_env::{BrowserLifecycle, ChromeDriver, ResolvedConfig, TestEnvironment};
//! use std::sync::Arc;
//!
//! // Once per worker process:
//! let driver = Arc::new(ChromeDriver::new());
//! let lifecycle = Arc::new(BrowserLifecycle::new());
//!
//! // Per test file:
//! let mut env = TestEnvironment::new(driver, lifecycle, ResolvedConfig::default());
//! let cx = env.setup().await?;
//! // ... run the file's tests against cx.page ...
//! env.teardown().await?;
//! ```
//!
//! ## Resource model
//!
//! At most one browser exists per worker process, owned exclusively by the
//! lifecycle manager. Context and page belong to one test file; the
//! adapter closes them in teardown while the browser stays alive for the
//! next file. A deferred close either fires exactly once or is cancelled
//! before firing.
//!
//! ## Testing strategy
//!
//! Unit tests live beside the code and run against `StubDriver`; the
//! real-browser suite in `tests/chrome.rs` is `#[ignore]`d and needs
//! Chromium installed. Run with `cargo test` (stubbed) or
//! `cargo test -- --ignored` (full).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chrome;
pub mod config;
pub mod devices;
pub mod driver;
pub mod env;
pub mod error;
pub mod lifecycle;
pub mod pause;
pub mod stub;

// Re-export main types for convenience
pub use chrome::ChromeDriver;
pub use config::{BrowserKind, ContextOptions, DeviceSelection, LaunchOptions, ResolvedConfig};
pub use devices::{DeviceDescriptor, Viewport};
pub use driver::{
    BrowserDriver, BrowserHandle, BrowsingContext, PageError, PageErrorHandler, PageHandle,
};
pub use env::{RunnerTimeouts, TestContext, TestEnvironment, WorkerEnvironment};
pub use error::{EnvError, Result};
pub use lifecycle::{BrowserLifecycle, CLOSE_DEBOUNCE};
pub use pause::PAUSE_TIMEOUT;
pub use stub::{StubDriver, StubPage};
