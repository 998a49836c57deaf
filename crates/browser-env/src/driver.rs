//! Trait seams for the browser-automation driver.
//!
//! The lifecycle manager and the environment adapter only talk to these
//! traits. The concrete CDP backend lives in [`crate::chrome`]; an
//! in-memory implementation for runner-integration tests lives in
//! [`crate::stub`].

use crate::config::{BrowserKind, ContextOptions, LaunchOptions};
use crate::devices::{self, DeviceDescriptor};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// An uncaught error raised by a script inside a page.
#[derive(Debug, Clone)]
pub struct PageError {
    /// The error message as reported by the page.
    pub message: String,
    /// Source location if available (e.g. `app.js:42:10`).
    pub source: Option<String>,
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{} ({source})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for PageError {}

/// Callback invoked for every uncaught in-page error.
pub type PageErrorHandler = Arc<dyn Fn(PageError) + Send + Sync>;

/// A browser-automation driver: launches browsers and resolves devices.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// The browser kinds this driver can launch.
    fn supported(&self) -> &[BrowserKind];

    /// Launches a new browser process.
    ///
    /// # Errors
    ///
    /// Returns `LaunchFailed` when the process cannot be started. Errors
    /// propagate to the caller unchanged; nothing is retried.
    async fn launch(
        &self,
        kind: BrowserKind,
        options: &LaunchOptions,
    ) -> Result<Arc<dyn BrowserHandle>>;

    /// Looks up a named device descriptor. Defaults to the built-in
    /// registry.
    fn device(&self, name: &str) -> Option<DeviceDescriptor> {
        devices::lookup(name).cloned()
    }

    /// Every device name this driver knows, in stable order.
    fn device_names(&self) -> Vec<String> {
        devices::names().iter().map(ToString::to_string).collect()
    }
}

/// A launched browser instance.
///
/// Shared across all test files of one worker process via `Arc`; only the
/// lifecycle manager may close it.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// Creates a new isolated browsing context.
    async fn new_context(&self, options: &ContextOptions) -> Result<Arc<dyn BrowsingContext>>;

    /// Closes the browser process. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Returns true once the browser has been closed.
    async fn is_closed(&self) -> bool;
}

/// An isolated cookie/storage scope within one browser.
///
/// Exclusively owned by a single test file's environment instance.
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Creates a new page within this context.
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>>;

    /// Closes the context and any pages created through it. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// A single page (tab) within a browsing context.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Installs the handler invoked for uncaught in-page errors,
    /// replacing any previous one.
    fn set_error_handler(&self, handler: PageErrorHandler);

    /// Removes the installed error handler, if any.
    fn clear_error_handler(&self);

    /// Executes a `debugger;` statement in the page so an attached
    /// inspector stops there.
    async fn trigger_breakpoint(&self) -> Result<()>;

    /// Closes the page. Idempotent.
    async fn close(&self) -> Result<()>;
}
