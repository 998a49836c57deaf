//! In-memory driver for exercising environments without a real browser.
//!
//! [`StubDriver`] records launches, closes, and the options every context
//! was created with, and its pages can emit synthetic in-page errors.
//! Runner integrations use it the same way this crate's own tests do:
//! assert on lifecycle behavior without Chrome installed.

use crate::config::{BrowserKind, ContextOptions, LaunchOptions};
use crate::devices::{self, DeviceDescriptor};
use crate::driver::{
    BrowserDriver, BrowserHandle, BrowsingContext, PageError, PageErrorHandler, PageHandle,
};
use crate::error::{EnvError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Default)]
struct StubState {
    launches: AtomicUsize,
    closes: AtomicUsize,
    fail_next_launch: Mutex<Option<String>>,
    last_context: Mutex<Option<ContextOptions>>,
    last_launch: Mutex<Option<LaunchOptions>>,
    last_page: Mutex<Option<Arc<StubPage>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A driver that launches nothing and remembers everything.
pub struct StubDriver {
    supported: Vec<BrowserKind>,
    devices: BTreeMap<String, DeviceDescriptor>,
    state: Arc<StubState>,
}

impl StubDriver {
    /// Creates a stub supporting Chromium with the built-in device
    /// registry.
    #[must_use]
    pub fn new() -> Self {
        let devices = devices::names()
            .into_iter()
            .filter_map(|name| {
                devices::lookup(name).map(|descriptor| (name.to_string(), descriptor.clone()))
            })
            .collect();
        Self {
            supported: vec![BrowserKind::Chromium],
            devices,
            state: Arc::new(StubState::default()),
        }
    }

    /// Replaces the supported browser set.
    #[must_use]
    pub fn with_supported(mut self, supported: Vec<BrowserKind>) -> Self {
        self.supported = supported;
        self
    }

    /// Adds or replaces a device in the stub's registry.
    #[must_use]
    pub fn with_device(mut self, name: impl Into<String>, descriptor: DeviceDescriptor) -> Self {
        self.devices.insert(name.into(), descriptor);
        self
    }

    /// Makes the next `launch` call fail with the given reason.
    pub fn fail_next_launch(&self, reason: impl Into<String>) {
        *lock(&self.state.fail_next_launch) = Some(reason.into());
    }

    /// How many times `launch` succeeded.
    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.state.launches.load(Ordering::SeqCst)
    }

    /// How many browsers were closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// The options the most recent context was created with.
    #[must_use]
    pub fn last_context_options(&self) -> Option<ContextOptions> {
        lock(&self.state.last_context).clone()
    }

    /// The options the most recent launch was asked for.
    #[must_use]
    pub fn last_launch_options(&self) -> Option<LaunchOptions> {
        lock(&self.state.last_launch).clone()
    }

    /// The most recently created page.
    #[must_use]
    pub fn last_page(&self) -> Option<Arc<StubPage>> {
        lock(&self.state.last_page).clone()
    }
}

impl Default for StubDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for StubDriver {
    fn supported(&self) -> &[BrowserKind] {
        &self.supported
    }

    async fn launch(
        &self,
        kind: BrowserKind,
        options: &LaunchOptions,
    ) -> Result<Arc<dyn BrowserHandle>> {
        if let Some(reason) = lock(&self.state.fail_next_launch).take() {
            return Err(EnvError::LaunchFailed {
                reason,
                source: None,
            });
        }

        self.state.launches.fetch_add(1, Ordering::SeqCst);
        *lock(&self.state.last_launch) = Some(options.clone());
        debug!(browser = kind.as_str(), "stub browser launched");

        Ok(Arc::new(StubBrowser {
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    fn device(&self, name: &str) -> Option<DeviceDescriptor> {
        self.devices.get(name).cloned()
    }

    fn device_names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }
}

struct StubBrowser {
    state: Arc<StubState>,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserHandle for StubBrowser {
    async fn new_context(&self, options: &ContextOptions) -> Result<Arc<dyn BrowsingContext>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EnvError::AlreadyClosed);
        }
        *lock(&self.state.last_context) = Some(options.clone());
        Ok(Arc::new(StubContext {
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct StubContext {
    state: Arc<StubState>,
    closed: AtomicBool,
}

#[async_trait]
impl BrowsingContext for StubContext {
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EnvError::AlreadyClosed);
        }
        let page = Arc::new(StubPage::default());
        *lock(&self.state.last_page) = Some(page.clone());
        Ok(page)
    }

    async fn close(&self) -> Result<()> {
        self.closed.swap(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A page that never renders; it records interactions instead.
#[derive(Default)]
pub struct StubPage {
    closed: AtomicBool,
    handler: Mutex<Option<PageErrorHandler>>,
    breakpoints: AtomicUsize,
}

impl StubPage {
    /// Delivers a synthetic in-page error to the installed handler, if
    /// any.
    pub fn emit_error(&self, message: impl Into<String>) {
        let callback = lock(&self.handler).clone();
        if let Some(callback) = callback {
            callback(PageError {
                message: message.into(),
                source: None,
            });
        }
    }

    /// Whether an error handler is currently installed.
    #[must_use]
    pub fn has_error_handler(&self) -> bool {
        lock(&self.handler).is_some()
    }

    /// Whether the page was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// How many times a breakpoint was triggered.
    #[must_use]
    pub fn breakpoint_count(&self) -> usize {
        self.breakpoints.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageHandle for StubPage {
    fn set_error_handler(&self, handler: PageErrorHandler) {
        *lock(&self.handler) = Some(handler);
    }

    fn clear_error_handler(&self) {
        *lock(&self.handler) = None;
    }

    async fn trigger_breakpoint(&self) -> Result<()> {
        self.breakpoints.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.swap(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_records_launches_and_closes() {
        let driver = StubDriver::new();
        let browser = driver
            .launch(BrowserKind::Chromium, &LaunchOptions::default())
            .await
            .expect("stub launch should succeed");

        assert_eq!(driver.launch_count(), 1);
        assert!(!browser.is_closed().await);

        browser.close().await.expect("stub close should succeed");
        browser.close().await.expect("close is idempotent");
        assert_eq!(driver.close_count(), 1);
    }

    #[tokio::test]
    async fn closed_browser_rejects_new_contexts() {
        let driver = StubDriver::new();
        let browser = driver
            .launch(BrowserKind::Chromium, &LaunchOptions::default())
            .await
            .expect("stub launch should succeed");
        browser.close().await.expect("stub close should succeed");

        let err = browser
            .new_context(&ContextOptions::default())
            .await
            .err()
            .expect("closed browser must reject contexts");
        assert!(matches!(err, EnvError::AlreadyClosed));
    }

    #[tokio::test]
    async fn page_errors_only_reach_installed_handlers() {
        let page = StubPage::default();
        page.emit_error("dropped");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        page.set_error_handler(Arc::new(move |page_error| {
            lock(&sink).push(page_error.message);
        }));
        page.emit_error("kept");

        page.clear_error_handler();
        page.emit_error("dropped too");

        assert_eq!(lock(&seen).as_slice(), ["kept"]);
    }
}
