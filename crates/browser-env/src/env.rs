//! Per-test-file environment adapter.
//!
//! One [`TestEnvironment`] instance exists per test file. Its `setup`
//! resolves configuration, obtains the worker's shared browser through the
//! lifecycle manager, creates an isolated context and page, installs error
//! forwarding, and hands the test a [`TestContext`]. Its `teardown`
//! releases the page and arms the deferred browser close.

use crate::config::{ContextOptions, DeviceSelection, ResolvedConfig};
use crate::driver::{
    BrowserDriver, BrowserHandle, BrowsingContext, PageErrorHandler, PageHandle,
};
use crate::error::{EnvError, Result};
use crate::lifecycle::BrowserLifecycle;
use crate::pause;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// The runner's timeout slots for the currently executing test.
///
/// Test declaration styles differ: legacy suites carry a global timeout
/// field while newer ones use a runner-internal slot. `set` writes both so
/// whichever one the runner consults is current; `effective` prefers the
/// legacy slot when one is attached, mirroring how the runner picks.
#[derive(Debug, Clone, Default)]
pub struct RunnerTimeouts {
    legacy: Option<Arc<AtomicU64>>,
    internal: Arc<AtomicU64>,
}

impl RunnerTimeouts {
    /// Creates timeouts with only the runner-internal slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the legacy global timeout field.
    #[must_use]
    pub fn with_legacy_slot(mut self, slot: Arc<AtomicU64>) -> Self {
        self.legacy = Some(slot);
        self
    }

    /// Sets the active test timeout, keeping every attached slot in sync.
    pub fn set(&self, timeout: Duration) {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if let Some(legacy) = &self.legacy {
            legacy.store(millis, Ordering::SeqCst);
        }
        self.internal.store(millis, Ordering::SeqCst);
    }

    /// Returns the timeout the runner would observe.
    #[must_use]
    pub fn effective(&self) -> Duration {
        let millis = match &self.legacy {
            Some(legacy) => legacy.load(Ordering::SeqCst),
            None => self.internal.load(Ordering::SeqCst),
        };
        Duration::from_millis(millis)
    }
}

/// What a test file receives from `setup`.
///
/// Replaces ambient global publication: the runner passes this object into
/// test bodies. The browser is shared across the worker's files; context
/// and page belong to this file alone.
#[derive(Clone)]
pub struct TestContext {
    /// The worker's shared browser (not owned by this file).
    pub browser: Arc<dyn BrowserHandle>,
    /// This file's isolated browsing context.
    pub context: Arc<dyn BrowsingContext>,
    /// This file's page.
    pub page: Arc<dyn PageHandle>,
    timeouts: RunnerTimeouts,
}

// Manual impl: the handles are trait objects without Debug bounds.
impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl TestContext {
    /// Pauses the test until the operator resumes it from standard input.
    ///
    /// Raises the test timeout to [`pause::PAUSE_TIMEOUT`] first so the
    /// runner does not kill the paused test, then stops in an attached
    /// inspector via an in-page breakpoint. Resumes on interrupt,
    /// end-of-transmission, or Enter.
    ///
    /// # Errors
    ///
    /// Returns driver errors from the breakpoint evaluation or I/O errors
    /// from standard input.
    pub async fn debug(&self) -> Result<()> {
        self.timeouts.set(pause::PAUSE_TIMEOUT);
        self.page.trigger_breakpoint().await?;
        pause::pause_until_resumed().await
    }
}

/// The environment contract the runner drives per test file.
#[async_trait]
pub trait WorkerEnvironment: Send {
    /// Provisions browser, context, and page for one test file.
    async fn setup(&mut self) -> Result<TestContext>;

    /// Releases this file's resources and arms the deferred browser close.
    async fn teardown(&mut self) -> Result<()>;

    /// Overrides the current test timeout.
    fn set_timeout(&self, timeout: Duration);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvState {
    Uninitialized,
    SetUp,
    TornDown,
}

/// Per-test-file environment adapter.
pub struct TestEnvironment {
    driver: Arc<dyn BrowserDriver>,
    lifecycle: Arc<BrowserLifecycle>,
    config: ResolvedConfig,
    timeouts: RunnerTimeouts,
    uncaught: PageErrorHandler,
    state: EnvState,
    context: Option<Arc<dyn BrowsingContext>>,
    page: Option<Arc<dyn PageHandle>>,
}

impl TestEnvironment {
    /// Creates an environment for one test file.
    ///
    /// The lifecycle manager must be the worker-wide instance shared by
    /// every environment of this process. Without an explicit uncaught
    /// handler, in-page errors are logged at error level.
    #[must_use]
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        lifecycle: Arc<BrowserLifecycle>,
        config: ResolvedConfig,
    ) -> Self {
        Self {
            driver,
            lifecycle,
            config,
            timeouts: RunnerTimeouts::new(),
            uncaught: Arc::new(|page_error| {
                error!("uncaught in-page error: {page_error}");
            }),
            state: EnvState::Uninitialized,
            context: None,
            page: None,
        }
    }

    /// Uses the given runner timeout slots instead of fresh ones.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: RunnerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Routes uncaught in-page errors into the worker's failure channel.
    ///
    /// The adapter forwards every page error to this callback for as long
    /// as the page is set up; the runner integration decides how to fail
    /// the test.
    #[must_use]
    pub fn with_uncaught_handler(mut self, handler: PageErrorHandler) -> Self {
        self.uncaught = handler;
        self
    }

    fn resolve_context_options(&self) -> Result<ContextOptions> {
        let mut options = self.config.context.clone();
        match &self.config.device {
            None => {}
            Some(DeviceSelection::Descriptor(descriptor)) => {
                options.merge_device(descriptor);
            }
            Some(DeviceSelection::Name(name)) => {
                let Some(descriptor) = self.driver.device(name) else {
                    return Err(EnvError::UnknownDevice {
                        requested: name.clone(),
                        known: self.driver.device_names(),
                    });
                };
                options.merge_device(&descriptor);
            }
        }
        Ok(options)
    }

    /// Provisions this file's browser, context, and page.
    ///
    /// May only be called once per instance. Configuration errors are
    /// fatal to the file and raised before any launch side effect; driver
    /// errors propagate unchanged. If context or page creation fails after
    /// the browser was obtained, the browser stays alive for later files.
    ///
    /// # Errors
    ///
    /// `SetupAlreadyRan` on reuse, configuration errors for unsupported
    /// browser or device selections, driver errors otherwise.
    pub async fn setup(&mut self) -> Result<TestContext> {
        if self.state != EnvState::Uninitialized {
            return Err(EnvError::SetupAlreadyRan);
        }

        // Synchronous, before any await: the previous file's deferred
        // close must be disarmed before the launch/reuse path begins.
        self.lifecycle.cancel_scheduled_close();

        let kind = self.config.browser_kind();
        let supported = self.driver.supported();
        if !supported.contains(&kind) {
            return Err(EnvError::UnsupportedBrowser {
                requested: kind.to_string(),
                supported: supported.iter().map(ToString::to_string).collect(),
            });
        }

        let context_options = self.resolve_context_options()?;

        let browser = self
            .lifecycle
            .get_or_launch(self.driver.as_ref(), &self.config)
            .await?;

        let context = browser.new_context(&context_options).await?;
        let page = context.new_page().await?;

        page.set_error_handler(self.uncaught.clone());

        self.context = Some(context.clone());
        self.page = Some(page.clone());
        self.state = EnvState::SetUp;
        debug!(browser = kind.as_str(), "environment set up");

        Ok(TestContext {
            browser,
            context,
            page,
            timeouts: self.timeouts.clone(),
        })
    }

    /// Releases this file's page and context and arms the deferred close.
    ///
    /// The runner's own base teardown is expected to have run already.
    /// The browser itself is not closed here; the lifecycle manager
    /// disposes of it only if no further file starts within the debounce.
    ///
    /// # Errors
    ///
    /// `SetupNotRun`/`TeardownAlreadyRan` on out-of-order calls; driver
    /// errors from closing the page or context.
    pub async fn teardown(&mut self) -> Result<()> {
        match self.state {
            EnvState::SetUp => {}
            EnvState::Uninitialized => return Err(EnvError::SetupNotRun),
            EnvState::TornDown => return Err(EnvError::TeardownAlreadyRan),
        }

        if let Some(page) = self.page.take() {
            page.clear_error_handler();
            page.close().await?;
        }
        if let Some(context) = self.context.take() {
            context.close().await?;
        }

        self.lifecycle.schedule_close();
        self.state = EnvState::TornDown;
        debug!("environment torn down");
        Ok(())
    }

    /// Overrides the current test timeout across the runner's slots.
    pub fn set_timeout(&self, timeout: Duration) {
        self.timeouts.set(timeout);
    }
}

#[async_trait]
impl WorkerEnvironment for TestEnvironment {
    async fn setup(&mut self) -> Result<TestContext> {
        TestEnvironment::setup(self).await
    }

    async fn teardown(&mut self) -> Result<()> {
        TestEnvironment::teardown(self).await
    }

    fn set_timeout(&self, timeout: Duration) {
        TestEnvironment::set_timeout(self, timeout);
    }
}
