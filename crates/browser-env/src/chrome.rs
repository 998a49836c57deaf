//! Chromium driver backend built on chromiumoxide.
//!
//! Supports the Chromium kind only. Context isolation is approximated at
//! this layer: each context is a page factory that applies its merged
//! viewport/user-agent overrides to every page it creates, and closing the
//! context closes those pages.

use crate::config::{BrowserKind, ContextOptions, LaunchOptions};
use crate::driver::{
    BrowserDriver, BrowserHandle, BrowsingContext, PageError, PageErrorHandler, PageHandle,
};
use crate::error::{EnvError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CloseParams;
use chromiumoxide::cdp::js_protocol::runtime::EventExceptionThrown;
use chromiumoxide::page::Page as ChromePage;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

static SUPPORTED: [BrowserKind; 1] = [BrowserKind::Chromium];

/// Driver backend that launches Chromium over the DevTools protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeDriver;

impl ChromeDriver {
    /// Creates the driver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn build_browser_config(options: &LaunchOptions) -> Result<BrowserConfig> {
    let mut config = BrowserConfig::builder();

    if !options.headless {
        config = config.with_head();
    }
    if options.devtools {
        config = config.arg("--auto-open-devtools-for-tabs");
    }

    // Container-friendly defaults; user namespaces and /dev/shm are often
    // unavailable in CI.
    config = config.arg("--no-sandbox");
    config = config.arg("--disable-dev-shm-usage");

    // Unique user data directory so parallel workers never fight over a
    // ProcessSingleton lock.
    let user_data_dir = std::env::temp_dir().join(format!("browser-env-{}", uuid::Uuid::new_v4()));
    config = config.arg(format!("--user-data-dir={}", user_data_dir.display()));

    for arg in &options.args {
        config = config.arg(arg.clone());
    }

    if let Some(path) = &options.executable {
        config = config.chrome_executable(path.clone());
    }

    config.build().map_err(|e| EnvError::LaunchFailed {
        reason: format!("invalid browser configuration: {e}"),
        source: None,
    })
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    fn supported(&self) -> &[BrowserKind] {
        &SUPPORTED
    }

    async fn launch(
        &self,
        kind: BrowserKind,
        options: &LaunchOptions,
    ) -> Result<Arc<dyn BrowserHandle>> {
        debug!(browser = kind.as_str(), headless = options.headless, "launching Chromium");

        let browser_config = build_browser_config(options)?;
        let (browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| EnvError::LaunchFailed {
                    reason: "failed to launch Chromium process".to_string(),
                    source: Some(Box::new(e)),
                })?;

        // chromiumoxide needs a task draining the handler stream to make
        // progress on CDP traffic.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("browser handler error: {e}");
                }
            }
        });

        debug!("Chromium launched");

        Ok(Arc::new(ChromeBrowser {
            inner: Arc::new(Mutex::new(Some(browser))),
        }))
    }
}

/// A running Chromium process.
struct ChromeBrowser {
    inner: Arc<Mutex<Option<Browser>>>,
}

#[async_trait]
impl BrowserHandle for ChromeBrowser {
    async fn new_context(&self, options: &ContextOptions) -> Result<Arc<dyn BrowsingContext>> {
        if self.inner.lock().await.is_none() {
            return Err(EnvError::AlreadyClosed);
        }
        Ok(Arc::new(ChromeContext {
            browser: self.inner.clone(),
            options: options.clone(),
            pages: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<()> {
        if let Some(mut browser) = self.inner.lock().await.take() {
            debug!("closing Chromium");
            browser.close().await?;
        }
        Ok(())
    }

    async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

/// One browsing context: pages created through it share the context's
/// emulation overrides and are closed with it.
struct ChromeContext {
    browser: Arc<Mutex<Option<Browser>>>,
    options: ContextOptions,
    pages: Mutex<Vec<Arc<ChromeTab>>>,
    closed: AtomicBool,
}

#[async_trait]
impl BrowsingContext for ChromeContext {
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EnvError::AlreadyClosed);
        }

        let page = {
            let guard = self.browser.lock().await;
            let browser = guard.as_ref().ok_or(EnvError::AlreadyClosed)?;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| EnvError::Driver(format!("failed to create page: {e}")))?
        };

        if let Some(viewport) = &self.options.viewport {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(viewport.width))
                .height(i64::from(viewport.height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(EnvError::Driver)?;
            page.execute(params).await?;
        }

        if let Some(user_agent) = &self.options.user_agent {
            let params = SetUserAgentOverrideParams::builder()
                .user_agent(user_agent.clone())
                .build()
                .map_err(EnvError::Driver)?;
            page.execute(params).await?;
        }

        let tab = ChromeTab::spawn(page);
        self.pages.lock().await.push(tab.clone());
        Ok(tab)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let pages = std::mem::take(&mut *self.pages.lock().await);
        for page in pages {
            if let Err(e) = page.close().await {
                warn!("failed to close context page: {e}");
            }
        }
        Ok(())
    }
}

/// A single tab with an exception listener feeding the page-error handler.
struct ChromeTab {
    inner: Arc<ChromePage>,
    handler: Arc<StdMutex<Option<PageErrorHandler>>>,
    closed: AtomicBool,
    _error_task: JoinHandle<()>,
}

impl ChromeTab {
    fn spawn(page: ChromePage) -> Arc<Self> {
        let handler: Arc<StdMutex<Option<PageErrorHandler>>> = Arc::new(StdMutex::new(None));
        let inner = Arc::new(page);

        let task_page = inner.clone();
        let task_handler = handler.clone();
        let error_task = tokio::spawn(async move {
            if let Ok(mut events) = task_page.event_listener::<EventExceptionThrown>().await {
                while let Some(event) = events.next().await {
                    let error = parse_exception(&event);
                    let callback = task_handler
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .clone();
                    match callback {
                        Some(callback) => callback(error),
                        None => warn!("uncaught in-page error with no handler attached: {error}"),
                    }
                }
            }
        });

        Arc::new(Self {
            inner,
            handler,
            closed: AtomicBool::new(false),
            _error_task: error_task,
        })
    }
}

#[async_trait]
impl PageHandle for ChromeTab {
    fn set_error_handler(&self, handler: PageErrorHandler) {
        *self
            .handler
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handler);
    }

    fn clear_error_handler(&self) {
        *self
            .handler
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    async fn trigger_breakpoint(&self) -> Result<()> {
        self.inner
            .evaluate("debugger;")
            .await
            .map(|_| ())
            .map_err(|e| EnvError::Driver(format!("failed to trigger breakpoint: {e}")))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.execute(CloseParams::default()).await?;
        Ok(())
    }
}

fn parse_exception(event: &EventExceptionThrown) -> PageError {
    let details = &event.exception_details;

    let message = details
        .exception
        .as_ref()
        .and_then(|exception| exception.description.clone())
        .unwrap_or_else(|| details.text.clone());

    let source = details
        .url
        .as_ref()
        .map(|url| format!("{url}:{}:{}", details.line_number, details.column_number));

    PageError { message, source }
}
