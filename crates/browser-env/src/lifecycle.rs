//! Process-wide browser lifecycle with deferred-close coordination.
//!
//! Each worker process constructs exactly one [`BrowserLifecycle`] and
//! shares it across every environment instance in that process. The manager
//! launches at most one browser, reuses it across test files, and disposes
//! of it through a debounced close: teardown arms a short timer, and the
//! next file's setup disarms it before requesting the browser again. The
//! runner offers no "worker is done" hook, so the debounce approximates
//! "no more files will run in this worker".

use crate::config::ResolvedConfig;
use crate::driver::{BrowserDriver, BrowserHandle};
use crate::error::{EnvError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Debounce applied between a file's teardown and the browser close.
///
/// Long enough for the next file's setup to cancel the close, short enough
/// not to keep the browser alive once the worker is really done.
pub const CLOSE_DEBOUNCE: Duration = Duration::from_millis(50);

/// Explicit armed/disarmed state for the deferred close.
///
/// Arming returns a token; the timer that fires later only proceeds when
/// its token is still current. Both disarming and re-arming invalidate
/// older tokens, so a scheduled close fires at most once and a re-arm
/// restarts the debounce.
#[derive(Debug, Default)]
struct Disposer {
    generation: AtomicU64,
    armed_since: StdMutex<Option<Instant>>,
}

impl Disposer {
    fn arm(&self) -> u64 {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .armed_since
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Instant::now());
        token
    }

    fn disarm(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self
            .armed_since
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    fn is_current(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    fn armed_since(&self) -> Option<Instant> {
        *self
            .armed_since
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Owns the single browser instance of one worker process.
///
/// Constructed once per process and passed by `Arc` to every environment
/// instance; no other component may mutate the browser slot.
pub struct BrowserLifecycle {
    slot: Mutex<Option<Arc<dyn BrowserHandle>>>,
    disposer: Disposer,
    close_delay: Duration,
}

impl BrowserLifecycle {
    /// Creates a manager with the fixed [`CLOSE_DEBOUNCE`] delay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_close_delay(CLOSE_DEBOUNCE)
    }

    /// Creates a manager with a custom debounce delay.
    ///
    /// Production workers use [`BrowserLifecycle::new`]; the injectable
    /// delay exists so tests can drive the timer deterministically.
    #[must_use]
    pub fn with_close_delay(close_delay: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            disposer: Disposer::default(),
            close_delay,
        }
    }

    /// Clears any pending deferred close. No-op when none is pending.
    ///
    /// Synchronous, and called at the start of every setup so a
    /// just-finished file's teardown cannot race-close the browser before
    /// the next file's setup observes it.
    pub fn cancel_scheduled_close(&self) {
        if self.disposer.armed_since().is_some() {
            debug!("cancelling scheduled browser close");
        }
        self.disposer.disarm();
    }

    /// Returns the shared browser, launching it on first use.
    ///
    /// On reuse the launch options are ignored: switching launch options
    /// mid-process has no effect until the worker restarts (first launch
    /// wins). On first use the requested browser kind is validated against
    /// the driver's supported set before any launch side effect.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedBrowser` for a kind outside the driver's
    /// supported set; launch failures propagate unchanged.
    pub async fn get_or_launch(
        &self,
        driver: &dyn BrowserDriver,
        config: &ResolvedConfig,
    ) -> Result<Arc<dyn BrowserHandle>> {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.as_ref() {
            debug!("reusing browser already launched by this worker");
            return Ok(handle.clone());
        }

        let kind = config.browser_kind();
        let supported = driver.supported();
        if !supported.contains(&kind) {
            return Err(EnvError::UnsupportedBrowser {
                requested: kind.to_string(),
                supported: supported.iter().map(ToString::to_string).collect(),
            });
        }

        debug!(browser = kind.as_str(), "launching browser for this worker");
        let handle = driver.launch(kind, &config.launch).await?;
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Arms the deferred close.
    ///
    /// When the debounce elapses without a cancellation, the browser slot
    /// is emptied first and the captured browser closed afterwards, so a
    /// concurrent `get_or_launch` can never observe a half-closed browser.
    /// Firing with an already empty slot is a no-op.
    pub fn schedule_close(self: &Arc<Self>) {
        let token = self.disposer.arm();
        let manager = Arc::clone(self);
        let delay = self.close_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.fire(token).await;
        });
    }

    async fn fire(&self, token: u64) {
        let mut slot = self.slot.lock().await;
        if !self.disposer.is_current(token) {
            return;
        }
        self.disposer.disarm();
        let Some(browser) = slot.take() else {
            return;
        };
        drop(slot);

        debug!("deferred close firing, disposing worker browser");
        if let Err(e) = browser.close().await {
            warn!("deferred browser close failed: {e}");
        }
    }

    /// Returns true while the process-wide slot holds a browser.
    pub async fn has_browser(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Returns when the pending deferred close was armed, if one is
    /// pending.
    #[must_use]
    pub fn close_armed_since(&self) -> Option<Instant> {
        self.disposer.armed_since()
    }
}

impl Default for BrowserLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
