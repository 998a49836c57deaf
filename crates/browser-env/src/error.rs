//! Error types for environment setup, teardown, and browser lifecycle
//! operations.
//!
//! The hierarchy distinguishes configuration errors (unsupported browser,
//! unknown device — fatal to the current test file, never retried) from
//! driver errors (launch/context/page failures, propagated unchanged) and
//! environment state errors (setup/teardown called out of order).

use thiserror::Error;

/// A specialized Result type for environment operations.
pub type Result<T> = std::result::Result<T, EnvError>;

/// The main error type for all environment and lifecycle operations.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The configured browser kind is not supported by the active driver.
    ///
    /// The message enumerates the full supported set so the failing test
    /// file reports both the offending value and the accepted values.
    #[error("unsupported browser '{requested}', expected one of [{}]", .supported.join(", "))]
    UnsupportedBrowser {
        /// The browser kind the configuration asked for.
        requested: String,
        /// Every kind the driver can launch.
        supported: Vec<String>,
    },

    /// The configured device name is not present in the driver's registry.
    #[error("unknown device '{requested}', expected one of [{}]", .known.join(", "))]
    UnknownDevice {
        /// The device name the configuration asked for.
        requested: String,
        /// Every name the registry knows.
        known: Vec<String>,
    },

    /// The configuration object itself could not be read or parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to launch the browser process.
    #[error("failed to launch browser: {reason}")]
    LaunchFailed {
        /// Human-readable reason for the launch failure.
        reason: String,
        /// Optional underlying error that caused the failure.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A context or page operation failed inside the automation driver.
    #[error("driver error: {0}")]
    Driver(String),

    /// An operation was attempted on a browser that was already closed.
    #[error("browser instance is already closed")]
    AlreadyClosed,

    /// `setup()` was called twice on the same environment instance.
    #[error("setup() already ran for this environment instance")]
    SetupAlreadyRan,

    /// `teardown()` was called before `setup()`.
    #[error("teardown() called before setup()")]
    SetupNotRun,

    /// `teardown()` was called twice on the same environment instance.
    #[error("teardown() already ran for this environment instance")]
    TeardownAlreadyRan,

    /// Wraps errors from the chromiumoxide driver backend.
    #[error("chromiumoxide error: {0}")]
    ChromiumOxide(#[from] chromiumoxide::error::CdpError),

    /// Generic I/O errors (standard input, config files, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvError {
    /// Returns true for errors caused by the resolved configuration rather
    /// than the driver or the environment state machine.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EnvError::UnsupportedBrowser { .. }
                | EnvError::UnknownDevice { .. }
                | EnvError::InvalidConfig(_)
        )
    }
}
