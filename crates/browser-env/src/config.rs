//! Resolved configuration for one environment setup.
//!
//! Configuration loading proper is a collaborator concern; this module
//! defines the resolved shape the environment consumes — browser selection,
//! device selection, context options, and launch options — plus thin JSON
//! helpers. The resolved object is immutable for the duration of one
//! `setup` call.

use crate::devices::{DeviceDescriptor, Viewport};
use crate::error::{EnvError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The browser engines a configuration may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chromium-based browsers (the default).
    Chromium,
    /// Firefox.
    Firefox,
    /// WebKit.
    Webkit,
}

impl BrowserKind {
    /// Every kind a configuration may name, whether or not the active
    /// driver supports it.
    pub const ALL: [BrowserKind; 3] =
        [BrowserKind::Chromium, BrowserKind::Firefox, BrowserKind::Webkit];

    /// Returns the lowercase identifier used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device selection: either a registry name or an inline descriptor.
///
/// Untagged so a configuration file may write either
/// `"device": "Pixel 5"` or
/// `"device": {"viewport": {...}, "userAgent": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSelection {
    /// A named device to resolve against the driver's registry.
    Name(String),
    /// An inline descriptor accepted verbatim.
    Descriptor(DeviceDescriptor),
}

/// Options applied when creating a browsing context.
///
/// Viewport and user-agent are modeled explicitly because device merging
/// writes them; everything else passes through to the driver untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Viewport override, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,

    /// User-agent override, if any.
    #[serde(default, rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Driver-specific options passed through opaquely.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContextOptions {
    /// Overlays a device descriptor's viewport and user-agent onto these
    /// options. Descriptor values win over previously set ones.
    pub fn merge_device(&mut self, descriptor: &DeviceDescriptor) {
        self.viewport = Some(descriptor.viewport);
        self.user_agent = Some(descriptor.user_agent.clone());
    }
}

/// Options applied when launching the browser process.
///
/// Ignored on reuse: when a worker's browser is already running, a later
/// setup's launch options have no effect until the process restarts
/// (first launch wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Run without a visible window (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Open devtools for new tabs, useful together with the pause
    /// primitive (default: false).
    #[serde(default)]
    pub devtools: bool,

    /// Additional browser process arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Browser executable path (None = auto-detect).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Driver-specific options passed through opaquely.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_headless() -> bool {
    true
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            devtools: false,
            args: Vec::new(),
            executable: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// The configuration object resolved once per `setup` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Browser selection; Chromium when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserKind>,

    /// Device selection; absent means context options are used as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceSelection>,

    /// Context creation options.
    #[serde(default)]
    pub context: ContextOptions,

    /// Browser launch options.
    #[serde(default)]
    pub launch: LaunchOptions,
}

impl ResolvedConfig {
    /// Returns the effective browser kind.
    #[must_use]
    pub fn browser_kind(&self) -> BrowserKind {
        self.browser.unwrap_or(BrowserKind::Chromium)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the JSON does not match the schema.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EnvError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be read, or
    /// `InvalidConfig` when it does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
