//! Device descriptors for viewport and user-agent emulation.
//!
//! A device descriptor is a named preset pairing a viewport size with a
//! user-agent string. The built-in registry covers common phones and
//! tablets; drivers may substitute their own registry.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A page viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: u32,
    /// Height in CSS pixels.
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A named device preset: viewport plus user-agent string.
///
/// Resolved either by looking up a name in the registry or accepted
/// verbatim when the configuration supplies the descriptor inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// The emulated viewport.
    pub viewport: Viewport,
    /// The emulated user-agent string.
    #[serde(rename = "userAgent")]
    pub user_agent: String,
}

impl DeviceDescriptor {
    /// Creates a descriptor from its parts.
    #[must_use]
    pub fn new(viewport: Viewport, user_agent: impl Into<String>) -> Self {
        Self {
            viewport,
            user_agent: user_agent.into(),
        }
    }
}

// BTreeMap keeps `names()` in a stable order for error messages.
static REGISTRY: Lazy<BTreeMap<&'static str, DeviceDescriptor>> = Lazy::new(|| {
    let mut registry = BTreeMap::new();
    registry.insert(
        "Galaxy S9+",
        DeviceDescriptor::new(
            Viewport::new(320, 658),
            "Mozilla/5.0 (Linux; Android 8.0.0; SM-G965U) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
        ),
    );
    registry.insert(
        "Pixel 5",
        DeviceDescriptor::new(
            Viewport::new(393, 851),
            "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
        ),
    );
    registry.insert(
        "iPad Pro 11",
        DeviceDescriptor::new(
            Viewport::new(834, 1194),
            "Mozilla/5.0 (iPad; CPU OS 17_2 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
        ),
    );
    registry.insert(
        "iPhone 11",
        DeviceDescriptor::new(
            Viewport::new(414, 896),
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
        ),
    );
    registry.insert(
        "iPhone 13",
        DeviceDescriptor::new(
            Viewport::new(390, 844),
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
        ),
    );
    registry
});

/// Looks up a built-in device descriptor by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static DeviceDescriptor> {
    REGISTRY.get(name)
}

/// Returns every built-in device name, in stable order.
#[must_use]
pub fn names() -> Vec<&'static str> {
    REGISTRY.keys().copied().collect()
}
