//! Browser automation module
//!
//! High-level control of a chromiumoxide (CDP) browser: session
//! lifecycle, navigation, and network request capture.

pub mod controller;
pub mod navigation;
pub mod network;

pub use controller::{BrowserConfig, BrowserConfigBuilder, BrowserSession};
pub use navigation::{validate_url, NavigationOutcome, NAVIGATION_TIMEOUT_MS};
pub use network::{
    NetworkLog, NetworkMonitor, RequestFilter, RequestRecord, ResponseRecord,
    BINARY_BODY_PLACEHOLDER,
};
