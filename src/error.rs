//! Error types for Sitelens
//!
//! Every failure is typed here and only converted to a plain text message
//! at the tool boundary, where the MCP result carries it back to the
//! calling agent.

use thiserror::Error;

/// The main error type for Sitelens operations
#[derive(Error, Debug)]
pub enum Error {
    /// A tool was called with arguments it cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A tool needs a loaded page but none has been navigated to yet
    #[error("No page loaded. Use navigate_to_url first.")]
    SessionNotReady,

    /// Browser lifecycle errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// MCP protocol errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch the browser process
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to open a page
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// The session was already closed
    #[error("Browser already closed")]
    AlreadyClosed,
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// The URL did not pass validation
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The navigation deadline expired
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// The page failed to load
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Malformed JSON-RPC request
    #[error("Invalid JSON-RPC request: {0}")]
    InvalidRequest(String),

    /// Unknown JSON-RPC method
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Parameters did not match the method's shape
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// No tool registered under the requested name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}

/// Result type alias for Sitelens operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid-input error from a string
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}
