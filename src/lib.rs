//! Sitelens - MCP server for browser-driven web scraping with network capture
//!
//! This crate exposes a small set of MCP (Model Context Protocol) tools
//! that drive a headless Chromium browser over CDP: navigate to a URL,
//! extract the rendered HTML, list the network requests captured during
//! the page load, and close the session.
//!
//! # Architecture
//!
//! ```text
//! AI Agent ──▶ MCP stdio server ──▶ BrowserSession (CDP)
//!                    │                    │
//!                    ▼                    ▼
//!              ┌───────────┐       ┌─────────────┐
//!              │   Tools   │       │ NetworkLog  │◀── request/response
//!              └───────────┘       └─────────────┘     observer tasks
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sitelens::browser::{BrowserConfig, BrowserSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = BrowserSession::launch(BrowserConfig::default()).await?;
//!
//!     let outcome = session.navigate("https://example.com", 3.0).await?;
//!     println!("loaded {} ({} requests captured)",
//!         outcome.title, session.network_log().len());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod error;
pub mod mcp;

// Re-exports for convenience
pub use browser::{BrowserConfig, BrowserSession, NetworkLog, RequestFilter};
pub use error::{Error, Result};
pub use mcp::{McpServer, McpTool, ToolRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
