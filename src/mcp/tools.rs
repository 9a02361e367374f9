//! Tool definitions and the registry that executes them
//!
//! Four tools drive one shared browser session: navigate, extract the
//! rendered HTML, list the captured network requests, close the session.
//! Every result is a pretty-printed JSON text payload; every failure is
//! reported as a plain descriptive string in an `isError` result.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::browser::network::{RequestFilter, RequestRecord};
use crate::browser::{navigation, BrowserConfig, BrowserSession};
use crate::error::{Error, ProtocolError, Result};
use crate::mcp::types::{ToolCallResult, ToolDefinition};

/// Seconds to wait after page load when the caller does not say
pub const DEFAULT_WAIT_SECS: f64 = 3.0;

/// Names of all registered tools
pub const AVAILABLE_TOOLS: &[&str] = &[
    "navigate_to_url",
    "get_page_html",
    "get_network_requests",
    "close_browser",
];

/// A tool exposed through tools/list and tools/call
pub trait McpTool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;
    /// Tool description
    fn description(&self) -> &str;
    /// Input schema as JSON
    fn input_schema(&self) -> Value;
    /// Full definition for tools/list
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

type SharedSession = Arc<RwLock<Option<BrowserSession>>>;

/// Tool registry holding the shared browser session
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn McpTool>>,
    session: SharedSession,
    config: BrowserConfig,
}

impl ToolRegistry {
    /// Create a registry with the default browser configuration
    pub fn new() -> Self {
        Self::with_config(BrowserConfig::default())
    }

    /// Create a registry that launches its browser with `config`
    pub fn with_config(config: BrowserConfig) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
            session: Arc::new(RwLock::new(None)),
            config,
        };

        registry.register(Box::new(NavigateTool));
        registry.register(Box::new(PageHtmlTool));
        registry.register(Box::new(NetworkRequestsTool));
        registry.register(Box::new(CloseBrowserTool));

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Box<dyn McpTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// All tool definitions, for tools/list
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a tool by name
    #[instrument(skip(self, args))]
    pub async fn execute(&self, name: &str, args: Value) -> ToolCallResult {
        info!(tool = name, "executing tool");

        let result = match name {
            "navigate_to_url" => self.navigate(args).await,
            "get_page_html" => self.page_html().await,
            "get_network_requests" => self.network_requests(args).await,
            "close_browser" => self.close_browser().await,
            _ => Err(ProtocolError::ToolNotFound(name.to_string()).into()),
        };

        match result {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                error!(tool = name, "tool failed: {e}");
                ToolCallResult::error(format!("Error: {e}"))
            }
        }
    }

    async fn navigate(&self, args: Value) -> Result<String> {
        let url = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_input("missing required parameter: url"))?;
        let wait_time = args
            .get("wait_time")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_WAIT_SECS);

        navigation::validate_url(url)?;

        let mut slot = self.session.write().await;
        if slot.is_none() {
            *slot = Some(BrowserSession::launch(self.config.clone()).await?);
        }
        let Some(session) = slot.as_mut() else {
            return Err(Error::SessionNotReady);
        };

        let outcome = session.navigate(url, wait_time).await?;
        let captured = session.network_log().len();

        let report = NavigateReport {
            success: true,
            url: outcome.url,
            title: outcome.title,
            network_requests_captured: captured,
            message: format!(
                "Successfully navigated to {url}. Captured {captured} network requests."
            ),
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    async fn page_html(&self) -> Result<String> {
        let slot = self.session.read().await;
        let Some(session) = slot.as_ref() else {
            return Err(Error::SessionNotReady);
        };

        let (url, html) = session.page_html().await?;
        let html_length = html.len();

        let report = PageHtmlReport {
            success: true,
            url,
            html_length,
            html_content: html,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    async fn network_requests(&self, args: Value) -> Result<String> {
        let filter = match args.get("filter_type").and_then(Value::as_str) {
            Some(raw) => RequestFilter::from_str(raw)?,
            None => RequestFilter::All,
        };

        let slot = self.session.read().await;
        let (total, requests) = match slot.as_ref() {
            Some(session) => {
                let log = session.network_log();
                (log.len(), log.filtered(filter))
            }
            None => (0, Vec::new()),
        };

        let report = NetworkRequestsReport {
            success: true,
            total_requests: total,
            filtered_requests: requests.len(),
            filter_applied: filter.to_string(),
            requests,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    async fn close_browser(&self) -> Result<String> {
        let mut slot = self.session.write().await;
        if let Some(session) = slot.take() {
            session.close().await?;
        }
        Ok("Browser closed successfully".to_string())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tool reports
// ============================================================================

#[derive(Debug, Serialize)]
struct NavigateReport {
    success: bool,
    url: String,
    title: String,
    network_requests_captured: usize,
    message: String,
}

#[derive(Debug, Serialize)]
struct PageHtmlReport {
    success: bool,
    url: String,
    html_length: usize,
    html_content: String,
}

#[derive(Debug, Serialize)]
struct NetworkRequestsReport {
    success: bool,
    total_requests: usize,
    filtered_requests: usize,
    filter_applied: String,
    requests: Vec<RequestRecord>,
}

// ============================================================================
// Tool definitions
// ============================================================================

/// Navigate to a URL
struct NavigateTool;

impl McpTool for NavigateTool {
    fn name(&self) -> &str {
        "navigate_to_url"
    }

    fn description(&self) -> &str {
        "Navigate to a URL and capture the network requests made while the page loads"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to navigate to"
                },
                "wait_time": {
                    "type": "number",
                    "description": "Time to wait after page load (seconds)",
                    "default": 3
                }
            },
            "required": ["url"]
        })
    }
}

/// Fetch the current page's HTML
struct PageHtmlTool;

impl McpTool for PageHtmlTool {
    fn name(&self) -> &str {
        "get_page_html"
    }

    fn description(&self) -> &str {
        "Get the current page's HTML content"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }
}

/// List captured network requests
struct NetworkRequestsTool;

impl McpTool for NetworkRequestsTool {
    fn name(&self) -> &str {
        "get_network_requests"
    }

    fn description(&self) -> &str {
        "Get all captured network requests (XHR, API calls, etc.)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filter_type": {
                    "type": "string",
                    "enum": ["all", "xhr", "fetch"],
                    "description": "Filter by request type (xhr, fetch, all)",
                    "default": "all"
                }
            }
        })
    }
}

/// Close the browser session
struct CloseBrowserTool;

impl McpTool for CloseBrowserTool {
    fn name(&self) -> &str {
        "close_browser"
    }

    fn description(&self) -> &str {
        "Close the browser and cleanup resources"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }
}
