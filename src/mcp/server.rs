//! MCP stdio server
//!
//! Reads JSON-RPC requests line by line from stdin and writes responses
//! to stdout. Logging must stay on stderr: stdout is the transport.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, ProtocolError, Result};
use crate::mcp::tools::ToolRegistry;
use crate::mcp::types::{
    JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo, ToolCallParams,
    PROTOCOL_VERSION,
};

/// MCP server state
pub struct McpServer {
    tools: ToolRegistry,
    info: ServerInfo,
    initialized: RwLock<bool>,
}

impl McpServer {
    /// Create a server with a default tool registry
    pub fn new() -> Self {
        Self::with_registry(ToolRegistry::new())
    }

    /// Create a server around an existing registry
    pub fn with_registry(tools: ToolRegistry) -> Self {
        Self {
            tools,
            info: ServerInfo::default(),
            initialized: RwLock::new(false),
        }
    }

    /// Run the stdio loop until stdin reaches EOF
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<()> {
        info!("starting MCP server: {} v{}", self.info.name, self.info.version);

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("failed to read line: {}", e);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            debug!("received: {}", line);

            if let Some(resp) = self.handle_line(&line).await {
                let payload = serde_json::to_string(&resp).unwrap_or_else(|e| {
                    error!("failed to serialize response: {}", e);
                    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"}}"#
                        .to_string()
                });

                debug!("sending: {}", payload);

                if let Err(e) = writeln!(stdout, "{}", payload) {
                    error!("failed to write response: {}", e);
                }
                if let Err(e) = stdout.flush() {
                    error!("failed to flush stdout: {}", e);
                }
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!("failed to parse request: {}", e);
                return Some(JsonRpcResponse::parse_error());
            }
        };

        self.handle_request(request).await
    }

    /// Dispatch a request. Notifications return None.
    #[instrument(skip(self, request))]
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        let method = request.method.as_str();

        debug!("handling method: {}", method);

        let result = match method {
            "initialize" => self.handle_initialize(request.params).await,
            // Clients send either form of the initialized notification.
            "initialized" | "notifications/initialized" => return None,
            "shutdown" => self.handle_shutdown().await,

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params).await,

            "ping" => Ok(json!({ "pong": true })),

            _ => {
                warn!("unknown method: {}", method);
                return Some(JsonRpcResponse::method_not_found(id, method));
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(Error::Protocol(ProtocolError::InvalidParams(msg))) => {
                JsonRpcResponse::invalid_params(id, &msg)
            }
            Err(e) => JsonRpcResponse::internal_error(id, &e.to_string()),
        })
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        info!("handling initialize");

        if let Some(version) = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
        {
            debug!("client protocol version: {}", version);
        }

        *self.initialized.write().await = true;

        Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": self.info
        }))
    }

    async fn handle_shutdown(&self) -> Result<Value> {
        info!("handling shutdown");
        *self.initialized.write().await = false;
        Ok(json!(null))
    }

    async fn handle_tools_list(&self) -> Result<Value> {
        Ok(json!({
            "tools": self.tools.definitions()
        }))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value> {
        let params =
            params.ok_or_else(|| ProtocolError::InvalidParams("missing params".to_string()))?;

        let call: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| ProtocolError::InvalidParams(e.to_string()))?;

        let result = self.tools.execute(&call.name, call.arguments).await;

        Ok(serde_json::to_value(result)?)
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: &str, params: Option<Value>, id: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }

    #[tokio::test]
    async fn test_handle_ping() {
        let server = McpServer::new();
        let response = server
            .handle_request(request("ping", None, Some(json!(1))))
            .await
            .unwrap();
        assert!(response.result.unwrap()["pong"].as_bool().unwrap());
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let server = McpServer::new();
        let response = server
            .handle_request(request(
                "initialize",
                Some(json!({ "protocolVersion": "2024-11-05" })),
                Some(json!(1)),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"].is_object());
        assert_eq!(result["serverInfo"]["name"], "sitelens");
        assert!(*server.initialized.read().await);
    }

    #[tokio::test]
    async fn test_handle_shutdown_clears_initialized() {
        let server = McpServer::new();
        server
            .handle_request(request("initialize", None, Some(json!(1))))
            .await;
        server
            .handle_request(request("shutdown", None, Some(json!(2))))
            .await;
        assert!(!*server.initialized.read().await);
    }

    #[tokio::test]
    async fn test_handle_tools_list() {
        let server = McpServer::new();
        let response = server
            .handle_request(request("tools/list", None, Some(json!(2))))
            .await
            .unwrap();

        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 4);
        for tool in tools {
            assert!(tool["name"].is_string());
            assert!(tool["inputSchema"].is_object());
        }
    }

    #[tokio::test]
    async fn test_handle_unknown_method() {
        let server = McpServer::new();
        let response = server
            .handle_request(request("resources/list", None, Some(json!(3))))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_initialized_notification_gets_no_response() {
        let server = McpServer::new();
        assert!(server
            .handle_request(request("initialized", None, None))
            .await
            .is_none());
        assert!(server
            .handle_request(request("notifications/initialized", None, None))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_tools_call_without_params() {
        let server = McpServer::new();
        let response = server
            .handle_request(request("tools/call", None, Some(json!(4))))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_tool_error_not_rpc_error() {
        // Tool-level failures travel inside the result as isError content,
        // not as JSON-RPC faults.
        let server = McpServer::new();
        let response = server
            .handle_request(request(
                "tools/call",
                Some(json!({ "name": "no_such_tool", "arguments": {} })),
                Some(json!(5)),
            ))
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_handle_parse_error() {
        let server = McpServer::new();
        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
    }
}
