//! Model Context Protocol (MCP) server module
//!
//! The stdio JSON-RPC server and the tool surface it exposes to calling
//! agents.

mod server;
mod tools;
/// MCP protocol types
pub mod types;

pub use server::McpServer;
pub use tools::{McpTool, ToolRegistry, AVAILABLE_TOOLS, DEFAULT_WAIT_SECS};
pub use types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolCallResult, ToolContent, ToolDefinition, PROTOCOL_VERSION,
};
