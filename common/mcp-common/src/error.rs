//! Error mapping for MCP servers
//!
//! Server crates implement [`IntoMcpError`] for their own error enum, choosing
//! per variant between a client error (`invalid_params`, `invalid_request`)
//! and `internal_error`, then use [`ResultExt::to_mcp_err`] in tool bodies.

use rmcp::ErrorData as McpError;

/// Type alias for MCP tool results
pub type McpResult<T> = Result<T, McpError>;

/// Conversion into an MCP error
pub trait IntoMcpError {
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for McpError {
    fn into_mcp_error(self) -> McpError {
        self
    }
}

impl IntoMcpError for std::io::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("IO error: {}", self))
    }
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("JSON error: {}", self))
    }
}

impl IntoMcpError for anyhow::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("{:#}", self))
    }
}

/// `to_mcp_err()` for any `Result` whose error implements [`IntoMcpError`]
pub trait ResultExt<T> {
    fn to_mcp_err(self) -> McpResult<T>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> McpResult<T> {
        self.map_err(IntoMcpError::into_mcp_error)
    }
}

/// Server-side failure (connectivity, serialization, timeouts)
pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

/// Bad input from the caller
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}

/// Well-formed request the server refuses to run, with optional structured data
pub fn invalid_request(message: impl Into<String>, data: Option<serde_json::Value>) -> McpError {
    McpError::invalid_request(message.into(), data)
}
