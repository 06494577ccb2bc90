//! MCP Common - Shared utilities for MCP servers
//!
//! - **Initialization**: `serve_stdio!` builds `main` for a stdio server
//! - **Results**: helpers for `CallToolResult` responses
//! - **Errors**: conversion of server errors into MCP errors
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{json_success, ResultExt};
//!
//! // main.rs
//! mcp_common::serve_stdio!(MyServer, "my_mcp");
//!
//! // tool body
//! let rows = load_rows().to_mcp_err()?;
//! json_success(&rows)
//! ```

pub mod error;
pub mod init;
pub mod result;

// Re-export commonly used items at crate root
pub use error::{internal_error, invalid_params, invalid_request, IntoMcpError, McpResult, ResultExt};
pub use init::init_tracing;
pub use result::{json_success, text_success};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
