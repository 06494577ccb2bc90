//! SQL Server MCP Library
//!
//! Ad hoc SQL Server queries for agents, behind an access-control gate.
//! Every raw statement is classified and checked against a fixed
//! [`PolicyConfig`] before anything reaches the database:
//!
//! - one statement per request (any `;` is rejected)
//! - SELECT through `execute_select`, everything else through `execute_non_select`
//! - writes only when enabled
//! - a single pinned database unless multi-database mode is enabled
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use mssql_mcp::gate::{evaluate, PolicyConfig, StatementRequest};
//! use mssql_mcp::classifier::StatementKind;
//!
//! let policy = PolicyConfig::new(false, false, "Sales")?;
//! let request = StatementRequest::new("SELECT * FROM Sales.dbo.Orders", None)?;
//! let decision = evaluate(&request, StatementKind::Read, &policy);
//! ```

pub mod classifier;
pub mod config;
pub mod executor;
pub mod gate;
pub mod handlers;
pub mod params;
pub mod server;
pub mod tables;
pub mod types;

// Re-export main server type
pub use server::MssqlMcpServer;

// Re-export the gate surface
pub use classifier::{classify, Classification, StatementKind};
pub use gate::{evaluate, AccessDecision, Admission, DenialKind, PolicyConfig, StatementRequest};

// Re-export parameter types for direct API usage
pub use params::*;
