//! SQL Server MCP Server
//!
//! Ad hoc SQL Server queries behind an access-control gate.
//! Read-only and pinned to a single database by default.

use mssql_mcp::MssqlMcpServer;

mcp_common::serve_stdio!(MssqlMcpServer, "mssql_mcp");
