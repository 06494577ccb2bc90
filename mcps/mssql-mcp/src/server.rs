//! SQL Server MCP Server implementation
//!
//! Tool definitions only; the gate and executor calls live in the handlers module.

use std::sync::Arc;

use anyhow::Context;
use mcp_common::{json_success, text_success, CallToolResult, McpError, ResultExt};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::config::MssqlConfig;
use crate::executor::{MssqlExecutor, SqlExecutor};
use crate::gate::PolicyConfig;
use crate::handlers;
use crate::params::*;

/// SQL Server MCP Server
#[derive(Clone)]
pub struct MssqlMcpServer {
    executor: Arc<dyn SqlExecutor>,
    policy: PolicyConfig,
    tool_router: ToolRouter<Self>,
}

impl MssqlMcpServer {
    /// Create a server from `~/.binks/mssql.toml` and `DB_*` variables.
    ///
    /// Fails when the configuration is unreadable or the access policy is
    /// incomplete. No connection is opened until the first tool call.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = MssqlConfig::load()?;
        let policy = config.policy().context("Invalid access policy")?;
        let executor = MssqlExecutor::new(&config.connection).context("Invalid connection settings")?;

        tracing::info!(
            data_source = %config.connection.data_source,
            pinned_database = policy.pinned_database(),
            multi_database = policy.allow_multi_database(),
            write = policy.allow_write(),
            "Access policy loaded"
        );

        Ok(Self::with_executor(Arc::new(executor), policy))
    }

    /// Create a server over any executor
    pub fn with_executor(executor: Arc<dyn SqlExecutor>, policy: PolicyConfig) -> Self {
        Self {
            executor,
            policy,
            tool_router: Self::tool_router(),
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }
}

// ============================================================================
// Tool Router - Each tool delegates to its handler
// ============================================================================

#[tool_router]
impl MssqlMcpServer {
    #[tool(description = "Get the list of available databases on the server. Only allowed when DB_ALLOW_MULTI is set to 'true'.")]
    async fn get_databases(&self) -> Result<CallToolResult, McpError> {
        let databases = handlers::get_databases(self.executor.as_ref(), &self.policy)
            .await
            .to_mcp_err()?;
        json_success(&databases)
    }

    #[tool(description = "Get the list of tables in a database.")]
    async fn get_database_tables(
        &self,
        Parameters(params): Parameters<DatabaseTablesParams>,
    ) -> Result<CallToolResult, McpError> {
        let tables = handlers::get_database_tables(self.executor.as_ref(), &self.policy, params)
            .await
            .to_mcp_err()?;
        json_success(&tables)
    }

    #[tool(description = "Get the list of columns in a table and their data types in CSV format.")]
    async fn get_table_columns(
        &self,
        Parameters(params): Parameters<TableColumnsParams>,
    ) -> Result<CallToolResult, McpError> {
        let csv = handlers::get_table_columns(self.executor.as_ref(), &self.policy, params)
            .await
            .to_mcp_err()?;
        Ok(text_success(csv))
    }

    #[tool(description = "Execute a single SELECT SQL query and return the result in CSV format (or JSON if requested).")]
    async fn execute_select(
        &self,
        Parameters(params): Parameters<ExecuteSelectParams>,
    ) -> Result<CallToolResult, McpError> {
        let output = handlers::execute_select(self.executor.as_ref(), &self.policy, params)
            .await
            .to_mcp_err()?;
        Ok(text_success(output))
    }

    #[tool(description = "Execute a single non-SELECT SQL statement and return the number of affected rows. Only allowed when DB_ALLOW_WRITE is set to 'true'.")]
    async fn execute_non_select(
        &self,
        Parameters(params): Parameters<ExecuteNonSelectParams>,
    ) -> Result<CallToolResult, McpError> {
        let affected = handlers::execute_non_select(self.executor.as_ref(), &self.policy, params)
            .await
            .to_mcp_err()?;
        json_success(&affected)
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for MssqlMcpServer {
    fn get_info(&self) -> ServerInfo {
        let access = if self.policy.allow_write() { "read-write" } else { "read-only" };
        let scope = if self.policy.allow_multi_database() {
            "multi-database".to_string()
        } else {
            format!("pinned to database '{}'", self.policy.pinned_database())
        };

        ServerInfo {
            instructions: Some(format!(
                "SQL Server query MCP server. Currently {}, {}. \
                 Use get_databases, get_database_tables and get_table_columns to explore the schema, \
                 execute_select for a single SELECT statement and execute_non_select for a single write statement. \
                 Statements containing ';' are rejected.",
                access, scope
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
