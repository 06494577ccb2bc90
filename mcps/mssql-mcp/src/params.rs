//! Parameter types for SQL Server MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::OutputFormat;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseTablesParams {
    #[schemars(
        description = "(Optional) The name of the database to get table information for. Ignored if DB_ALLOW_MULTI is not set to 'true'."
    )]
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct TableColumnsParams {
    #[schemars(description = "The name of the table to get column information for.")]
    pub table: String,

    #[schemars(
        description = "(Optional) The name of the database to get table information for. Ignored if DB_ALLOW_MULTI is not set to 'true'."
    )]
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteSelectParams {
    #[schemars(description = "The raw SQL query that should be executed. Must be a single SELECT statement.")]
    pub sql: String,

    #[schemars(
        description = "(Optional) The name of the database to perform the SQL operation in. Ignored if DB_ALLOW_MULTI is not set to 'true'."
    )]
    #[serde(default)]
    pub database: Option<String>,

    #[schemars(description = "(Optional) Result format: 'csv' (default) or 'json'.")]
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteNonSelectParams {
    #[schemars(description = "The raw SQL statement that should be executed. Must be a single non-SELECT statement.")]
    pub sql: String,

    #[schemars(
        description = "(Optional) The name of the database to perform the SQL operation in. Ignored if DB_ALLOW_MULTI is not set to 'true'."
    )]
    #[serde(default)]
    pub database: Option<String>,
}
