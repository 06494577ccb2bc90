//! Type definitions for the SQL Server MCP

use mcp_common::{internal_error, invalid_params, invalid_request, IntoMcpError, McpError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::gate::{DenialKind, EmptyStatement, PolicyConfigError};

// ============================================================================
// Response Types
// ============================================================================

/// Tabular result of a read statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
        }
    }

    /// Render as CSV: a header row of column names, then one record per row.
    /// NULL renders as an empty field.
    pub fn to_csv(&self) -> Result<String, MssqlError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        if !self.columns.is_empty() {
            writer.write_record(&self.columns)?;
        }
        for row in &self.rows {
            writer.write_record(row.iter().map(csv_field))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| MssqlError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| MssqlError::Serialization(e.to_string()))
    }
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Column name and type, as listed by `get_table_columns`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    #[serde(rename = "COLUMN_NAME")]
    pub name: String,
    #[serde(rename = "DATA_TYPE")]
    pub data_type: String,
}

impl From<Vec<ColumnInfo>> for ResultSet {
    fn from(columns: Vec<ColumnInfo>) -> Self {
        let rows = columns
            .into_iter()
            .map(|c| vec![Value::String(c.name), Value::String(c.data_type)])
            .collect();
        ResultSet::new(vec!["COLUMN_NAME".to_string(), "DATA_TYPE".to_string()], rows)
    }
}

/// Response for `execute_non_select`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedRows {
    pub affected_rows: u64,
}

/// Rendering of a SELECT result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum MssqlError {
    #[error(transparent)]
    EmptyStatement(#[from] EmptyStatement),

    #[error(transparent)]
    Denied(#[from] DenialKind),

    #[error("Table '{0}' does not exist.")]
    TableNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(#[from] tiberius::error::Error),

    #[error("Database operation timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<PolicyConfigError> for MssqlError {
    fn from(err: PolicyConfigError) -> Self {
        MssqlError::Config(err.to_string())
    }
}

impl From<csv::Error> for MssqlError {
    fn from(err: csv::Error) -> Self {
        MssqlError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for MssqlError {
    fn from(err: serde_json::Error) -> Self {
        MssqlError::Serialization(err.to_string())
    }
}

impl IntoMcpError for MssqlError {
    fn into_mcp_error(self) -> McpError {
        match self {
            MssqlError::Denied(denial) => invalid_request(
                denial.to_string(),
                Some(serde_json::json!({ "code": denial.code() })),
            ),
            MssqlError::EmptyStatement(_)
            | MssqlError::TableNotFound(_)
            | MssqlError::InvalidParams(_) => invalid_params(self.to_string()),
            MssqlError::Config(_)
            | MssqlError::Connection(_)
            | MssqlError::Query(_)
            | MssqlError::Timeout(_)
            | MssqlError::Io(_)
            | MssqlError::Serialization(_) => internal_error(self.to_string()),
        }
    }
}
