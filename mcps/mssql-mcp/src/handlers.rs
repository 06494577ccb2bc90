//! Tool handlers
//!
//! Each handler validates its input, consults the gate, and only then calls
//! the executor. Nothing reaches the executor once the gate has denied.

use crate::classifier::StatementKind;
use crate::executor::{MssqlResult, SqlExecutor};
use crate::gate::{
    check_database_listing, evaluate, resolve_database, Admission, DenialKind, PolicyConfig,
    StatementRequest,
};
use crate::params::*;
use crate::types::{AffectedRows, MssqlError, OutputFormat, ResultSet};

// ============================================================================
// Helper Functions
// ============================================================================

fn denied(denial: DenialKind) -> MssqlError {
    tracing::warn!(code = denial.code(), "Request denied: {}", denial);
    MssqlError::Denied(denial)
}

/// Run a raw statement through the gate
fn admit(
    sql: &str,
    database: Option<&str>,
    expected: StatementKind,
    policy: &PolicyConfig,
) -> MssqlResult<Admission> {
    let request = StatementRequest::new(sql, database)?;
    let admission = evaluate(&request, expected, policy)
        .into_result()
        .map_err(denied)?;

    tracing::debug!(
        kind = expected.as_str(),
        database = admission.database.as_deref().unwrap_or("<default>"),
        "Statement admitted"
    );
    Ok(admission)
}

// ============================================================================
// Handler Functions
// ============================================================================

pub async fn get_databases(
    executor: &dyn SqlExecutor,
    policy: &PolicyConfig,
) -> MssqlResult<Vec<String>> {
    check_database_listing(policy).map_err(denied)?;
    executor.list_databases().await
}

pub async fn get_database_tables(
    executor: &dyn SqlExecutor,
    policy: &PolicyConfig,
    params: DatabaseTablesParams,
) -> MssqlResult<Vec<String>> {
    let database = resolve_database(params.database.as_deref(), policy);
    executor.list_tables(database.as_deref()).await
}

/// Columns of `params.table` as CSV (`COLUMN_NAME,DATA_TYPE`)
pub async fn get_table_columns(
    executor: &dyn SqlExecutor,
    policy: &PolicyConfig,
    params: TableColumnsParams,
) -> MssqlResult<String> {
    let table = params.table.trim();
    if table.is_empty() {
        return Err(MssqlError::InvalidParams("table cannot be empty".to_string()));
    }

    let database = resolve_database(params.database.as_deref(), policy);
    if !executor.table_exists(database.as_deref(), table).await? {
        return Err(MssqlError::TableNotFound(table.to_string()));
    }

    let columns = executor.table_columns(database.as_deref(), table).await?;
    ResultSet::from(columns).to_csv()
}

/// Result of a single SELECT, rendered as CSV or JSON
pub async fn execute_select(
    executor: &dyn SqlExecutor,
    policy: &PolicyConfig,
    params: ExecuteSelectParams,
) -> MssqlResult<String> {
    let admission = admit(
        &params.sql,
        params.database.as_deref(),
        StatementKind::Read,
        policy,
    )?;

    let result = executor
        .query(admission.database.as_deref(), &admission.sql)
        .await
        .inspect_err(|e| tracing::warn!("Query failed: {}", e))?;

    match params.format.unwrap_or_default() {
        OutputFormat::Csv => result.to_csv(),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&result)?),
    }
}

pub async fn execute_non_select(
    executor: &dyn SqlExecutor,
    policy: &PolicyConfig,
    params: ExecuteNonSelectParams,
) -> MssqlResult<AffectedRows> {
    let admission = admit(
        &params.sql,
        params.database.as_deref(),
        StatementKind::Write,
        policy,
    )?;

    let affected_rows = executor
        .execute(admission.database.as_deref(), &admission.sql)
        .await
        .inspect_err(|e| tracing::warn!("Statement failed: {}", e))?;

    Ok(AffectedRows { affected_rows })
}
