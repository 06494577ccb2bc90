//! Tool handler tests over an in-memory executor
//!
//! The recording executor lets each test assert what reached the database
//! layer: nothing on denial, the trimmed SQL and resolved database on admission.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mssql_mcp::executor::{MssqlResult, SqlExecutor};
use mssql_mcp::handlers;
use mssql_mcp::types::{ColumnInfo, MssqlError, OutputFormat, ResultSet};
use mssql_mcp::{
    DatabaseTablesParams, DenialKind, ExecuteNonSelectParams, ExecuteSelectParams, MssqlMcpServer,
    PolicyConfig, TableColumnsParams,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    ListDatabases,
    ListTables(Option<String>),
    TableExists(Option<String>, String),
    TableColumns(Option<String>, String),
    Query(Option<String>, String),
    Execute(Option<String>, String),
}

#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    tables: Vec<String>,
}

impl RecordingExecutor {
    fn with_tables(tables: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            tables: tables.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

fn owned(database: Option<&str>) -> Option<String> {
    database.map(str::to_string)
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn list_databases(&self) -> MssqlResult<Vec<String>> {
        self.record(Call::ListDatabases);
        Ok(vec!["master".to_string(), "Sales".to_string()])
    }

    async fn list_tables(&self, database: Option<&str>) -> MssqlResult<Vec<String>> {
        self.record(Call::ListTables(owned(database)));
        Ok(self.tables.clone())
    }

    async fn table_exists(&self, database: Option<&str>, table: &str) -> MssqlResult<bool> {
        self.record(Call::TableExists(owned(database), table.to_string()));
        Ok(self.tables.iter().any(|t| t == table))
    }

    async fn table_columns(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> MssqlResult<Vec<ColumnInfo>> {
        self.record(Call::TableColumns(owned(database), table.to_string()));
        Ok(vec![
            ColumnInfo {
                name: "OrderId".to_string(),
                data_type: "int".to_string(),
            },
            ColumnInfo {
                name: "Customer".to_string(),
                data_type: "nvarchar".to_string(),
            },
        ])
    }

    async fn query(&self, database: Option<&str>, sql: &str) -> MssqlResult<ResultSet> {
        self.record(Call::Query(owned(database), sql.to_string()));
        Ok(ResultSet::new(
            vec!["OrderId".to_string(), "Customer".to_string()],
            vec![vec![json!(1), json!("Ada")], vec![json!(2), json!(null)]],
        ))
    }

    async fn execute(&self, database: Option<&str>, sql: &str) -> MssqlResult<u64> {
        self.record(Call::Execute(owned(database), sql.to_string()));
        Ok(3)
    }
}

fn pinned_sales(allow_write: bool) -> PolicyConfig {
    PolicyConfig::new(false, allow_write, "Sales").unwrap()
}

fn multi(allow_write: bool) -> PolicyConfig {
    PolicyConfig::new(true, allow_write, "Sales").unwrap()
}

fn select(sql: &str, database: Option<&str>) -> ExecuteSelectParams {
    ExecuteSelectParams {
        sql: sql.to_string(),
        database: owned(database),
        format: None,
    }
}

fn non_select(sql: &str, database: Option<&str>) -> ExecuteNonSelectParams {
    ExecuteNonSelectParams {
        sql: sql.to_string(),
        database: owned(database),
    }
}

// ============================================================================
// get_databases
// ============================================================================

#[tokio::test]
async fn get_databases_denied_without_multi_db() {
    let executor = RecordingExecutor::default();
    let result = handlers::get_databases(&executor, &pinned_sales(false)).await;

    assert!(matches!(
        result,
        Err(MssqlError::Denied(DenialKind::MultiDatabaseNotAllowed))
    ));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn get_databases_lists_in_multi_db_mode() {
    let executor = RecordingExecutor::default();
    let databases = handlers::get_databases(&executor, &multi(false)).await.unwrap();

    assert_eq!(databases, vec!["master", "Sales"]);
    assert_eq!(executor.calls(), vec![Call::ListDatabases]);
}

// ============================================================================
// get_database_tables / get_table_columns
// ============================================================================

#[tokio::test]
async fn get_database_tables_ignores_requested_database_when_pinned() {
    let executor = RecordingExecutor::with_tables(&["Orders"]);
    let params = DatabaseTablesParams {
        database: Some("Other".to_string()),
    };

    let tables = handlers::get_database_tables(&executor, &pinned_sales(false), params)
        .await
        .unwrap();

    assert_eq!(tables, vec!["Orders"]);
    assert_eq!(executor.calls(), vec![Call::ListTables(Some("Sales".to_string()))]);
}

#[tokio::test]
async fn get_database_tables_switches_database_in_multi_db_mode() {
    let executor = RecordingExecutor::with_tables(&["Reports"]);
    let params = DatabaseTablesParams {
        database: Some("Reporting".to_string()),
    };

    handlers::get_database_tables(&executor, &multi(false), params)
        .await
        .unwrap();

    assert_eq!(
        executor.calls(),
        vec![Call::ListTables(Some("Reporting".to_string()))]
    );
}

#[tokio::test]
async fn get_table_columns_returns_csv() {
    let executor = RecordingExecutor::with_tables(&["Orders"]);
    let params = TableColumnsParams {
        table: "Orders".to_string(),
        database: None,
    };

    let csv = handlers::get_table_columns(&executor, &pinned_sales(false), params)
        .await
        .unwrap();

    assert_eq!(csv, "COLUMN_NAME,DATA_TYPE\nOrderId,int\nCustomer,nvarchar\n");
}

#[tokio::test]
async fn get_table_columns_unknown_table() {
    let executor = RecordingExecutor::with_tables(&["Orders"]);
    let params = TableColumnsParams {
        table: "Missing".to_string(),
        database: None,
    };

    let err = handlers::get_table_columns(&executor, &pinned_sales(false), params)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Table 'Missing' does not exist.");
    assert_eq!(
        executor.calls(),
        vec![Call::TableExists(Some("Sales".to_string()), "Missing".to_string())]
    );
}

#[tokio::test]
async fn get_table_columns_rejects_blank_table() {
    let executor = RecordingExecutor::default();
    let params = TableColumnsParams {
        table: "  ".to_string(),
        database: None,
    };

    let result = handlers::get_table_columns(&executor, &pinned_sales(false), params).await;

    assert!(matches!(result, Err(MssqlError::InvalidParams(_))));
    assert!(executor.calls().is_empty());
}

// ============================================================================
// execute_select
// ============================================================================

#[tokio::test]
async fn execute_select_passes_trimmed_sql_and_pinned_database() {
    let executor = RecordingExecutor::default();
    let params = select("  SELECT * FROM Sales.dbo.Orders \n", Some("Other"));

    let csv = handlers::execute_select(&executor, &pinned_sales(false), params)
        .await
        .unwrap();

    assert_eq!(csv, "OrderId,Customer\n1,Ada\n2,\n");
    assert_eq!(
        executor.calls(),
        vec![Call::Query(
            Some("Sales".to_string()),
            "SELECT * FROM Sales.dbo.Orders".to_string()
        )]
    );
}

#[tokio::test]
async fn execute_select_json_format() {
    let executor = RecordingExecutor::default();
    let mut params = select("SELECT * FROM Orders", None);
    params.format = Some(OutputFormat::Json);

    let output = handlers::execute_select(&executor, &pinned_sales(false), params)
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["columns"], json!(["OrderId", "Customer"]));
    assert_eq!(value["rows"], json!([[1, "Ada"], [2, null]]));
    assert_eq!(value["row_count"], json!(2));
}

#[tokio::test]
async fn execute_select_denials_never_reach_executor() {
    let executor = RecordingExecutor::default();
    let policy = pinned_sales(true);

    let cases = [
        ("SELECT 1; DROP TABLE Orders", "multi_statement_not_allowed"),
        ("SELECT 1;", "multi_statement_not_allowed"),
        ("DELETE FROM Orders", "wrong_operation_kind"),
        ("SELECT * FROM Other.dbo.Orders", "cross_database_reference_detected"),
        ("SELECT * FROM [Other].[dbo].[Orders]", "cross_database_reference_detected"),
    ];

    for (sql, code) in cases {
        match handlers::execute_select(&executor, &policy, select(sql, None)).await {
            Err(MssqlError::Denied(denial)) => assert_eq!(denial.code(), code, "{sql:?}"),
            other => panic!("expected denial for {sql:?}, got {other:?}"),
        }
    }

    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn execute_select_rejects_blank_sql() {
    let executor = RecordingExecutor::default();
    let result = handlers::execute_select(&executor, &pinned_sales(false), select(" \n ", None)).await;

    assert!(matches!(result, Err(MssqlError::EmptyStatement(_))));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn execute_select_multi_db_trusts_caller() {
    let executor = RecordingExecutor::default();
    let params = select("SELECT * FROM Other.dbo.Orders", Some("Reporting"));

    handlers::execute_select(&executor, &multi(false), params)
        .await
        .unwrap();

    assert_eq!(
        executor.calls(),
        vec![Call::Query(
            Some("Reporting".to_string()),
            "SELECT * FROM Other.dbo.Orders".to_string()
        )]
    );
}

// ============================================================================
// execute_non_select
// ============================================================================

#[tokio::test]
async fn execute_non_select_denied_when_writes_disabled() {
    let executor = RecordingExecutor::default();
    let result =
        handlers::execute_non_select(&executor, &pinned_sales(false), non_select("DELETE FROM Orders", None))
            .await;

    assert!(matches!(
        result,
        Err(MssqlError::Denied(DenialKind::WriteNotAllowed))
    ));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn execute_non_select_rejects_select() {
    let executor = RecordingExecutor::default();
    let result =
        handlers::execute_non_select(&executor, &pinned_sales(true), non_select("select 1", None)).await;

    match result {
        Err(MssqlError::Denied(denial)) => {
            assert_eq!(denial.to_string(), "Only non-SELECT queries are supported in this method.")
        }
        other => panic!("expected denial, got {other:?}"),
    }
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn execute_non_select_reports_affected_rows() {
    let executor = RecordingExecutor::default();
    let affected = handlers::execute_non_select(
        &executor,
        &pinned_sales(true),
        non_select("UPDATE dbo.Orders SET Customer = 'Ada'", None),
    )
    .await
    .unwrap();

    assert_eq!(serde_json::to_value(affected).unwrap(), json!({ "affectedRows": 3 }));
    assert_eq!(
        executor.calls(),
        vec![Call::Execute(
            Some("Sales".to_string()),
            "UPDATE dbo.Orders SET Customer = 'Ada'".to_string()
        )]
    );
}

#[tokio::test]
async fn execute_non_select_cross_database_denied() {
    let executor = RecordingExecutor::default();
    let result = handlers::execute_non_select(
        &executor,
        &pinned_sales(true),
        non_select("DELETE FROM Other.dbo.Orders WHERE id = 1", None),
    )
    .await;

    match result {
        Err(MssqlError::Denied(DenialKind::CrossDatabaseReferenceDetected { database, pinned })) => {
            assert_eq!(database, "Other");
            assert_eq!(pinned, "Sales");
        }
        other => panic!("expected cross-database denial, got {other:?}"),
    }
    assert!(executor.calls().is_empty());
}

// ============================================================================
// Server
// ============================================================================

#[test]
fn server_builds_over_any_executor() {
    let server = MssqlMcpServer::with_executor(Arc::new(RecordingExecutor::default()), multi(true));
    assert!(server.policy().allow_write());
    assert!(server.policy().allow_multi_database());
}
