//! Statement execution against SQL Server
//!
//! [`SqlExecutor`] is the seam between the tool handlers and the database.
//! Handlers only call it after the gate has admitted a request.
//! [`MssqlExecutor`] opens a fresh connection per call and closes it on drop.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::config::ConnectionConfig;
use crate::types::{ColumnInfo, MssqlError, ResultSet};

const DEFAULT_PORT: u16 = 1433;

const LIST_DATABASES: &str = "SELECT name FROM sys.databases";
const LIST_TABLES: &str =
    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE'";
const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = @P1";
const TABLE_COLUMNS: &str =
    "SELECT COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = @P1";

pub type MssqlResult<T> = Result<T, MssqlError>;

/// Runs statements against a database server.
///
/// `database: Some(name)` switches the connection to `name` before running;
/// `None` keeps the connection's initial database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn list_databases(&self) -> MssqlResult<Vec<String>>;

    async fn list_tables(&self, database: Option<&str>) -> MssqlResult<Vec<String>>;

    async fn table_exists(&self, database: Option<&str>, table: &str) -> MssqlResult<bool>;

    async fn table_columns(&self, database: Option<&str>, table: &str)
        -> MssqlResult<Vec<ColumnInfo>>;

    /// Run a read statement and collect its first result set
    async fn query(&self, database: Option<&str>, sql: &str) -> MssqlResult<ResultSet>;

    /// Run a write statement and return the number of affected rows
    async fn execute(&self, database: Option<&str>, sql: &str) -> MssqlResult<u64>;
}

type Connection = Client<Compat<TcpStream>>;

/// [`SqlExecutor`] over a TDS connection
#[derive(Clone)]
pub struct MssqlExecutor {
    host: String,
    port: u16,
    initial_catalog: String,
    user: String,
    password: String,
    trust_server_certificate: bool,
    timeout: Duration,
}

impl MssqlExecutor {
    pub fn new(config: &ConnectionConfig) -> MssqlResult<Self> {
        let (host, port) = parse_data_source(&config.data_source)?;

        Ok(Self {
            host,
            port,
            initial_catalog: config.initial_catalog.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            trust_server_certificate: config.trust_server_certificate,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn connect(&self, database: Option<&str>) -> MssqlResult<Connection> {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.application_name("mssql-mcp");
        if !self.initial_catalog.is_empty() {
            config.database(&self.initial_catalog);
        }
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if self.trust_server_certificate {
            config.trust_cert();
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MssqlError::Connection(format!("{}:{}: {}", self.host, self.port, e)))?;
        tcp.set_nodelay(true)?;

        let mut client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| MssqlError::Connection(e.to_string()))?;

        if let Some(database) = database {
            tracing::debug!(database, "Switching database");
            client
                .simple_query(format!("USE {}", quote_identifier(database)))
                .await?
                .into_results()
                .await?;
        }

        Ok(client)
    }

    /// Bound a database round trip by the configured timeout
    async fn bounded<T>(&self, work: impl Future<Output = MssqlResult<T>>) -> MssqlResult<T> {
        tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_elapsed| MssqlError::Timeout(self.timeout.as_secs()))?
    }

    async fn fetch_first_column(
        &self,
        database: Option<&str>,
        sql: &str,
    ) -> MssqlResult<Vec<String>> {
        let mut client = self.connect(database).await?;
        let rows = client.simple_query(sql).await?.into_first_result().await?;

        rows.iter()
            .map(|row| -> MssqlResult<String> {
                Ok(row.try_get::<&str, _>(0)?.unwrap_or_default().to_string())
            })
            .collect()
    }

    async fn fetch_table_exists(&self, database: Option<&str>, table: &str) -> MssqlResult<bool> {
        let mut client = self.connect(database).await?;
        let mut query = Query::new(TABLE_EXISTS);
        query.bind(table);

        let count = match query.query(&mut client).await?.into_row().await? {
            Some(row) => row.try_get::<i32, _>(0)?.unwrap_or(0),
            None => 0,
        };
        Ok(count > 0)
    }

    async fn fetch_columns(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> MssqlResult<Vec<ColumnInfo>> {
        let mut client = self.connect(database).await?;
        let mut query = Query::new(TABLE_COLUMNS);
        query.bind(table);
        let rows = query.query(&mut client).await?.into_first_result().await?;

        rows.iter()
            .map(|row| -> MssqlResult<ColumnInfo> {
                Ok(ColumnInfo {
                    name: row.try_get::<&str, _>(0)?.unwrap_or_default().to_string(),
                    data_type: row.try_get::<&str, _>(1)?.unwrap_or_default().to_string(),
                })
            })
            .collect()
    }

    async fn fetch_result_set(&self, database: Option<&str>, sql: &str) -> MssqlResult<ResultSet> {
        let mut client = self.connect(database).await?;
        let mut stream = client.simple_query(sql).await?;

        let columns: Vec<String> = stream
            .columns()
            .await?
            .map(|columns| columns.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = stream
            .into_first_result()
            .await?
            .into_iter()
            .map(row_to_json)
            .collect();

        Ok(ResultSet::new(columns, rows))
    }

    async fn run_statement(&self, database: Option<&str>, sql: &str) -> MssqlResult<u64> {
        let mut client = self.connect(database).await?;
        let result = client.execute(sql, &[]).await?;
        Ok(result.total())
    }
}

#[async_trait]
impl SqlExecutor for MssqlExecutor {
    async fn list_databases(&self) -> MssqlResult<Vec<String>> {
        self.bounded(self.fetch_first_column(None, LIST_DATABASES)).await
    }

    async fn list_tables(&self, database: Option<&str>) -> MssqlResult<Vec<String>> {
        self.bounded(self.fetch_first_column(database, LIST_TABLES)).await
    }

    async fn table_exists(&self, database: Option<&str>, table: &str) -> MssqlResult<bool> {
        self.bounded(self.fetch_table_exists(database, table)).await
    }

    async fn table_columns(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> MssqlResult<Vec<ColumnInfo>> {
        self.bounded(self.fetch_columns(database, table)).await
    }

    async fn query(&self, database: Option<&str>, sql: &str) -> MssqlResult<ResultSet> {
        self.bounded(self.fetch_result_set(database, sql)).await
    }

    async fn execute(&self, database: Option<&str>, sql: &str) -> MssqlResult<u64> {
        self.bounded(self.run_statement(database, sql)).await
    }
}

/// Split `host[,port]`, dropping an optional `tcp:` prefix
fn parse_data_source(data_source: &str) -> MssqlResult<(String, u16)> {
    let source = data_source.trim();
    let source = source
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("tcp:"))
        .map_or(source, |_| &source[4..]);

    let (host, port) = match source.split_once(',') {
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|e| {
                MssqlError::Config(format!("Invalid port in data source '{}': {}", data_source, e))
            })?;
            (host.trim(), port)
        }
        None => (source, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(MssqlError::Config("Data source host is empty".to_string()));
    }

    Ok((host.to_string(), port))
}

/// Bracket-quote an identifier for `USE`
fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn row_to_json(row: Row) -> Vec<Value> {
    row.into_iter().map(cell_to_json).collect()
}

fn cell_to_json(data: ColumnData<'static>) -> Value {
    let value = match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v.map(|f| Value::from(f64::from(f))),
        ColumnData::F64(v) => v.map(Value::from),
        ColumnData::Bit(v) => v.map(Value::from),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Numeric(v) => v.map(|n| Value::String(n.to_string())),
        ColumnData::Binary(v) => v.map(|b| Value::String(format!("<blob {} bytes>", b.len()))),
        ColumnData::Xml(v) => v.map(|x| Value::String(x.into_owned().into_string())),
        temporal => temporal_to_json(&temporal),
    };

    value.unwrap_or(Value::Null)
}

/// Date and time columns, rendered as ISO 8601 strings
fn temporal_to_json(data: &ColumnData<'static>) -> Option<Value> {
    if let Ok(Some(v)) = chrono::NaiveDateTime::from_sql(data) {
        return Some(Value::String(v.to_string()));
    }
    if let Ok(Some(v)) = chrono::NaiveDate::from_sql(data) {
        return Some(Value::String(v.to_string()));
    }
    if let Ok(Some(v)) = chrono::NaiveTime::from_sql(data) {
        return Some(Value::String(v.to_string()));
    }
    if let Ok(Some(v)) = chrono::DateTime::<chrono::FixedOffset>::from_sql(data) {
        return Some(Value::String(v.to_rfc3339()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_source() {
        assert_eq!(parse_data_source("localhost").unwrap(), ("localhost".to_string(), 1433));
        assert_eq!(
            parse_data_source("db.internal,14330").unwrap(),
            ("db.internal".to_string(), 14330)
        );
        assert_eq!(
            parse_data_source("tcp:db.internal, 1500").unwrap(),
            ("db.internal".to_string(), 1500)
        );
        assert!(matches!(parse_data_source("db,notaport"), Err(MssqlError::Config(_))));
        assert!(matches!(parse_data_source("  "), Err(MssqlError::Config(_))));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Sales"), "[Sales]");
        assert_eq!(quote_identifier("odd]name"), "[odd]]name]");
    }

    #[test]
    fn test_cell_to_json() {
        assert_eq!(cell_to_json(ColumnData::I32(Some(7))), Value::from(7));
        assert_eq!(cell_to_json(ColumnData::I32(None)), Value::Null);
        assert_eq!(cell_to_json(ColumnData::Bit(Some(true))), Value::Bool(true));
        assert_eq!(
            cell_to_json(ColumnData::String(Some("Ada".into()))),
            Value::String("Ada".to_string())
        );
        assert_eq!(
            cell_to_json(ColumnData::Binary(Some(vec![1u8, 2, 3].into()))),
            Value::String("<blob 3 bytes>".to_string())
        );
    }
}
