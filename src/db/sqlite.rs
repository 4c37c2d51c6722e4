//! SQLite database client implementation.
//!
//! Lets the report run against a local file (and backs the integration tests).

use super::{column_infos, decoded, format_query_error, map_connection_error};
use crate::config::ConnectionConfig;
use crate::db::{DatabaseBackend, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Decode, Executor, Row as SqlxRow, Statement, Type, TypeInfo};
use std::time::Instant;
use tracing::debug;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens an existing database file. The file is never created.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReportError::query(format_query_error(e)))?;

        // An empty table still has columns; the prepared statement knows them.
        let columns = match result.first() {
            Some(row) => column_infos(row.columns()),
            None => {
                let statement = self
                    .pool
                    .prepare(sql)
                    .await
                    .map_err(|e| ReportError::query(format_query_error(e)))?;
                column_infos(statement.columns())
            }
        };

        let rows: Vec<Row> = result.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// SQLite is dynamically typed: the declared type is only a hint, so cells of
/// any other declared type fall back through integer, real and text.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    let value = match type_name {
        "NULL" => None,
        "BOOLEAN" => cell::<bool>(row, index).map(Value::Bool),
        "BLOB" => cell::<Vec<u8>>(row, index).map(Value::Bytes),
        "TEXT" => cell::<String>(row, index).map(Value::String),
        _ => match row.try_get::<Option<i64>, _>(index) {
            Ok(v) => v.map(Value::Int),
            Err(_) => match row.try_get::<Option<f64>, _>(index) {
                Ok(v) => v.map(Value::Float),
                Err(_) => decoded(row.try_get_unchecked::<Option<String>, _>(index))
                    .map(Value::String),
            },
        },
    };
    value.unwrap_or_default()
}

fn cell<'r, T>(row: &'r SqliteRow, index: usize) -> Option<T>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    decoded(row.try_get::<Option<T>, _>(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_client(dir: &tempfile::TempDir) -> SqliteClient {
        let path = dir.path().join("report.db");
        let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (munic TEXT, total INTEGER, taxa REAL, obs TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES ('Niterói', 120, 3.5, NULL)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let config = ConnectionConfig {
            backend: DatabaseBackend::Sqlite,
            database: Some(path.display().to_string()),
            ..Default::default()
        };
        SqliteClient::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_execute_select_converts_types() {
        let dir = tempfile::tempdir().unwrap();
        let client = seeded_client(&dir).await;

        let result = client.execute_query("SELECT * FROM t").await.unwrap();

        let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["munic", "total", "taxa", "obs"]);
        assert_eq!(
            result.rows[0],
            vec![
                Value::from("Niterói"),
                Value::Int(120),
                Value::Float(3.5),
                Value::Null
            ]
        );

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_table_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let client = seeded_client(&dir).await;

        let result = client
            .execute_query("SELECT * FROM t WHERE total < 0")
            .await
            .unwrap();

        assert_eq!(result.row_count(), 0);
        let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["munic", "total", "taxa", "obs"]);

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_table_is_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = seeded_client(&dir).await;

        let err = client
            .execute_query("SELECT * FROM \"basedp\"")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "Query Error");
        assert!(err.to_string().contains("no such table"));

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectionConfig {
            backend: DatabaseBackend::Sqlite,
            database: Some(dir.path().join("absent.db").display().to_string()),
            ..Default::default()
        };

        let err = SqliteClient::connect(&config).await.unwrap_err();
        assert_eq!(err.category(), "Connection Error");
    }
}
