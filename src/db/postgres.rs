//! PostgreSQL client.

use super::{column_infos, decoded, format_query_error, map_connection_error};
use crate::config::ConnectionConfig;
use crate::db::{DatabaseBackend, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::{Column as SqlxColumn, Decode, Executor, Row as SqlxRow, Statement, Type, TypeInfo};
use std::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Opens a single-connection pool for the configured database.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
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

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes one cell by its Postgres type name.
///
/// NUMERIC and the temporal types are kept as their text form, so exact
/// decimals survive and dates show as written.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let value = match type_name {
        "BOOL" => cell::<bool>(row, index).map(Value::Bool),
        "INT2" => cell::<i16>(row, index).map(|v| Value::Int(v.into())),
        "INT4" => cell::<i32>(row, index).map(|v| Value::Int(v.into())),
        "INT8" => cell::<i64>(row, index).map(Value::Int),
        "FLOAT4" => cell::<f32>(row, index).map(|v| Value::Float(v.into())),
        "FLOAT8" => cell::<f64>(row, index).map(Value::Float),
        "NUMERIC" => cell::<Decimal>(row, index).map(Value::text),
        "DATE" => cell::<NaiveDate>(row, index).map(Value::text),
        "TIME" => cell::<NaiveTime>(row, index).map(Value::text),
        "TIMESTAMP" => cell::<NaiveDateTime>(row, index).map(Value::text),
        "TIMESTAMPTZ" => cell::<DateTime<Utc>>(row, index).map(Value::text),
        "BYTEA" => cell::<Vec<u8>>(row, index).map(Value::Bytes),
        _ => cell::<String>(row, index).map(Value::String),
    };
    value.unwrap_or_default()
}

/// A NULL cell and a cell that fails to decode both read as `None`; the
/// failure is logged.
fn cell<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    decoded(row.try_get::<Option<T>, _>(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running PostgreSQL database.
    // They are skipped unless DATABASE_URL points at one.

    async fn get_test_client() -> Option<PostgresClient> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let config = ConnectionConfig::from_connection_string(&url).ok()?;
        if config.backend != DatabaseBackend::Postgres {
            return None;
        }
        PostgresClient::connect(&config).await.ok()
    }

    #[tokio::test]
    async fn test_execute_select_query() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set to a PostgreSQL database");
            return;
        };

        let result = client
            .execute_query("SELECT 1::int4 AS num, 'Niterói'::text AS munic, 2.5::float8 AS v")
            .await
            .unwrap();

        assert_eq!(result.columns.len(), 3);
        assert_eq!(result.rows[0][0], Value::Int(1));
        assert_eq!(result.rows[0][1], Value::from("Niterói"));
        assert_eq!(result.rows[0][2], Value::Float(2.5));

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_numeric_and_dates_keep_their_text() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set to a PostgreSQL database");
            return;
        };

        let result = client
            .execute_query(
                "SELECT 12.50::numeric AS total, DATE '2024-01-15' AS dia, \
                 TIMESTAMP '2024-01-15 10:30:00' AS quando",
            )
            .await
            .unwrap();

        assert_eq!(result.rows[0][0], Value::from("12.50"));
        assert_eq!(result.rows[0][0].as_f64(), Some(12.5));
        assert_eq!(result.rows[0][1], Value::from("2024-01-15"));
        assert_eq!(result.rows[0][2], Value::from("2024-01-15 10:30:00"));

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set to a PostgreSQL database");
            return;
        };

        let result = client
            .execute_query("SELECT 'x'::text AS munic, 1::int4 AS roubo_comercio WHERE false")
            .await
            .unwrap();

        assert_eq!(result.row_count(), 0);
        let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["munic", "roubo_comercio"]);

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_query_with_error() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set to a PostgreSQL database");
            return;
        };

        let err = client
            .execute_query("SELECT * FROM nonexistent_table_xyz_123")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "Query Error");
        assert!(err.to_string().contains("does not exist"));

        client.close().await.unwrap();
    }
}
