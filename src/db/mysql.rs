//! MySQL / MariaDB client, the report's home database.

use super::{column_infos, decoded, format_query_error, map_connection_error};
use crate::config::ConnectionConfig;
use crate::db::{DatabaseBackend, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySql, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Decode, Executor, Row as SqlxRow, Statement, Type, TypeInfo};
use std::time::Instant;
use tracing::debug;

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Opens a single-connection pool for the configured database.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Mysql
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

fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes one cell by its MySQL type name.
///
/// DECIMAL travels as text on the wire, so it is read unchecked as a string
/// and parsed later where a number is needed. Temporal types are binary in
/// the prepared-statement protocol and are decoded before being shown as
/// text.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let value = match type_name {
        "BOOLEAN" => cell::<bool>(row, index).map(Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            cell::<i64>(row, index).map(Value::Int)
        }
        unsigned if unsigned.ends_with("UNSIGNED") => {
            cell::<u64>(row, index).map(|v| match i64::try_from(v) {
                Ok(v) => Value::Int(v),
                Err(_) => Value::Float(v as f64),
            })
        }
        "FLOAT" => cell::<f32>(row, index).map(|v| Value::Float(v.into())),
        "DOUBLE" => cell::<f64>(row, index).map(Value::Float),
        "DATE" => cell::<NaiveDate>(row, index).map(Value::text),
        "TIME" => cell::<NaiveTime>(row, index).map(Value::text),
        "DATETIME" => cell::<NaiveDateTime>(row, index).map(Value::text),
        "TIMESTAMP" => cell::<DateTime<Utc>>(row, index).map(Value::text),
        "YEAR" => decoded(row.try_get_unchecked::<Option<u16>, _>(index))
            .map(|v| Value::Int(v.into())),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            cell::<Vec<u8>>(row, index).map(Value::Bytes)
        }
        _ => decoded(row.try_get_unchecked::<Option<String>, _>(index)).map(Value::String),
    };
    value.unwrap_or_default()
}

fn cell<'r, T>(row: &'r MySqlRow, index: usize) -> Option<T>
where
    T: Decode<'r, MySql> + Type<MySql>,
{
    decoded(row.try_get::<Option<T>, _>(index))
}
