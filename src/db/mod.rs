//! Database access layer.
//!
//! Provides a trait-based interface for running queries, allowing different
//! database backends to be used interchangeably, plus the fetch stage that
//! turns a table into an in-memory [`Dataset`].

mod mock;
mod mysql;
mod postgres;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::dataset::Dataset;
use crate::error::{ReportError, Result};
use crate::report;
use async_trait::async_trait;
use sqlx::{Column, TypeInfo};
use std::io::Write;
use tracing::{debug, error, info, warn};

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string (a URL scheme or config value).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::Mysql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend (0 for file-based backends).
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Postgres => 5432,
            Self::Sqlite => 0,
        }
    }

    /// Returns the URL scheme for this backend.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Quotes a single identifier part for this backend's SQL dialect.
    fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Self::Mysql => format!("`{ident}`"),
            Self::Postgres | Self::Sqlite => format!("\"{ident}\""),
        }
    }
}

/// Creates a database client for the given backend and configuration.
///
/// This is the central factory function for database connections. A single
/// attempt is made; there is no retry.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    match config.backend {
        DatabaseBackend::Mysql => Ok(Box::new(MySqlClient::connect(config).await?)),
        DatabaseBackend::Postgres => Ok(Box::new(PostgresClient::connect(config).await?)),
        DatabaseBackend::Sqlite => Ok(Box::new(SqliteClient::connect(config).await?)),
    }
}

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with ReportError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// The dialect this client speaks, used for identifier quoting.
    fn backend(&self) -> DatabaseBackend;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Builds `SELECT * FROM <table>` for a configured table name.
///
/// Identifiers cannot be bound as query parameters, so the name is restricted
/// to `[A-Za-z_][A-Za-z0-9_]*`, optionally qualified once with a schema, and
/// then quoted for the backend.
pub fn select_all_sql(backend: DatabaseBackend, table: &str) -> Result<String> {
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_plain_identifier(part)) {
        return Err(ReportError::query(format!(
            "Invalid table name '{table}': only letters, digits and underscores are allowed"
        )));
    }

    let quoted: Vec<String> = parts
        .iter()
        .map(|part| backend.quote_identifier(part))
        .collect();

    Ok(format!("SELECT * FROM {}", quoted.join(".")))
}

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Runs `SELECT * FROM <table>` on an open client.
pub async fn query_table(client: &dyn DatabaseClient, table: &str) -> Result<Dataset> {
    let sql = select_all_sql(client.backend(), table)?;
    debug!("Executing: {}", sql);

    let result = client.execute_query(&sql).await?;
    info!(
        "Fetched {} rows from {} in {}ms",
        result.row_count(),
        table,
        result.execution_time.as_millis()
    );

    Ok(Dataset::from(result))
}

/// Fetches a whole table, returning an empty dataset on any failure.
///
/// The connection is opened for this one query and closed afterwards, whether
/// or not the query succeeded. Failures are reported on the console and the
/// caller is expected to cope with the empty result.
pub async fn fetch_table<W: Write>(
    config: &ConnectionConfig,
    table: &str,
    out: &mut W,
) -> Dataset {
    match try_fetch_table(config, table).await {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("{}: fetching '{}' failed: {}", e.category(), table, e);
            report::emit(out, &format!("Erro ao conectar ao banco: {e}\n"));
            Dataset::default()
        }
    }
}

async fn try_fetch_table(config: &ConnectionConfig, table: &str) -> Result<Dataset> {
    let client = connect(config).await?;
    let result = query_table(client.as_ref(), table).await;
    let closed = client.close().await;
    let dataset = result?;
    closed?;
    Ok(dataset)
}

/// Column metadata for a result set or a prepared statement.
pub(crate) fn column_infos<C: Column>(columns: &[C]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Unwraps a cell decode, reading a failed decode as NULL.
///
/// A failure is never silent: the cell held a value the report cannot show.
pub(crate) fn decoded<T>(cell: std::result::Result<Option<T>, sqlx::Error>) -> Option<T> {
    cell.unwrap_or_else(|e| {
        warn!("Reading undecodable cell as NULL: {}", e);
        None
    })
}

/// Maps sqlx connection errors to user-friendly messages.
pub(crate) fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ReportError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.effective_port();
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ReportError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") || error_str.contains("authentication failed") {
        ReportError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("unknown database")
        || (error_str.contains("does not exist") && error_str.contains("database"))
    {
        ReportError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("unable to open database file") {
        ReportError::connection(format!("Cannot open database file '{database}'."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ReportError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ReportError::connection(error.to_string())
    }
}

/// Formats a query error, keeping the database's own message when there is one.
pub(crate) fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("ERROR {code}: {}", db_error.message()),
            None => format!("ERROR: {}", db_error.message()),
        },
        None => error.to_string(),
    }
}
