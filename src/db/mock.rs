//! Mock database clients for testing.
//!
//! Provides an in-memory table store and an always-failing client so the
//! fetch stage can be exercised without a server.

use super::{DatabaseBackend, DatabaseClient, QueryResult};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that serves predefined tables.
///
/// Only understands `SELECT * FROM <table>`; it speaks the MySQL dialect.
#[derive(Default)]
pub struct MockDatabaseClient {
    tables: HashMap<String, QueryResult>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table to the mock store.
    pub fn with_table(mut self, name: impl Into<String>, result: QueryResult) -> Self {
        self.tables.insert(name.into(), result);
        self
    }

    /// Returns every SQL statement executed so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Mysql
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.to_string());
        }

        let table = sql
            .strip_prefix("SELECT * FROM ")
            .map(|name| name.replace('`', ""))
            .ok_or_else(|| ReportError::query(format!("Mock cannot execute: {sql}")))?;

        self.tables
            .get(&table)
            .cloned()
            .map(|result| result.with_execution_time(Duration::from_millis(1)))
            .ok_or_else(|| ReportError::query(format!("Table '{table}' doesn't exist")))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A client whose every query fails with the given message.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a failing client.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Mysql
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(ReportError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
