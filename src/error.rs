//! Error types for the outlier report.
//!
//! Each variant maps to one failure zone of the pipeline, and each zone has
//! its own recovery policy (see `pipeline`).

use thiserror::Error;

/// Main error type for report operations.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (unknown table, invalid identifier, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Data does not have the shape the next stage needs (missing columns,
    /// non-numeric values, empty input).
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Chart rendering errors (terminal unavailable, draw failure).
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReportError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short label used as a prefix in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::ShapeMismatch(_) => "Shape Mismatch",
            Self::Render(_) => "Render Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using ReportError.
pub type Result<T> = std::result::Result<T, ReportError>;
