//! Command-line argument parsing.
//!
//! Uses clap. Command-line values override the config file, which overrides
//! the built-in defaults.

use crate::chart::ChartMode;
use crate::config::{Config, ConnectionConfig};
use crate::error::Result;
use crate::report::TableStyle;
use clap::Parser;
use std::path::PathBuf;

/// Joins two tables and reports IQR outliers of a numeric column.
#[derive(Parser, Debug)]
#[command(name = "outlier-report")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Connection string (mysql://, postgres://, sqlite://)
    #[arg(value_name = "CONNECTION_STRING", env = "DATABASE_URL")]
    pub connection_string: Option<String>,

    /// Database host
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Database port
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Database name
    #[arg(short = 'd', long, value_name = "DATABASE")]
    pub database: Option<String>,

    /// Database user
    #[arg(short = 'U', long, value_name = "USER")]
    pub user: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Join key column (repeat for composite keys)
    #[arg(long = "join-key", value_name = "COLUMN")]
    pub join_keys: Vec<String>,

    /// Console table layout
    #[arg(long, value_enum, value_name = "STYLE")]
    pub table_style: Option<TableStyle>,

    /// Where to draw the outlier chart
    #[arg(long, value_enum, value_name = "MODE", default_value = "screen")]
    pub chart: ChartMode,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of a loaded config.
    ///
    /// A connection string replaces the whole connection section; the
    /// individual flags then override single fields.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(conn_str) = &self.connection_string {
            config.connection = ConnectionConfig::from_connection_string(conn_str)?;
        }

        let connection = &mut config.connection;
        if let Some(host) = &self.host {
            connection.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            connection.port = Some(port);
        }
        if let Some(database) = &self.database {
            connection.database = Some(database.clone());
        }
        if let Some(user) = &self.user {
            connection.user = Some(user.clone());
        }

        if !self.join_keys.is_empty() {
            config.analysis.join_keys = self.join_keys.clone();
        }
        if let Some(style) = self.table_style {
            config.analysis.table_style = style;
        }

        config.validate()
    }
}
