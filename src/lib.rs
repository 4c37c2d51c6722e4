//! Outlier report - joins two database tables and reports IQR outliers.
//!
//! This library exposes the core modules for use in integration tests.

pub mod chart;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod stats;
