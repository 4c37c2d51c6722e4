//! End-to-end tests over seeded SQLite files.

pub mod common;
pub mod fetch_test;
pub mod pipeline_test;
