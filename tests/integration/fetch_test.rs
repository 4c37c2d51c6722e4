//! Fetch stage against a real SQLite file.

use super::common::{TestDatabase, ROBBERIES};
use outlier_report::db::{self, Value};

#[tokio::test]
async fn test_fetch_table_returns_raw_headers() {
    let db = TestDatabase::seeded().await;
    let mut out = Vec::<u8>::new();

    let base = db::fetch_table(&db.config.connection, "basedp", &mut out).await;

    assert_eq!(base.columns(), ["\u{feff}munic", "regiao "]);
    assert_eq!(base.len(), ROBBERIES.len());
    assert_eq!(base.rows()[0][0], Value::from("Angra dos Reis"));
}

#[tokio::test]
async fn test_fetch_table_decodes_integers() {
    let db = TestDatabase::seeded().await;
    let mut out = Vec::<u8>::new();

    let values =
        db::fetch_table(&db.config.connection, "basedp_roubo_comercio", &mut out).await;

    assert_eq!(values.len(), ROBBERIES.len() + 1);
    assert_eq!(values.rows()[6][1], Value::Int(480));
}

#[tokio::test]
async fn test_fetch_missing_table_is_empty() {
    let db = TestDatabase::empty().await;
    let mut out = Vec::<u8>::new();

    let data = db::fetch_table(&db.config.connection, "basedp", &mut out).await;

    assert!(data.is_empty());
    assert!(data.columns().is_empty());

    let printed = String::from_utf8(out).unwrap();
    assert!(
        printed.starts_with("Erro ao conectar ao banco: Query error: "),
        "{printed}"
    );
    assert!(printed.contains("no such table"), "{printed}");
}

#[tokio::test]
async fn test_fetch_rejects_unsafe_table_name() {
    let db = TestDatabase::seeded().await;
    let mut out = Vec::<u8>::new();

    let data =
        db::fetch_table(&db.config.connection, "basedp; DROP TABLE basedp", &mut out).await;
    assert!(data.is_empty());

    let still_there = db::fetch_table(&db.config.connection, "basedp", &mut out).await;
    assert_eq!(still_there.len(), ROBBERIES.len());
}

#[tokio::test]
async fn test_fetch_empty_table_keeps_columns() {
    let db = TestDatabase::seeded().await;
    db.execute("DELETE FROM basedp_roubo_comercio").await;
    let mut out = Vec::<u8>::new();

    let values =
        db::fetch_table(&db.config.connection, "basedp_roubo_comercio", &mut out).await;

    assert!(values.is_empty());
    assert_eq!(values.columns(), [" munic", "roubo_comercio"]);
    assert!(out.is_empty());
}
