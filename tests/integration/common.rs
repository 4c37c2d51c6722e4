//! Shared fixtures: a SQLite file shaped like the `projeto` database.

use outlier_report::config::{Config, ConnectionConfig};
use outlier_report::db::DatabaseBackend;
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

/// `(munic, roubo_comercio)`: one upper outlier (Rio de Janeiro).
pub const ROBBERIES: &[(&str, i64)] = &[
    ("Angra dos Reis", 14),
    ("Cabo Frio", 12),
    ("Macaé", 15),
    ("Maricá", 11),
    ("Niterói", 16),
    ("Petrópolis", 13),
    ("Rio de Janeiro", 480),
    ("Volta Redonda", 12),
];

/// A temporary database file that lives as long as the fixture.
pub struct TestDatabase {
    pub dir: TempDir,
    pub config: Config,
}

impl TestDatabase {
    /// Creates an empty database file with no tables.
    pub async fn empty() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("projeto.db");

        let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .expect("create sqlite file");
        sqlx::query("CREATE TABLE unrelated (id INTEGER)")
            .execute(&pool)
            .await
            .expect("create table");
        pool.close().await;

        let mut config = Config::default();
        config.connection = ConnectionConfig {
            backend: DatabaseBackend::Sqlite,
            database: Some(path.display().to_string()),
            host: None,
            port: None,
            user: None,
            password: None,
        };

        Self { dir, config }
    }

    /// Creates `basedp` and `basedp_roubo_comercio`, with the stray BOM and
    /// whitespace in the headers that the CSV import leaves behind.
    pub async fn seeded() -> Self {
        let db = Self::empty().await;
        let pool = db.pool().await;

        sqlx::query("CREATE TABLE basedp (\"\u{feff}munic\" TEXT, \"regiao \" TEXT)")
            .execute(&pool)
            .await
            .expect("create basedp");
        sqlx::query("CREATE TABLE basedp_roubo_comercio (\" munic\" TEXT, roubo_comercio INTEGER)")
            .execute(&pool)
            .await
            .expect("create basedp_roubo_comercio");

        for (munic, total) in ROBBERIES {
            sqlx::query("INSERT INTO basedp VALUES (?, 'Estado do Rio')")
                .bind(*munic)
                .execute(&pool)
                .await
                .expect("insert basedp");
            sqlx::query("INSERT INTO basedp_roubo_comercio VALUES (?, ?)")
                .bind(*munic)
                .bind(*total)
                .execute(&pool)
                .await
                .expect("insert basedp_roubo_comercio");
        }
        // Only present on one side, so the inner join drops it.
        sqlx::query("INSERT INTO basedp_roubo_comercio VALUES ('Atlântida', 999)")
            .execute(&pool)
            .await
            .expect("insert unmatched row");

        pool.close().await;
        db
    }

    /// Runs one statement against the fixture file.
    pub async fn execute(&self, sql: &str) {
        let pool = self.pool().await;
        sqlx::query(sql).execute(&pool).await.expect("execute statement");
        pool.close().await;
    }

    async fn pool(&self) -> SqlitePool {
        let path = self.dir.path().join("projeto.db");
        SqlitePool::connect(&format!("sqlite://{}", path.display()))
            .await
            .expect("open sqlite file")
    }
}
