//! Whole-pipeline runs: fetch, prepare, compute, present.

use super::common::{TestDatabase, ROBBERIES};
use outlier_report::chart::{self, ChartMode, OutlierChart, NO_OUTLIERS};
use outlier_report::db;
use outlier_report::pipeline::{self, RunStatus};

/// Runs the report and returns its status plus everything it printed.
async fn run_captured(db: &TestDatabase, mode: ChartMode) -> (RunStatus, String) {
    let mut out = Vec::<u8>::new();
    let status = pipeline::run(&db.config, mode, &mut out).await;
    (status, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_run_completes_on_seeded_database() {
    let db = TestDatabase::seeded().await;

    let (status, printed) = run_captured(&db, ChartMode::Off).await;

    assert_eq!(status, RunStatus::Completed);
    assert!(printed.starts_with("\nCalculando estatísticas...\n"), "{printed}");
    assert!(printed.contains("Ranqueamento dos Municípios - Ordem Decrescente"));
    assert!(!printed.contains("Erro"), "{printed}");
}

#[tokio::test]
async fn test_run_with_text_chart_completes() {
    let db = TestDatabase::seeded().await;

    let (status, printed) = run_captured(&db, ChartMode::Text).await;

    assert_eq!(status, RunStatus::Completed);
    assert!(printed.contains("Outliers Superiores"));
    assert!(printed.contains(NO_OUTLIERS));
}

#[tokio::test]
async fn test_run_stops_when_tables_are_missing() {
    let db = TestDatabase::empty().await;

    let (status, printed) = run_captured(&db, ChartMode::Off).await;

    assert_eq!(status, RunStatus::DataUnavailable);
    assert_eq!(status.exit_code(), 1);

    let lines: Vec<&str> = printed.lines().collect();
    assert_eq!(lines.len(), 3, "{printed}");
    assert!(lines[0].starts_with("Erro ao conectar ao banco: Query error: "));
    assert!(lines[1].starts_with("Erro ao conectar ao banco: Query error: "));
    assert_eq!(
        lines[2],
        "Erro ao obter dados: Shape mismatch: join key 'munic' missing from left table"
    );
    assert!(!printed.contains("Calculando"));
}

#[tokio::test]
async fn test_run_on_empty_value_table_fails_in_statistics() {
    let db = TestDatabase::seeded().await;
    db.execute("DELETE FROM basedp_roubo_comercio").await;

    let (status, printed) = run_captured(&db, ChartMode::Off).await;

    assert_eq!(status, RunStatus::StatisticsFailed);
    assert_eq!(
        printed,
        "\nCalculando estatísticas...\n\
         Erro ao obter informações estatísticas: Shape mismatch: \
         column 'roubo_comercio': cannot summarize an empty column\n"
    );
}

#[tokio::test]
async fn test_run_stops_when_value_column_is_missing() {
    let mut db = TestDatabase::seeded().await;
    db.config.analysis.value_column = "furto".to_string();

    let (status, printed) = run_captured(&db, ChartMode::Off).await;

    assert_eq!(status, RunStatus::StatisticsFailed);
    assert_eq!(
        printed.lines().last(),
        Some(
            "Erro ao obter informações estatísticas: Shape mismatch: \
             column 'furto' not found (available: munic, regiao, roubo_comercio)"
        )
    );
}

#[tokio::test]
async fn test_chart_failure_still_completes() {
    let mut db = TestDatabase::seeded().await;
    db.config.analysis.label_column = "nome".to_string();

    let (status, printed) = run_captured(&db, ChartMode::Text).await;

    assert_eq!(status, RunStatus::Completed);
    assert!(printed.contains("Medidas de tendência central"));
    assert_eq!(
        printed.lines().last(),
        Some(
            "Erro ao exibir gráfico: Shape mismatch: \
             column 'nome' not found (available: munic, regiao, roubo_comercio)"
        )
    );
}

#[tokio::test]
async fn test_stages_end_to_end() {
    let db = TestDatabase::seeded().await;
    let analysis = &db.config.analysis;

    let mut out = Vec::<u8>::new();
    let base = db::fetch_table(&db.config.connection, &analysis.base_table, &mut out).await;
    let values = db::fetch_table(&db.config.connection, &analysis.value_table, &mut out).await;
    let joined = pipeline::prepare(base, values, &analysis.join_keys).unwrap();

    assert_eq!(joined.columns(), ["munic", "regiao", "roubo_comercio"]);
    assert_eq!(joined.len(), ROBBERIES.len());

    let computed = pipeline::compute(&joined, analysis).unwrap();
    let summary = computed.analysis.summary;

    // Sorted: 11 12 12 13 14 15 16 480
    assert_eq!(summary.median, 13.5);
    assert_eq!(summary.q1, 12.0);
    assert_eq!(summary.q3, 15.25);
    assert_eq!(summary.upper_fence, 15.25 + 1.5 * 3.25);
    assert!(computed.analysis.lower_outliers.is_empty());
    assert_eq!(
        computed.analysis.upper_outliers.labels("munic").unwrap(),
        ["Rio de Janeiro"]
    );
    assert_eq!(
        computed.ranking.labels("munic").unwrap()[..2],
        ["Rio de Janeiro", "Niterói"]
    );

    let chart = OutlierChart::from_analysis(
        &computed.analysis,
        &analysis.value_column,
        &analysis.label_column,
    )
    .unwrap();
    let screen = chart::render_to_string(&chart, 100, 20).unwrap();
    assert!(screen.contains("Rio de Janeiro"));
    assert_eq!(screen.matches(NO_OUTLIERS).count(), 1);
}
