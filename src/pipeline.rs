//! The report pipeline: fetch, prepare, compute, present.
//!
//! Each stage owns its failure policy. Fetch failures degrade to an empty
//! dataset; preparation and statistics failures end the run early; chart
//! failures are reported and the run still completes.

use crate::chart::{self, ChartMode, OutlierChart};
use crate::config::{AnalysisConfig, Config};
use crate::dataset::{Dataset, SortOrder};
use crate::db;
use crate::error::Result;
use crate::report;
use crate::stats::Analysis;
use std::io::Write;
use tracing::{error, info};

/// Size of the text rendering used by [`ChartMode::Text`].
const TEXT_CHART_SIZE: (u16, u16) = (120, 30);

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every stage ran; the chart may still have failed to render.
    Completed,
    /// Fetching or joining the tables failed.
    DataUnavailable,
    /// The statistics could not be computed.
    StatisticsFailed,
}

impl RunStatus {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::DataUnavailable | Self::StatisticsFailed => 1,
        }
    }
}

/// Statistics plus the descending ranking, computed from one joined snapshot.
#[derive(Debug, Clone)]
pub struct Computed {
    pub analysis: Analysis,
    pub ranking: Dataset,
}

/// Cleans both tables' column names and joins them on the configured keys.
pub fn prepare(mut base: Dataset, mut values: Dataset, join_keys: &[String]) -> Result<Dataset> {
    base.normalize_column_names();
    values.normalize_column_names();

    let joined = base.inner_join(&values, join_keys)?;
    info!(
        "Joined {} x {} rows on [{}] into {} rows",
        base.len(),
        values.len(),
        join_keys.join(", "),
        joined.len()
    );
    Ok(joined)
}

/// Summarizes the value column and ranks the joined rows by it.
pub fn compute(joined: &Dataset, analysis: &AnalysisConfig) -> Result<Computed> {
    Ok(Computed {
        analysis: Analysis::compute(joined, &analysis.value_column)?,
        ranking: joined.sorted_by(&analysis.value_column, SortOrder::Descending)?,
    })
}

/// Builds and shows (or prints) the outlier chart.
pub fn present_chart<W: Write>(
    computed: &Computed,
    analysis: &AnalysisConfig,
    mode: ChartMode,
    out: &mut W,
) -> Result<()> {
    if mode == ChartMode::Off {
        return Ok(());
    }

    let chart = OutlierChart::from_analysis(
        &computed.analysis,
        &analysis.value_column,
        &analysis.label_column,
    )?;

    match mode {
        ChartMode::Screen => chart::show(&chart),
        ChartMode::Text => {
            let (width, height) = TEXT_CHART_SIZE;
            let text = chart::render_to_string(&chart, width, height)?;
            report::emit(out, &format!("\n{text}"));
            Ok(())
        }
        ChartMode::Off => Ok(()),
    }
}

/// Runs the whole report against the configured database, writing the
/// console output to `out`.
pub async fn run<W: Write>(config: &Config, chart_mode: ChartMode, out: &mut W) -> RunStatus {
    let analysis = &config.analysis;
    info!("Connection: {}", config.connection.display_string());

    let base = db::fetch_table(&config.connection, &analysis.base_table, out).await;
    let values = db::fetch_table(&config.connection, &analysis.value_table, out).await;

    let joined = match prepare(base, values, &analysis.join_keys) {
        Ok(joined) => joined,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            report::emit(out, &format!("Erro ao obter dados: {e}\n"));
            return RunStatus::DataUnavailable;
        }
    };

    report::emit(out, "\nCalculando estatísticas...\n");
    let computed = match compute(&joined, analysis) {
        Ok(computed) => computed,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            report::emit(
                out,
                &format!("Erro ao obter informações estatísticas: {e}\n"),
            );
            return RunStatus::StatisticsFailed;
        }
    };

    report::emit(
        out,
        &report::render_report(
            &computed.analysis.summary,
            &computed.ranking,
            analysis.table_style,
        ),
    );

    if let Err(e) = present_chart(&computed, analysis, chart_mode, out) {
        error!("{}: {}", e.category(), e);
        report::emit(out, &format!("Erro ao exibir gráfico: {e}\n"));
    }

    RunStatus::Completed
}
