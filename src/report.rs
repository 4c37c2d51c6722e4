//! Console tables.
//!
//! Renders the three metric/value summaries and the ranking table as text.
//! Numbers use Rust's default float formatting, which prints the shortest
//! representation that round-trips, so nothing is rounded away.

use crate::dataset::Dataset;
use crate::stats::Summary;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::warn;

/// Shown in place of the relative distance when the median is zero.
pub const UNDEFINED: &str = "indefinida";

/// Console table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableStyle {
    /// Box-drawn grid.
    #[default]
    Grid,
    /// Header and rows joined with `" | "`.
    Plain,
}

/// Writes report text to the console sink. A closed sink is logged, not fatal.
pub fn emit<W: Write>(out: &mut W, text: &str) {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        warn!("Failed to write report output: {}", e);
    }
}

/// Formats a number the way every table cell shows it.
pub fn format_number(value: f64) -> String {
    value.to_string()
}

/// Renders one titled table.
pub fn render_table(
    title: &str,
    headers: &[String],
    rows: &[Vec<String>],
    style: TableStyle,
) -> String {
    let mut out = format!("\n{title}\n{}\n", "-".repeat(title.chars().count()));

    match style {
        TableStyle::Grid => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            // Rows stay on one line however wide the terminal is.
            table.set_content_arrangement(ContentArrangement::Disabled);
            table.set_header(headers.iter().map(Cell::new).collect::<Vec<_>>());
            for row in rows {
                table.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
            }
            out.push_str(&table.to_string());
            out.push('\n');
        }
        TableStyle::Plain => {
            out.push_str(&headers.join(" | "));
            out.push('\n');
            for row in rows {
                out.push_str(&row.join(" | "));
                out.push('\n');
            }
        }
    }

    out
}

fn metric_table(
    title: &str,
    header: &str,
    metrics: Vec<(&str, String)>,
    style: TableStyle,
) -> String {
    let headers = [header.to_string(), "Valor".to_string()];
    let rows: Vec<Vec<String>> = metrics
        .into_iter()
        .map(|(name, value)| vec![name.to_string(), value])
        .collect();
    render_table(title, &headers, &rows, style)
}

/// Mean, median and their relative distance.
pub fn central_tendency_table(summary: &Summary, style: TableStyle) -> String {
    let distance = summary
        .distance
        .map(format_number)
        .unwrap_or_else(|| UNDEFINED.to_string());

    metric_table(
        "Medidas de tendência central",
        "Métrica",
        vec![
            ("Média", format_number(summary.mean)),
            ("Mediana", format_number(summary.median)),
            ("Distância relativa (média-mediana)", distance),
        ],
        style,
    )
}

/// The three quartiles and the IQR.
pub fn quartiles_table(summary: &Summary, style: TableStyle) -> String {
    metric_table(
        "Quartis e IQR",
        "Quartil",
        vec![
            ("Q1", format_number(summary.q1)),
            ("Q2 (Mediana)", format_number(summary.q2)),
            ("Q3", format_number(summary.q3)),
            ("IQR (Q3 - Q1)", format_number(summary.iqr)),
        ],
        style,
    )
}

/// Fences and extremes, ordered from lowest to highest.
pub fn extremes_table(summary: &Summary, style: TableStyle) -> String {
    metric_table(
        "Valores Extremos e Limites de Outliers",
        "Extremos",
        vec![
            ("Limite Inferior", format_number(summary.lower_fence)),
            ("Valor Mínimo", format_number(summary.min)),
            ("Valor Máximo", format_number(summary.max)),
            ("Limite Superior", format_number(summary.upper_fence)),
        ],
        style,
    )
}

/// Every column of an already ordered dataset.
pub fn ranking_table(ranking: &Dataset, style: TableStyle) -> String {
    let rows: Vec<Vec<String>> = ranking
        .rows()
        .iter()
        .map(|row| row.iter().map(|value| value.to_display_string()).collect())
        .collect();

    render_table(
        "Ranqueamento dos Municípios - Ordem Decrescente",
        ranking.columns(),
        &rows,
        style,
    )
}

/// All four tables in print order.
pub fn render_report(summary: &Summary, ranking: &Dataset, style: TableStyle) -> String {
    [
        central_tendency_table(summary, style),
        quartiles_table(summary, style),
        extremes_table(summary, style),
        ranking_table(ranking, style),
    ]
    .concat()
}
