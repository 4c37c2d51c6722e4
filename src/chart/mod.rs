//! Two-panel outlier chart.
//!
//! Lower outliers on the left, upper outliers on the right, each sorted
//! ascending and labeled by the label column. Drawn with ratatui either on
//! the terminal's alternate screen (until a key is pressed) or into an
//! off-screen buffer that is returned as text.

mod panel;

pub use panel::{OutlierPanel, NO_OUTLIERS};

use crate::dataset::{Dataset, SortOrder};
use crate::error::{ReportError, Result};
use crate::stats::Analysis;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend, TestBackend},
    buffer::Buffer,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Line,
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::panic;
use std::sync::Arc;
use tracing::debug;

const TOMATO: Color = Color::Rgb(255, 99, 71);
const SEA_GREEN: Color = Color::Rgb(46, 139, 87);

/// Where the chart goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ChartMode {
    /// Alternate screen, closed by any key.
    #[default]
    Screen,
    /// Rendered off-screen and printed as text.
    Text,
    /// No chart.
    Off,
}

/// One labeled bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarEntry {
    pub label: String,
    pub value: f64,
}

/// Everything one panel needs to draw itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelData {
    pub title: String,
    pub axis_label: String,
    pub color: Color,
    pub bars: Vec<BarEntry>,
}

impl PanelData {
    fn from_partition(
        title: &str,
        color: Color,
        partition: &Dataset,
        value_column: &str,
        label_column: &str,
    ) -> Result<Self> {
        let sorted = partition.sorted_by(value_column, SortOrder::Ascending)?;
        let labels = sorted.labels(label_column)?;
        let values = sorted.numeric_column(value_column)?;

        let bars = labels
            .into_iter()
            .zip(values)
            .filter_map(|(label, value)| value.map(|value| BarEntry { label, value }))
            .collect();

        Ok(Self {
            title: title.to_string(),
            axis_label: value_column.to_string(),
            color,
            bars,
        })
    }
}

/// The two panels of the outlier chart.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierChart {
    pub lower: PanelData,
    pub upper: PanelData,
}

impl OutlierChart {
    /// Builds both panels from the outlier partitions.
    pub fn from_analysis(
        analysis: &Analysis,
        value_column: &str,
        label_column: &str,
    ) -> Result<Self> {
        Ok(Self {
            lower: PanelData::from_partition(
                "Outliers Inferiores",
                TOMATO,
                &analysis.lower_outliers,
                value_column,
                label_column,
            )?,
            upper: PanelData::from_partition(
                "Outliers Superiores",
                SEA_GREEN,
                &analysis.upper_outliers,
                value_column,
                label_column,
            )?,
        })
    }
}

/// Lays the two panels side by side above a one-line hint.
pub fn draw(frame: &mut Frame, chart: &OutlierChart) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    frame.render_widget(OutlierPanel::new(&chart.lower), panels[0]);
    frame.render_widget(OutlierPanel::new(&chart.upper), panels[1]);
    frame.render_widget(
        Line::styled(
            "Pressione qualquer tecla para sair",
            Style::default().fg(Color::DarkGray),
        )
        .centered(),
        rows[1],
    );
}

/// Renders the chart off-screen and returns it as plain text.
pub fn render_to_string(chart: &OutlierChart, width: u16, height: u16) -> Result<String> {
    let mut terminal = Terminal::new(TestBackend::new(width, height))
        .map_err(|e| ReportError::render(format!("Failed to create terminal: {e}")))?;

    terminal
        .draw(|frame| draw(frame, chart))
        .map_err(|e| ReportError::render(format!("Failed to draw: {e}")))?;

    Ok(buffer_to_string(terminal.backend().buffer()))
}

/// Shows the chart on the alternate screen until a key is pressed.
///
/// The terminal is restored even when drawing fails.
pub fn show(chart: &OutlierChart) -> Result<()> {
    let mut terminal = setup_terminal()?;

    let shown = with_panic_cleanup(leave_terminal, || wait_for_key(&mut terminal, chart));
    let restored = restore_terminal(&mut terminal);

    shown?;
    restored
}

/// Runs `body` with `cleanup` chained in front of the current panic hook,
/// then puts the previous hook back.
fn with_panic_cleanup<T>(cleanup: fn(), body: impl FnOnce() -> T) -> T {
    let previous = Arc::new(panic::take_hook());
    let chained = Arc::clone(&previous);
    panic::set_hook(Box::new(move |panic_info| {
        cleanup();
        chained(panic_info);
    }));

    let result = body();

    drop(panic::take_hook());
    panic::set_hook(Box::new(move |panic_info| previous(panic_info)));
    result
}

/// Best-effort terminal reset for the panic path.
fn leave_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

fn wait_for_key<B: Backend>(terminal: &mut Terminal<B>, chart: &OutlierChart) -> Result<()> {
    loop {
        terminal
            .draw(|frame| draw(frame, chart))
            .map_err(|e| ReportError::render(format!("Failed to draw: {e}")))?;

        match event::read()
            .map_err(|e| ReportError::render(format!("Failed to read event: {e}")))?
        {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                debug!("Chart closed by {:?}", key.code);
                return Ok(());
            }
            // Resizes and everything else just redraw.
            _ => {}
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()
        .map_err(|e| ReportError::render(format!("Failed to enable raw mode: {e}")))?;

    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(ReportError::render(format!(
            "Failed to enter alternate screen: {e}"
        )));
    }

    Terminal::new(CrosstermBackend::new(stdout))
        .map_err(|e| ReportError::render(format!("Failed to create terminal: {e}")))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()
        .map_err(|e| ReportError::render(format!("Failed to disable raw mode: {e}")))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| ReportError::render(format!("Failed to leave alternate screen: {e}")))?;

    terminal
        .show_cursor()
        .map_err(|e| ReportError::render(format!("Failed to show cursor: {e}")))?;

    Ok(())
}

/// Converts a buffer to text, trimming trailing spaces and blank lines.
fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut lines: Vec<String> = (0..area.height)
        .map(|y| {
            let line: String = (0..area.width)
                .map(|x| buffer.cell((x, y)).map(|cell| cell.symbol()).unwrap_or(" "))
                .collect();
            line.trim_end().to_string()
        })
        .collect();

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    format!("{}\n", lines.join("\n"))
}
