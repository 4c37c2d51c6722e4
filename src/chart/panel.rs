//! One outlier panel: a horizontal bar chart or a placeholder.

use super::PanelData;
use crate::report::format_number;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Direction, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Widget},
};

/// Text drawn in a panel that has nothing to plot.
pub const NO_OUTLIERS: &str = "Sem Outliers";

/// Bar lengths are integers; values are scaled so fractional data keeps its
/// proportions.
const VALUE_SCALE: f64 = 100.0;

/// Widget for a single outlier direction.
///
/// Bars grow from zero by magnitude: a negative value gets a bar as long as
/// its absolute value, and the value text keeps the sign.
pub struct OutlierPanel<'a> {
    data: &'a PanelData,
}

impl<'a> OutlierPanel<'a> {
    pub fn new(data: &'a PanelData) -> Self {
        Self { data }
    }

    fn block(&self) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Line::from(format!(" {} ", self.data.title)).centered())
            .title_bottom(Line::from(format!(" {} ", self.data.axis_label)).centered())
    }
}

impl Widget for OutlierPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block();

        if self.data.bars.is_empty() {
            let inner = block.inner(area);
            block.render(area, buf);
            if inner.height == 0 {
                return;
            }
            let middle = Rect {
                y: inner.y + inner.height / 2,
                height: 1,
                ..inner
            };
            Paragraph::new(NO_OUTLIERS)
                .alignment(Alignment::Center)
                .style(Style::default().add_modifier(Modifier::BOLD))
                .render(middle, buf);
            return;
        }

        let bar_style = Style::default().fg(self.data.color);
        let bars: Vec<Bar> = self
            .data
            .bars
            .iter()
            .map(|entry| {
                Bar::default()
                    .label(Line::from(entry.label.clone()))
                    .value(scaled(entry.value))
                    .text_value(format_number(entry.value))
                    .style(bar_style)
                    .value_style(bar_style.add_modifier(Modifier::REVERSED))
            })
            .collect();

        BarChart::default()
            .block(block)
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .data(BarGroup::default().bars(&bars))
            .render(area, buf);
    }
}

fn scaled(value: f64) -> u64 {
    (value.abs() * VALUE_SCALE).round() as u64
}
