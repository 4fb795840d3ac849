//! Edit-rate chart rendering.
//!
//! Draws the rate series as a braille line and each visible new-user marker
//! as a vertical line spanning the y axis.

use chrono::{Local, TimeZone};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;

/// Chart title.
const TITLE: &str = " Wikipedia Live Updates ";

/// Y axis title.
const Y_TITLE: &str = "Edit Rate (edits/second)";

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chart = &app.dashboard.chart;

    let marker_info = if app.show_annotations {
        format!("{} new users", chart.annotation_count())
    } else {
        "markers hidden".to_string()
    };
    let block = Block::default()
        .title(Span::styled(TITLE, app.theme.header))
        .title_bottom(format!(" {} ", marker_info))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some((start, end)) = chart.x_bounds() else {
        let waiting = Paragraph::new("Waiting for the first rate window...")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(waiting, area);
        return;
    };
    let y_max = chart.y_bound();

    let points = chart.points();
    let markers: Vec<([(f64, f64); 2], Style)> = if app.show_annotations {
        chart
            .visible_annotations()
            .into_iter()
            .map(|(x, annotation)| {
                (
                    [(x, 0.0), (x, y_max)],
                    app.theme.annotation_style(annotation.style.color),
                )
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut datasets = vec![Dataset::default()
        .name("edits/s")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(app.theme.rate))
        .data(&points)];
    datasets.extend(markers.iter().map(|(line, style)| {
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(*style)
            .data(line)
    }));

    let x_axis = Axis::default()
        .style(Style::default().fg(app.theme.border))
        .bounds([start, end])
        .labels(vec![
            time_label(start),
            time_label((start + end) / 2.0),
            time_label(end),
        ]);
    let y_axis = Axis::default()
        .title(Y_TITLE)
        .style(Style::default().fg(app.theme.border))
        .bounds([0.0, y_max])
        .labels(vec![
            "0".to_string(),
            format!("{:.1}", y_max / 2.0),
            format!("{:.1}", y_max),
        ]);

    let widget = Chart::new(datasets).block(block).x_axis(x_axis).y_axis(y_axis);
    frame.render_widget(widget, area);
}

/// Local wall-clock label for an epoch-seconds position.
fn time_label(epoch_secs: f64) -> String {
    Local
        .timestamp_opt(epoch_secs.floor() as i64, 0)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}
