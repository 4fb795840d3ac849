//! Common UI components: header bar, status bar, and help overlay.

use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;
use crate::feed::FeedStatus;

/// Render the header bar with feed status and the latest rate.
///
/// Displays: status indicator, latest rate, event counts, marker count.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let chart = &app.dashboard.chart;
    let status_style = app.theme.status_style(&app.feed_status);

    let rate = chart
        .latest()
        .map(|s| format!("{:.1}/s", s.rate))
        .unwrap_or_else(|| "-".to_string());

    let line = Line::from(vec![
        Span::styled(" ● ", status_style),
        Span::styled("WIKIWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(app.feed_status.label(), status_style),
        Span::raw(" │ rate "),
        Span::styled(rate, Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD)),
        Span::raw(" │ "),
        Span::styled(
            format_count(app.stats().received()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" events │ "),
        Span::styled(
            format!("{}", chart.annotation_count()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" new users"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Format a count for display (e.g., 1234 -> "1.2K", 1234567 -> "1.2M").
fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Render the status bar at the bottom.
///
/// Shows: source, feed problems, time since the last edit, available controls.
/// Temporary status messages take priority.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = "a:markers e:export ?:help q:quit";

    // A dropped feed is never silent: show why, in the alert colour
    if let FeedStatus::Disconnected(reason) = &app.feed_status {
        let mut status = format!(" Feed down: {}", reason);
        if app.reconnects {
            status.push_str(" | retrying");
        }
        status.push_str(&format!(" | {}", controls));
        let paragraph = Paragraph::new(status).style(app.theme.status_style(&app.feed_status));
        frame.render_widget(paragraph, area);
        return;
    }

    let last_edit = app
        .dashboard
        .last_edit_at()
        .and_then(|at| (Utc::now() - at).to_std().ok())
        .map(|age| format!("last edit {} ago", format_age(age)))
        .unwrap_or_else(|| "no edits yet".to_string());

    let mut status = format!(" {} | {}", app.source_description(), last_edit);
    let malformed = app.stats().malformed();
    if malformed > 0 {
        status.push_str(&format!(" | {} malformed", malformed));
    }
    if let Some(ref err) = app.last_error {
        status.push_str(&format!(" | last error: {}", err));
    }
    status.push_str(&format!(" | {}", controls));

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the chart.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from("  a         Show/hide new-user markers"),
        Line::from("  e         Export chart to JSON"),
        Line::from("  ?         Toggle this help"),
        Line::from("  q / Esc   Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Chart",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  Line      Edits per second, per window"),
        Line::from("  Markers   New account created"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 44u16.min(area.width.saturating_sub(4));
    let help_height = 14u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_234), "1.2K");
        assert_eq!(format_count(1_234_567), "1.2M");
    }
}
