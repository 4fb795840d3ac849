//! Ticker label showing the latest edited content.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let dashboard = &app.dashboard;

    let text_style = if dashboard.last_edit_at().is_some() {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };

    let title = match dashboard.last_edit_at() {
        Some(at) => format!(
            " Latest edit ({}) ",
            at.with_timezone(&chrono::Local).format("%H:%M:%S")
        ),
        None => " Latest edit ".to_string(),
    };

    let block = Block::default()
        .title(Span::styled(title, app.theme.header))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let paragraph = Paragraph::new(Line::from(Span::styled(dashboard.ticker(), text_style)))
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}
