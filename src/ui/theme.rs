//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::Rgba;
use crate::feed::FeedStatus;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and titles.
    pub highlight: Color,
    /// Color of the edit-rate line.
    pub rate: Color,
    /// Color for a live feed.
    pub connected: Color,
    /// Color while connecting or after a finite feed ends.
    pub pending: Color,
    /// Color for a dropped connection.
    pub disconnected: Color,
    /// Color for borders and axes.
    pub border: Color,
    /// Style for section headers.
    pub header: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            rate: Color::Cyan,
            connected: Color::Green,
            pending: Color::Yellow,
            disconnected: Color::Red,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            rate: Color::Blue,
            connected: Color::Green,
            pending: Color::Yellow,
            disconnected: Color::Red,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a feed status
    pub fn status_style(&self, status: &FeedStatus) -> Style {
        match status {
            FeedStatus::Connected => Style::default().fg(self.connected),
            FeedStatus::Idle | FeedStatus::Connecting | FeedStatus::Finished => {
                Style::default().fg(self.pending)
            }
            FeedStatus::Disconnected(_) => {
                Style::default().fg(self.disconnected).add_modifier(Modifier::BOLD)
            }
        }
    }

    /// Terminal style for an annotation colour. Translucent colours are dimmed.
    pub fn annotation_style(&self, color: Rgba) -> Style {
        let (r, g, b) = color.to_rgb8();
        let style = Style::default().fg(Color::Rgb(r, g, b));
        if color.alpha < 1.0 {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AnnotationStyle;

    #[test]
    fn test_status_styles_differ() {
        let theme = Theme::dark();
        assert_eq!(theme.status_style(&FeedStatus::Connected).fg, Some(Color::Green));
        assert_eq!(
            theme.status_style(&FeedStatus::Disconnected("x".into())).fg,
            Some(Color::Red)
        );
    }

    #[test]
    fn test_translucent_annotation_is_dimmed() {
        let style = Theme::dark().annotation_style(AnnotationStyle::NEW_USER.color);
        assert_eq!(style.fg, Some(Color::Rgb(255, 0, 0)));
        assert!(style.add_modifier.contains(Modifier::DIM));
    }
}
