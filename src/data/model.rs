//! Values derived from the feed: rate samples and chart annotations.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Edits per second over one tumbling window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSample {
    /// Events seen in the window divided by the window length in seconds.
    pub rate: f64,
    /// Raw event count for the window.
    pub events: u64,
    /// Wall-clock time the window closed.
    pub closed_at: DateTime<Utc>,
}

impl RateSample {
    /// Build a sample from a count over `span_secs` seconds.
    pub fn from_count(events: u64, span_secs: f64, closed_at: DateTime<Utc>) -> Self {
        let rate = if span_secs > 0.0 {
            events as f64 / span_secs
        } else {
            0.0
        };
        Self {
            rate,
            events,
            closed_at,
        }
    }
}

/// An RGBA colour, channels in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Rgba {
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// The same colour with a different alpha.
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// 8-bit channels, ignoring alpha.
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.red), channel(self.green), channel(self.blue))
    }

    pub const RED: Rgba = Rgba::new(1.0, 0.0, 0.0, 1.0);
}

/// How a marker is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnnotationStyle {
    pub line_width: f32,
    pub color: Rgba,
}

impl AnnotationStyle {
    /// Half-transparent red vertical line, two units wide.
    pub const NEW_USER: AnnotationStyle = AnnotationStyle {
        line_width: 2.0,
        color: Rgba::RED.with_alpha(0.5),
    };
}

/// A vertical marker on the rate chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Annotation {
    pub time: DateTime<Utc>,
    pub style: AnnotationStyle,
}

impl Annotation {
    /// Marker for a new account created at `time`.
    pub fn new_user(time: DateTime<Utc>) -> Self {
        Self {
            time,
            style: AnnotationStyle::NEW_USER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_count() {
        let now = Utc::now();
        assert_eq!(RateSample::from_count(12, 5.0, now).rate, 2.4);
        assert_eq!(RateSample::from_count(0, 5.0, now).rate, 0.0);
        assert_eq!(RateSample::from_count(3, 0.0, now).rate, 0.0);
    }

    #[test]
    fn test_new_user_style() {
        let annotation = Annotation::new_user(Utc::now());
        assert_eq!(annotation.style.line_width, 2.0);
        assert_eq!(annotation.style.color.alpha, 0.5);
        assert_eq!(annotation.style.color.to_rgb8(), (255, 0, 0));
    }
}
