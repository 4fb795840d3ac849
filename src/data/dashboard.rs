//! Everything the screen shows, in one place.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::chart::RateChart;
use super::model::{Annotation, RateSample};
use crate::pipeline::{ChartSink, TextSink};

/// Text shown in the ticker before the first edit arrives.
pub const DEFAULT_TICKER_TEXT: &str = "Waiting for edits...";

/// View state: the rate chart and the ticker label.
///
/// Only ever touched on the UI thread.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub chart: RateChart,
    ticker: String,
    last_edit_at: Option<DateTime<Utc>>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(RateChart::default(), DEFAULT_TICKER_TEXT)
    }
}

impl Dashboard {
    pub fn new(chart: RateChart, initial_text: &str) -> Self {
        Self {
            chart,
            ticker: initial_text.to_string(),
            last_edit_at: None,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// When the ticker last changed, if ever.
    pub fn last_edit_at(&self) -> Option<DateTime<Utc>> {
        self.last_edit_at
    }

    /// Write the current view as pretty JSON.
    pub fn export(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            exported_at: DateTime<Utc>,
            ticker: &'a str,
            samples: Vec<&'a RateSample>,
            annotations: Vec<&'a Annotation>,
        }

        let export = Export {
            exported_at: Utc::now(),
            ticker: &self.ticker,
            samples: self.chart.samples().collect(),
            annotations: self.chart.annotations().collect(),
        };
        let json = serde_json::to_string_pretty(&export)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl ChartSink for Dashboard {
    fn append_value(&mut self, sample: RateSample) {
        self.chart.append_value(sample);
    }

    fn add_annotation(&mut self, annotation: Annotation) {
        self.chart.add_annotation(annotation);
    }

    fn redraw(&mut self) {
        self.chart.redraw();
    }
}

impl TextSink for Dashboard {
    fn set_text(&mut self, content: &str) {
        self.ticker.clear();
        self.ticker.push_str(content);
        self.last_edit_at = Some(Utc::now());
    }
}
