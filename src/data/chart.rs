//! Chart state: the rate series and its annotation markers.
//!
//! The chart owns sample history; pipelines only ever push values in.

use std::collections::VecDeque;

use super::model::{Annotation, RateSample};
use crate::pipeline::ChartSink;

/// Default number of rate samples kept for display (10 minutes at 5s).
pub const DEFAULT_HISTORY_LEN: usize = 120;

/// Default upper bound of the y axis, in edits/second.
pub const DEFAULT_Y_MAX: f64 = 5.0;

/// Shortest time span shown on the x axis, in seconds.
pub const MIN_SPAN_SECS: f64 = 60.0;

/// Chart state for the edit-rate view.
#[derive(Debug, Clone)]
pub struct RateChart {
    samples: VecDeque<RateSample>,
    history_len: usize,
    annotations: VecDeque<Annotation>,
    /// Oldest markers are evicted beyond this; `None` keeps them all.
    annotation_limit: Option<usize>,
    y_max: f64,
    redraws: u64,
}

impl Default for RateChart {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN, None, DEFAULT_Y_MAX)
    }
}

impl RateChart {
    pub fn new(history_len: usize, annotation_limit: Option<usize>, y_max: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            history_len: history_len.max(1),
            annotations: VecDeque::new(),
            annotation_limit,
            y_max,
            redraws: 0,
        }
    }

    pub fn samples(&self) -> impl ExactSizeIterator<Item = &RateSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&RateSample> {
        self.samples.back()
    }

    pub fn annotations(&self) -> impl ExactSizeIterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    /// Number of repaints requested so far.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    /// The x axis as drawn, in epoch seconds.
    ///
    /// Covers every sample and at least [`MIN_SPAN_SECS`], and stretches past
    /// the last sample to reach markers in the window that is still open.
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        let first = epoch_secs(self.samples.front()?.closed_at);
        let last = epoch_secs(self.samples.back()?.closed_at);
        let end = self
            .annotations
            .iter()
            .map(|a| epoch_secs(a.time))
            .filter(|x| *x <= last + MIN_SPAN_SECS)
            .fold(last, f64::max);
        Some((first.min(end - MIN_SPAN_SECS), end))
    }

    /// Upper y bound: the configured maximum, grown to fit the peak sample.
    pub fn y_bound(&self) -> f64 {
        let peak = self.samples.iter().map(|s| s.rate).fold(0.0, f64::max);
        if peak > self.y_max {
            peak.ceil()
        } else {
            self.y_max
        }
    }

    /// Samples as `(epoch seconds, rate)` points.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.samples.iter().map(|s| (epoch_secs(s.closed_at), s.rate)).collect()
    }

    /// Markers that fall inside [`x_bounds`](Self::x_bounds), as epoch seconds.
    pub fn visible_annotations(&self) -> Vec<(f64, &Annotation)> {
        let Some((start, end)) = self.x_bounds() else {
            return Vec::new();
        };
        self.annotations
            .iter()
            .map(|a| (epoch_secs(a.time), a))
            .filter(|(x, _)| *x >= start && *x <= end)
            .collect()
    }
}

impl ChartSink for RateChart {
    fn append_value(&mut self, sample: RateSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.history_len {
            self.samples.pop_front();
        }
    }

    fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push_back(annotation);
        if let Some(limit) = self.annotation_limit {
            while self.annotations.len() > limit {
                self.annotations.pop_front();
            }
        }
    }

    fn redraw(&mut self) {
        self.redraws += 1;
    }
}

fn epoch_secs(time: chrono::DateTime<chrono::Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_at(secs: i64, rate: f64) -> RateSample {
        let base = Utc.with_ymd_and_hms(2014, 6, 26, 10, 0, 0).unwrap();
        RateSample {
            rate,
            events: (rate * 5.0) as u64,
            closed_at: base + Duration::seconds(secs),
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut chart = RateChart::new(3, None, DEFAULT_Y_MAX);
        for i in 0..5 {
            chart.append_value(sample_at(i * 5, i as f64));
        }
        let rates: Vec<f64> = chart.samples().map(|s| s.rate).collect();
        assert_eq!(rates, vec![2.0, 3.0, 4.0]);
        assert_eq!(chart.latest().unwrap().rate, 4.0);
    }

    #[test]
    fn test_annotations_accumulate_without_limit() {
        let mut chart = RateChart::default();
        let time = Utc::now();
        for n in 1..=50 {
            chart.add_annotation(Annotation::new_user(time));
            chart.redraw();
            assert_eq!(chart.annotation_count(), n);
        }
        assert_eq!(chart.redraws(), 50);
    }

    #[test]
    fn test_annotation_limit_evicts_oldest() {
        let mut chart = RateChart::new(DEFAULT_HISTORY_LEN, Some(2), DEFAULT_Y_MAX);
        let base = Utc::now();
        for i in 0..4 {
            chart.add_annotation(Annotation::new_user(base + Duration::seconds(i)));
        }
        let times: Vec<_> = chart.annotations().map(|a| a.time).collect();
        assert_eq!(times, vec![base + Duration::seconds(2), base + Duration::seconds(3)]);
    }

    #[test]
    fn test_y_bound_grows_with_peak() {
        let mut chart = RateChart::default();
        chart.append_value(sample_at(0, 2.4));
        assert_eq!(chart.y_bound(), 5.0);
        chart.append_value(sample_at(5, 7.2));
        assert_eq!(chart.y_bound(), 8.0);
    }

    #[test]
    fn test_x_bounds_cover_minimum_span() {
        let mut chart = RateChart::default();
        assert!(chart.x_bounds().is_none());

        chart.append_value(sample_at(0, 1.0));
        chart.append_value(sample_at(10, 1.0));
        let end = chart.points()[1].0;
        assert_eq!(chart.x_bounds(), Some((end - MIN_SPAN_SECS, end)));
    }

    #[test]
    fn test_visible_annotations_match_drawn_axis() {
        let mut chart = RateChart::default();
        chart.append_value(sample_at(0, 1.0));
        chart.append_value(sample_at(10, 1.0));
        let first = chart.points()[0].0;

        // Before the first sample, but inside the drawn span
        chart.add_annotation(Annotation::new_user(sample_at(-30, 0.0).closed_at));
        // Far beyond the last sample
        chart.add_annotation(Annotation::new_user(sample_at(500, 0.0).closed_at));

        let visible = chart.visible_annotations();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].0, first - 30.0);
    }

    #[test]
    fn test_open_window_markers_extend_axis() {
        let mut chart = RateChart::default();
        chart.append_value(sample_at(0, 1.0));
        chart.append_value(sample_at(5, 1.0));
        let first = chart.points()[0].0;

        chart.add_annotation(Annotation::new_user(sample_at(8, 0.0).closed_at));
        let (_, end) = chart.x_bounds().unwrap();
        assert_eq!(end, first + 8.0);
        assert_eq!(chart.visible_annotations().len(), 1);
    }
}
