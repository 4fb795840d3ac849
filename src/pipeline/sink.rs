//! Sinks the pipelines write to, and the messages that carry their values
//! onto the UI thread.

use crate::data::{Annotation, RateSample};

/// A chart that shows the rate series and its markers.
pub trait ChartSink {
    /// Push one rate data point.
    fn append_value(&mut self, sample: RateSample);

    /// Add a permanent marker.
    fn add_annotation(&mut self, annotation: Annotation);

    /// Repaint after the annotation set changed.
    fn redraw(&mut self);
}

/// A label that shows the latest edited content.
pub trait TextSink {
    /// Replace the displayed text.
    fn set_text(&mut self, content: &str);
}

/// A value produced by one of the pipelines, waiting to be applied on the
/// UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Rate(RateSample),
    Ticker(String),
    Annotation(Annotation),
}

impl UiUpdate {
    /// Apply this update to the view.
    pub fn apply<S>(self, sink: &mut S)
    where
        S: ChartSink + TextSink + ?Sized,
    {
        match self {
            UiUpdate::Rate(sample) => sink.append_value(sample),
            UiUpdate::Ticker(content) => sink.set_text(&content),
            UiUpdate::Annotation(annotation) => {
                sink.add_annotation(annotation);
                sink.redraw();
            }
        }
    }
}
