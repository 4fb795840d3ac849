//! Annotation pipeline: turns new-user events into chart markers.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::relay;
use super::sink::UiUpdate;
use crate::data::Annotation;
use crate::feed::EditEvent;
use crate::scheduler::{SchedulingContext, UiDispatcher};

/// A marker for a new-user event, placed at the event's time.
pub fn project(event: &EditEvent) -> Option<Annotation> {
    event
        .is_new_user()
        .then(|| Annotation::new_user(event.marker_time()))
}

pub fn spawn(
    events: broadcast::Receiver<EditEvent>,
    context: &dyn SchedulingContext,
    ui: UiDispatcher<UiUpdate>,
) -> JoinHandle<()> {
    context.spawn(Box::pin(relay(events, "annotation", ui, |event| {
        project(&event).map(UiUpdate::Annotation)
    })))
}
