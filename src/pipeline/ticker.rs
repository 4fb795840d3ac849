//! Ticker pipeline: keeps content edits and forwards their text. The label
//! shows whatever arrived last.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::relay;
use super::sink::UiUpdate;
use crate::feed::EditEvent;
use crate::scheduler::{SchedulingContext, UiDispatcher};

/// The ticker text for an event, if it is a content edit that carries any.
pub fn project(event: &EditEvent) -> Option<String> {
    if event.is_edit() {
        event.content.clone()
    } else {
        None
    }
}

pub fn spawn(
    events: broadcast::Receiver<EditEvent>,
    context: &dyn SchedulingContext,
    ui: UiDispatcher<UiUpdate>,
) -> JoinHandle<()> {
    context.spawn(Box::pin(relay(events, "ticker", ui, |event| {
        project(&event).map(UiUpdate::Ticker)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Feed;
    use crate::scheduler::{ui_context, Background};
    use chrono::Utc;

    #[test]
    fn test_project_only_edits() {
        assert_eq!(project(&EditEvent::edit("Rust")), Some("Rust".to_string()));
        assert_eq!(project(&EditEvent::new_user(Utc::now())), None);
        assert_eq!(project(&EditEvent::other("block")), None);

        let mut empty_edit = EditEvent::edit("x");
        empty_edit.content = None;
        assert_eq!(project(&empty_edit), None);
    }

    #[tokio::test]
    async fn test_forwards_edit_content_in_order() {
        let feed = Feed::new(16);
        let (tx, mut queue) = ui_context();
        spawn(feed.subscribe(), &Background::current("test"), tx);

        let publisher = feed.publisher();
        publisher.publish(EditEvent::edit("first"));
        publisher.publish(EditEvent::new_user(Utc::now()));
        publisher.publish(EditEvent::other("patrol"));
        publisher.publish(EditEvent::edit("second"));

        assert_eq!(queue.recv().await, Some(UiUpdate::Ticker("first".into())));
        assert_eq!(queue.recv().await, Some(UiUpdate::Ticker("second".into())));

        // Closing the feed ends the pipeline
        drop(publisher);
        drop(feed);
        assert_eq!(queue.recv().await, None);
    }
}
