//! Feed connectors and the broadcast stream of edit events.
//!
//! A connector ([`WebSocketConnector`], [`ReplayConnector`]) reads raw records,
//! parses them into [`EditEvent`]s and hands them to a [`Publisher`]. The
//! [`Feed`] multicasts every event to each subscriber, in receipt order, and
//! keeps a [`FeedStatus`] that the UI shows so a stalled connection is never
//! silent.

mod event;
mod replay;
mod websocket;

pub use event::{EditEvent, EventKind};
pub use replay::ReplayConnector;
pub use websocket::{Backoff, WebSocketConnector};

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::scheduler::SchedulingContext;

/// Connection state of the feed as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedStatus {
    /// No connector has been started yet.
    #[default]
    Idle,
    Connecting,
    Connected,
    /// The connection dropped or could not be opened.
    Disconnected(String),
    /// A finite feed (e.g. a replay) reached its end.
    Finished,
}

impl FeedStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FeedStatus::Idle => "idle",
            FeedStatus::Connecting => "connecting",
            FeedStatus::Connected => "live",
            FeedStatus::Disconnected(_) => "disconnected",
            FeedStatus::Finished => "finished",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, FeedStatus::Connected)
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStatus::Disconnected(reason) => write!(f, "disconnected: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Counters shared between the connector and the UI.
#[derive(Debug, Default)]
pub struct FeedStats {
    received: AtomicU64,
    malformed: AtomicU64,
}

impl FeedStats {
    /// Events successfully parsed and published.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Records dropped because they did not parse.
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

/// The broadcast hub every pipeline subscribes to.
#[derive(Debug)]
pub struct Feed {
    events: broadcast::Sender<EditEvent>,
    status: Arc<watch::Sender<FeedStatus>>,
    stats: Arc<FeedStats>,
}

impl Feed {
    /// Create a feed whose subscribers may fall at most `capacity` events
    /// behind before they start skipping.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        let (status, _) = watch::channel(FeedStatus::Idle);
        Self {
            events,
            status: Arc::new(status),
            stats: Arc::new(FeedStats::default()),
        }
    }

    /// A handle for connectors to publish through.
    pub fn publisher(&self) -> Publisher {
        Publisher {
            events: self.events.clone(),
            status: self.status.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EditEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<FeedStatus> {
        self.status.subscribe()
    }

    pub fn stats(&self) -> Arc<FeedStats> {
        self.stats.clone()
    }
}

/// Publishing side of a [`Feed`], held by a connector.
#[derive(Debug, Clone)]
pub struct Publisher {
    events: broadcast::Sender<EditEvent>,
    status: Arc<watch::Sender<FeedStatus>>,
    stats: Arc<FeedStats>,
}

impl Publisher {
    /// Broadcast one event. Returns how many subscribers will see it.
    pub fn publish(&self, event: EditEvent) -> usize {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        // No subscribers is not an error: the event is simply unobserved.
        self.events.send(event).unwrap_or(0)
    }

    /// Parse and broadcast one raw record.
    ///
    /// Malformed records are counted and logged, never fatal.
    pub fn publish_raw(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        match EditEvent::parse(text) {
            Ok(event) => {
                self.publish(event);
                true
            }
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "dropping malformed feed record");
                false
            }
        }
    }

    /// Like [`publish_raw`](Self::publish_raw) for a record that may not be
    /// valid UTF-8. Invalid bytes count as a malformed record.
    pub fn publish_bytes(&self, bytes: &[u8]) -> bool {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.publish_raw(text),
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "dropping non-UTF-8 feed record");
                false
            }
        }
    }

    pub fn set_status(&self, status: FeedStatus) {
        match &status {
            FeedStatus::Disconnected(reason) => tracing::warn!(%reason, "feed disconnected"),
            other => tracing::info!(status = %other, "feed status changed"),
        }
        self.status.send_replace(status);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

/// Something that produces edit events.
///
/// Connectors own their reconnect policy; the core only sees the broadcast
/// stream and the status channel.
pub trait FeedConnector: Send + Debug {
    /// Human-readable description, shown in the status bar.
    fn description(&self) -> &str;

    /// Whether the connector tries again after a disconnect.
    fn reconnects(&self) -> bool {
        false
    }

    /// Start producing events on the given context.
    fn start(self: Box<Self>, publisher: Publisher, context: &dyn SchedulingContext)
        -> JoinHandle<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_sees_every_event() {
        let feed = Feed::new(16);
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        let publisher = feed.publisher();

        assert_eq!(publisher.publish(EditEvent::edit("one")), 2);
        assert_eq!(publisher.publish(EditEvent::other("log")), 2);

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.try_recv().unwrap().content.as_deref(), Some("one"));
            assert_eq!(rx.try_recv().unwrap().kind, EventKind::Other("log".into()));
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(feed.stats().received(), 2);
    }

    #[test]
    fn test_publish_raw_counts_malformed() {
        let feed = Feed::new(16);
        let mut rx = feed.subscribe();
        let publisher = feed.publisher();

        assert!(publisher.publish_raw(r#"{"type":"unspecified","content":"a"}"#));
        assert!(!publisher.publish_raw("{broken"));
        assert!(!publisher.publish_raw("   "));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(feed.stats().received(), 1);
        assert_eq!(feed.stats().malformed(), 1);
    }

    #[test]
    fn test_publish_bytes_rejects_invalid_utf8() {
        let feed = Feed::new(16);
        let mut rx = feed.subscribe();
        let publisher = feed.publisher();

        assert!(!publisher.publish_bytes(b"\xff\xfe{}"));
        assert!(publisher.publish_bytes(br#"{"type":"newuser"}"#));

        assert!(rx.try_recv().unwrap().is_new_user());
        assert_eq!(feed.stats().received(), 1);
        assert_eq!(feed.stats().malformed(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = Feed::new(4);
        assert_eq!(feed.publisher().publish(EditEvent::edit("lost")), 0);
    }

    #[test]
    fn test_status_updates() {
        let feed = Feed::new(4);
        let status = feed.status();
        assert_eq!(*status.borrow(), FeedStatus::Idle);

        feed.publisher().set_status(FeedStatus::Disconnected("reset".into()));
        assert_eq!(*status.borrow(), FeedStatus::Disconnected("reset".into()));
        assert_eq!(status.borrow().to_string(), "disconnected: reset");
    }
}
