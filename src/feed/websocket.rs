//! Websocket feed connector.
//!
//! Connects to the edit feed, publishes every text (or UTF-8 binary) frame as
//! an [`EditEvent`](super::EditEvent), and reconnects with exponential backoff
//! when the connection drops.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::{FeedConnector, FeedStatus, Publisher};
use crate::error::FeedError;
use crate::scheduler::SchedulingContext;

/// Exponential reconnect delay: `base * 2^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before reconnect attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Connector for the live websocket feed.
#[derive(Debug)]
pub struct WebSocketConnector {
    url: Url,
    description: String,
    reconnect: Option<Backoff>,
}

impl WebSocketConnector {
    /// Create a connector for a `ws://` or `wss://` URL. Reconnects with the
    /// default [`Backoff`] unless told otherwise.
    pub fn new(url: &str) -> Result<Self, FeedError> {
        let url = Url::parse(url).map_err(|e| FeedError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(FeedError::InvalidUrl(format!(
                "{}: expected ws:// or wss://",
                url
            )));
        }
        Ok(Self {
            description: format!("websocket: {}", url),
            url,
            reconnect: Some(Backoff::default()),
        })
    }

    /// Set the reconnect policy. `None` gives up after the first disconnect.
    pub fn with_reconnect(mut self, reconnect: Option<Backoff>) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn run(self, publisher: Publisher) {
        let mut attempt = 0u32;

        loop {
            publisher.set_status(FeedStatus::Connecting);
            tracing::info!(url = %self.url, attempt, "connecting to feed");

            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    attempt = 0;
                    publisher.set_status(FeedStatus::Connected);
                    let reason = read_frames(stream, &publisher).await;
                    publisher.set_status(FeedStatus::Disconnected(reason));
                }
                Err(e) => {
                    let error = FeedError::Connect(e.to_string());
                    publisher.set_status(FeedStatus::Disconnected(error.to_string()));
                }
            }

            if publisher.subscriber_count() == 0 {
                tracing::debug!("no subscribers left, stopping connector");
                break;
            }

            let Some(backoff) = self.reconnect else {
                break;
            };
            let delay = backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            tracing::info!(?delay, "reconnecting after delay");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Publish frames until the connection ends. Returns the reason it ended.
async fn read_frames<S>(mut stream: S, publisher: &Publisher) -> String
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                publisher.publish_raw(&text);
            }
            Ok(Message::Binary(bytes)) => {
                publisher.publish_bytes(&bytes);
            }
            Ok(Message::Close(frame)) => {
                return frame
                    .map(|f| format!("closed by server: {}", f.reason))
                    .unwrap_or_else(|| "closed by server".to_string());
            }
            // Pings are answered by tungstenite itself
            Ok(_) => {}
            Err(e) => return e.to_string(),
        }
    }
    "connection closed".to_string()
}

impl FeedConnector for WebSocketConnector {
    fn description(&self) -> &str {
        &self.description
    }

    fn reconnects(&self) -> bool {
        self.reconnect.is_some()
    }

    fn start(
        self: Box<Self>,
        publisher: Publisher,
        context: &dyn SchedulingContext,
    ) -> JoinHandle<()> {
        context.spawn(Box::pin(self.run(publisher)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{EventKind, Feed};
    use futures_util::stream;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[test]
    fn test_new_connector() {
        let connector = WebSocketConnector::new("ws://wiki-update-sockets.herokuapp.com/").unwrap();
        assert_eq!(connector.url().scheme(), "ws");
        assert_eq!(
            connector.description(),
            "websocket: ws://wiki-update-sockets.herokuapp.com/"
        );
        assert!(connector.reconnects());
        assert!(!connector.with_reconnect(None).reconnects());
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        assert!(matches!(
            WebSocketConnector::new("http://example.com"),
            Err(FeedError::InvalidUrl(_))
        ));
        assert!(matches!(
            WebSocketConnector::new("not a url"),
            Err(FeedError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(4), Duration::from_secs(16));
        assert_eq!(backoff.delay(5), Duration::from_secs(30));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_read_frames_publishes_and_reports_close() {
        let feed = Feed::new(16);
        let mut rx = feed.subscribe();
        let publisher = feed.publisher();

        let frames = stream::iter(vec![
            Ok(Message::Text(r#"{"type":"unspecified","content":"A"}"#.to_string())),
            Ok(Message::Ping(vec![1])),
            Ok(Message::Binary(br#"{"type":"newuser","time":0}"#.to_vec())),
            Ok(Message::Text("garbage".to_string())),
            Ok(Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "restart".into(),
            }))),
            Ok(Message::Text(r#"{"type":"unspecified","content":"late"}"#.to_string())),
        ]);

        let reason = read_frames(frames, &publisher).await;
        assert_eq!(reason, "closed by server: restart");

        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Edit);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::NewUser);
        assert!(rx.try_recv().is_err());
        assert_eq!(feed.stats().malformed(), 1);
    }

    #[tokio::test]
    async fn test_read_frames_end_of_stream() {
        let feed = Feed::new(4);
        let frames = stream::iter(Vec::<Result<Message, _>>::new());
        assert_eq!(read_frames(frames, &feed.publisher()).await, "connection closed");
    }
}
