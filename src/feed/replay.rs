//! Replay connector.
//!
//! Reads a recorded feed of newline-delimited JSON records from any async
//! reader and publishes them as if they came off the websocket. Useful for
//! demos, offline debugging, and tests.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use super::{FeedConnector, FeedStatus, Publisher};
use crate::error::FeedError;
use crate::scheduler::SchedulingContext;

/// A connector that replays newline-delimited JSON records.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use wikiwatch::ReplayConnector;
///
/// let data = b"{\"type\":\"unspecified\",\"content\":\"Rust\"}\n";
/// let connector = ReplayConnector::new(Cursor::new(data.to_vec()), "recording");
/// ```
pub struct ReplayConnector<R> {
    reader: R,
    description: String,
    interval: Option<Duration>,
}

impl<R> ReplayConnector<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, description: &str) -> Self {
        Self {
            reader,
            description: format!("replay: {}", description),
            interval: None,
        }
    }

    /// Wait this long between records. Without it the whole recording is
    /// published as fast as it can be read.
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval.filter(|d| !d.is_zero());
        self
    }

    async fn run(self, publisher: Publisher) {
        publisher.set_status(FeedStatus::Connected);

        let mut reader = BufReader::new(self.reader);
        let mut line = Vec::new();
        let mut records = 0u64;

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => {
                    tracing::info!(records, "replay finished");
                    publisher.set_status(FeedStatus::Finished);
                    break;
                }
                Ok(_) => {
                    if publisher.publish_bytes(&line) {
                        records += 1;
                        if let Some(interval) = self.interval {
                            tokio::time::sleep(interval).await;
                        }
                    }
                }
                Err(e) => {
                    let error = FeedError::Io(e);
                    publisher.set_status(FeedStatus::Disconnected(error.to_string()));
                    break;
                }
            }
        }
    }
}

impl ReplayConnector<tokio::fs::File> {
    /// Open a recording on disk.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        Ok(Self::new(
            tokio::fs::File::from_std(file),
            &path.display().to_string(),
        ))
    }
}

impl<R> fmt::Debug for ReplayConnector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayConnector")
            .field("description", &self.description)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<R> FeedConnector for ReplayConnector<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn description(&self) -> &str {
        &self.description
    }

    fn start(
        self: Box<Self>,
        publisher: Publisher,
        context: &dyn SchedulingContext,
    ) -> JoinHandle<()> {
        context.spawn(Box::pin((*self).run(publisher)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{EventKind, Feed};
    use crate::scheduler::Background;
    use std::io::{Cursor, Write};

    fn recording() -> &'static str {
        concat!(
            r#"{"type":"unspecified","content":"First"}"#,
            "\n",
            "\n",
            "not json\n",
            r#"{"type":"newuser","time":"2014-06-26T10:15:00Z"}"#,
            "\n",
            r#"{"type":"unspecified","content":"Last"}"#,
        )
    }

    #[tokio::test]
    async fn test_replay_publishes_in_order() {
        let feed = Feed::new(16);
        let mut rx = feed.subscribe();
        let status = feed.status();

        let connector = Box::new(ReplayConnector::new(Cursor::new(recording()), "test"));
        assert_eq!(connector.description(), "replay: test");
        connector
            .start(feed.publisher(), &Background::current("test"))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().content.as_deref(), Some("First"));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::NewUser);
        assert_eq!(rx.recv().await.unwrap().content.as_deref(), Some("Last"));
        assert!(rx.try_recv().is_err());

        assert_eq!(feed.stats().malformed(), 1);
        assert_eq!(*status.borrow(), FeedStatus::Finished);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let feed = Feed::new(16);
        let mut rx = feed.subscribe();
        let status = feed.status();

        let mut data = br#"{"type":"unspecified","content":"before"}"#.to_vec();
        data.extend_from_slice(b"\n\xff\xfe garbage\n");
        data.extend_from_slice(br#"{"type":"unspecified","content":"after"}"#);
        data.push(b'\n');

        Box::new(ReplayConnector::new(Cursor::new(data), "mixed"))
            .start(feed.publisher(), &Background::current("test"))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().content.as_deref(), Some("before"));
        assert_eq!(rx.recv().await.unwrap().content.as_deref(), Some("after"));
        assert_eq!(feed.stats().received(), 2);
        assert_eq!(feed.stats().malformed(), 1);
        assert_eq!(*status.borrow(), FeedStatus::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_interval_paces_records() {
        let feed = Feed::new(16);
        let mut rx = feed.subscribe();
        let start = tokio::time::Instant::now();

        let connector = ReplayConnector::new(Cursor::new(recording()), "paced")
            .with_interval(Some(Duration::from_secs(1)));
        Box::new(connector).start(feed.publisher(), &Background::current("test"));

        for _ in 0..3 {
            rx.recv().await.unwrap();
        }
        // Two full intervals elapse before the third record is read
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"unspecified","content":"from disk"}}"#).unwrap();

        let feed = Feed::new(4);
        let mut rx = feed.subscribe();
        let connector = ReplayConnector::open(file.path()).unwrap();
        Box::new(connector)
            .start(feed.publisher(), &Background::current("test"))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().content.as_deref(), Some("from disk"));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            ReplayConnector::open("/definitely/not/here.ndjson"),
            Err(FeedError::Io(_))
        ));
    }
}
