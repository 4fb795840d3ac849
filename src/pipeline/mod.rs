//! The three event pipelines and the monitor that wires them to a feed.
//!
//! ```text
//!                          ┌──▶ rate ─────── count / window ──┐
//! connector ──▶ Feed ──────┼──▶ ticker ───── edits → content ─┼──▶ UiQueue ──▶ Dashboard
//!           (broadcast)    └──▶ annotation ─ newuser → marker ┘  (UI thread)
//!              background context                              UI-affine context
//! ```
//!
//! Every pipeline holds its own broadcast receiver, so each one sees every
//! event exactly once and in receipt order. Values are ordered within a
//! pipeline but not across pipelines.

pub mod annotation;
pub mod rate;
pub mod sink;
pub mod ticker;

pub use rate::{MissedWindowPolicy, RateConfig};
pub use sink::{ChartSink, TextSink, UiUpdate};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::LifecycleError;
use crate::feed::{EditEvent, Feed, FeedConnector, FeedStats, FeedStatus};
use crate::scheduler::{ui_context, SchedulingContext, UiDispatcher, UiQueue};
use std::sync::Arc;

/// Filter-map every event and deliver the survivors to the UI thread.
///
/// Ends when the feed closes or the view is gone.
pub(crate) async fn relay<F>(
    mut events: broadcast::Receiver<EditEvent>,
    pipeline: &'static str,
    ui: UiDispatcher<UiUpdate>,
    mut project: F,
) where
    F: FnMut(EditEvent) -> Option<UiUpdate> + Send,
{
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(update) = project(event) {
                    if !ui.deliver(update) {
                        break;
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, pipeline, "subscriber lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!(pipeline, "pipeline stopped");
}

/// Settings for the pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub rate: RateConfig,
    /// How far a pipeline may fall behind the feed before it skips events.
    pub broadcast_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rate: RateConfig::default(),
            broadcast_capacity: 1024,
        }
    }
}

/// Where the monitor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built, nothing subscribed.
    Inactive,
    /// Connector started and all three pipelines subscribed.
    Active,
    /// Pipelines released; nothing reaches the view any more.
    TornDown,
}

/// Owns the feed, the pipeline tasks and the dispatching half of the UI
/// mailbox for one screen.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use wikiwatch::{Background, Dashboard, Monitor, PipelineConfig, ReplayConnector};
///
/// # tokio_test::block_on(async {
/// let (mut monitor, mut queue) = Monitor::new(PipelineConfig::default());
/// let connector = ReplayConnector::new(Cursor::new(Vec::new()), "empty");
/// monitor.start(Box::new(connector), &Background::current("pipelines")).unwrap();
///
/// // On the UI thread
/// let mut dashboard = Dashboard::default();
/// queue.drain(|update| update.apply(&mut dashboard));
///
/// monitor.teardown();
/// # });
/// ```
#[derive(Debug)]
pub struct Monitor {
    lifecycle: Lifecycle,
    config: PipelineConfig,
    feed: Feed,
    ui: UiDispatcher<UiUpdate>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    source: Option<String>,
    reconnects: bool,
}

impl Monitor {
    /// Create an inactive monitor and the UI queue its pipelines deliver to.
    pub fn new(config: PipelineConfig) -> (Self, UiQueue<UiUpdate>) {
        let (ui, queue) = ui_context();
        let monitor = Self {
            lifecycle: Lifecycle::Inactive,
            config,
            feed: Feed::new(config.broadcast_capacity),
            ui,
            tasks: Vec::new(),
            source: None,
            reconnects: false,
        };
        (monitor, queue)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn status(&self) -> watch::Receiver<FeedStatus> {
        self.feed.status()
    }

    pub fn stats(&self) -> Arc<FeedStats> {
        self.feed.stats()
    }

    /// Description of the connector, once started.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Whether the started connector retries after a disconnect.
    pub fn reconnects(&self) -> bool {
        self.reconnects
    }

    /// Subscribe the three pipelines, then start the connector.
    ///
    /// Pipelines subscribe first so they never miss the first events.
    pub fn start(
        &mut self,
        connector: Box<dyn FeedConnector>,
        context: &dyn SchedulingContext,
    ) -> Result<(), LifecycleError> {
        match self.lifecycle {
            Lifecycle::Inactive => {}
            Lifecycle::Active => return Err(LifecycleError::AlreadyStarted),
            Lifecycle::TornDown => return Err(LifecycleError::TornDown),
        }

        self.tasks.push((
            "rate",
            rate::spawn(self.feed.subscribe(), self.config.rate, context, self.ui.clone()),
        ));
        self.tasks.push((
            "ticker",
            ticker::spawn(self.feed.subscribe(), context, self.ui.clone()),
        ));
        self.tasks.push((
            "annotation",
            annotation::spawn(self.feed.subscribe(), context, self.ui.clone()),
        ));

        let source = connector.description().to_string();
        self.reconnects = connector.reconnects();
        tracing::info!(%source, context = context.name(), "starting monitor");
        self.tasks.push(("connector", connector.start(self.feed.publisher(), context)));
        self.source = Some(source);
        self.lifecycle = Lifecycle::Active;
        Ok(())
    }

    /// Release every pipeline and stop the connector.
    ///
    /// Anything already queued for the view is discarded. Safe to call more
    /// than once.
    pub fn teardown(&mut self) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }
        self.ui.shutdown();
        for (name, task) in self.tasks.drain(..) {
            tracing::debug!(task = name, "aborting");
            task.abort();
        }
        if self.lifecycle == Lifecycle::Active {
            tracing::info!("monitor torn down");
        }
        self.lifecycle = Lifecycle::TornDown;
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ReplayConnector;
    use crate::scheduler::Background;
    use std::io::Cursor;

    fn idle_connector() -> Box<dyn FeedConnector> {
        Box::new(ReplayConnector::new(Cursor::new(Vec::new()), "idle"))
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let (mut monitor, _queue) = Monitor::new(PipelineConfig::default());
        assert_eq!(monitor.lifecycle(), Lifecycle::Inactive);
        assert!(monitor.source().is_none());

        let context = Background::current("test");
        monitor.start(idle_connector(), &context).unwrap();
        assert_eq!(monitor.lifecycle(), Lifecycle::Active);
        assert_eq!(monitor.source(), Some("replay: idle"));
        assert!(!monitor.reconnects());
        assert_eq!(
            monitor.start(idle_connector(), &context),
            Err(LifecycleError::AlreadyStarted)
        );

        monitor.teardown();
        monitor.teardown();
        assert_eq!(monitor.lifecycle(), Lifecycle::TornDown);
        assert_eq!(
            monitor.start(idle_connector(), &context),
            Err(LifecycleError::TornDown)
        );
    }

    #[tokio::test]
    async fn test_start_subscribes_three_pipelines() {
        let (mut monitor, _queue) = Monitor::new(PipelineConfig::default());
        monitor.start(idle_connector(), &Background::current("test")).unwrap();
        assert_eq!(monitor.feed().publisher().subscriber_count(), 3);
    }

    #[tokio::test]
    async fn test_teardown_before_start() {
        let (mut monitor, mut queue) = Monitor::new(PipelineConfig::default());
        monitor.teardown();
        assert_eq!(monitor.lifecycle(), Lifecycle::TornDown);
        assert_eq!(queue.recv().await, None);
    }
}
