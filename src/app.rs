//! Application state for the dashboard screen.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::watch;

use crate::data::Dashboard;
use crate::feed::{FeedStats, FeedStatus};
use crate::pipeline::{Monitor, UiUpdate};
use crate::scheduler::UiQueue;
use crate::ui::Theme;

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
///
/// Lives on the UI thread: it drains the pipelines' UI queue into the
/// [`Dashboard`] and tracks the feed status for display.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub show_annotations: bool,

    // View state and its mailbox
    pub dashboard: Dashboard,
    queue: UiQueue<UiUpdate>,

    // Feed health
    status: watch::Receiver<FeedStatus>,
    stats: Arc<FeedStats>,
    pub feed_status: FeedStatus,
    /// Most recent disconnect reason, kept after a reconnect succeeds.
    pub last_error: Option<String>,
    /// Whether the connector retries after a disconnect.
    pub reconnects: bool,
    source: String,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create the app for a started monitor.
    pub fn new(dashboard: Dashboard, queue: UiQueue<UiUpdate>, monitor: &Monitor) -> Self {
        let status = monitor.status();
        let feed_status = status.borrow().clone();
        Self {
            running: true,
            show_help: false,
            show_annotations: true,
            dashboard,
            queue,
            status,
            stats: monitor.stats(),
            feed_status,
            last_error: None,
            reconnects: monitor.reconnects(),
            source: monitor.source().unwrap_or("no source").to_string(),
            theme: Theme::dark(),
            status_message: None,
        }
    }

    /// Returns a description of the feed source.
    pub fn source_description(&self) -> &str {
        &self.source
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    /// Apply everything the pipelines delivered since the last call and
    /// pick up feed status changes. Returns the number of updates applied.
    pub fn pump(&mut self) -> usize {
        let dashboard = &mut self.dashboard;
        let applied = self.queue.drain(|update| update.apply(dashboard));

        if self.status.has_changed().unwrap_or(false) {
            self.feed_status = self.status.borrow_and_update().clone();
            if let FeedStatus::Disconnected(reason) = &self.feed_status {
                self.last_error = Some(reason.clone());
            }
        }
        applied
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Show or hide new-user markers on the chart.
    pub fn toggle_annotations(&mut self) {
        self.show_annotations = !self.show_annotations;
        let state = if self.show_annotations { "shown" } else { "hidden" };
        self.set_status_message(format!("New-user markers {}", state));
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export current state to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        self.dashboard.export(path)
    }
}
