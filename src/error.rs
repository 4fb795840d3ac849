//! Error types for the feed and the monitor lifecycle.

use thiserror::Error;

/// Errors raised while connecting to or reading from an edit feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid feed url: {0}")]
    InvalidUrl(String),

    /// The websocket handshake failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// A record on the feed was not a valid edit event.
    #[error("Failed to parse feed record: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading a recorded feed failed.
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when driving the monitor through its lifecycle.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// `start` was called on a monitor whose pipelines are already running.
    #[error("Monitor is already active")]
    AlreadyStarted,

    /// The monitor was torn down and cannot be restarted.
    #[error("Monitor has been torn down")]
    TornDown,
}
