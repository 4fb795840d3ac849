//! # wikiwatch
//!
//! A terminal monitor and library for the live Wikipedia edit feed.
//!
//! Events arrive as JSON text frames over a websocket (or from a recorded
//! file) and fan out to three independent pipelines: the edit **rate**
//! measured per tumbling window, a **ticker** with the latest edited
//! content, and **annotations** marking every new account on the rate chart.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  background context                    │  UI thread              │
//! │                                        │                         │
//! │  ┌──────────┐   ┌──────┐   ┌────────┐  │  ┌─────────┐  ┌──────┐  │
//! │  │connector │──▶│ feed │──▶│pipeline│──┼─▶│  app    │─▶│  ui  │  │
//! │  │ (ws/file)│   │(bcast)   │ ×3     │  │  │(Dashboard) │      │  │
//! │  └──────────┘   └──────┘   └────────┘  │  └─────────┘  └──────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`feed`]**: event model, the broadcast hub and the [`FeedConnector`]
//!   implementations ([`WebSocketConnector`], [`ReplayConnector`])
//! - **[`pipeline`]**: the rate, ticker and annotation pipelines and the
//!   [`Monitor`] that owns their lifecycle
//! - **[`scheduler`]**: the background [`SchedulingContext`] and the
//!   UI-affine mailbox ([`UiDispatcher`] / [`UiQueue`])
//! - **[`data`]**: chart and ticker view state, export
//! - **[`ui`]**: ratatui rendering and theme support
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch the public feed
//! wikiwatch
//!
//! # Replay a recording, one event every 200ms, printing to stdout
//! wikiwatch --replay edits.jsonl --replay-interval 200ms --headless
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::io::Cursor;
//! use wikiwatch::{Background, Dashboard, Monitor, PipelineConfig, ReplayConnector, UiUpdate};
//!
//! # tokio_test::block_on(async {
//! let recording = br#"{"type":"unspecified","content":"Ferris"}
//! {"type":"newuser","time":"2024-05-01T12:00:00Z"}
//! "#;
//! let (mut monitor, mut queue) = Monitor::new(PipelineConfig::default());
//! let connector = ReplayConnector::new(Cursor::new(recording.to_vec()), "inline");
//! monitor.start(Box::new(connector), &Background::current("pipelines")).unwrap();
//!
//! let mut dashboard = Dashboard::default();
//! // Apply everything up to and including the first rate sample
//! while let Some(update) = queue.recv().await {
//!     let window_closed = matches!(update, UiUpdate::Rate(_));
//!     update.apply(&mut dashboard);
//!     if window_closed {
//!         break;
//!     }
//! }
//! assert_eq!(dashboard.ticker(), "Ferris");
//! assert_eq!(dashboard.chart.annotation_count(), 1);
//! assert_eq!(dashboard.chart.latest().map(|s| s.events), Some(2));
//! monitor.teardown();
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod feed;
pub mod pipeline;
pub mod scheduler;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use data::{Annotation, AnnotationStyle, Dashboard, RateChart, RateSample, Rgba};
pub use error::{FeedError, LifecycleError};
pub use feed::{
    Backoff, EditEvent, EventKind, Feed, FeedConnector, FeedStatus, Publisher, ReplayConnector,
    WebSocketConnector,
};
pub use pipeline::{
    ChartSink, Lifecycle, MissedWindowPolicy, Monitor, PipelineConfig, RateConfig, TextSink,
    UiUpdate,
};
pub use scheduler::{ui_context, Background, SchedulingContext, UiDispatcher, UiQueue};
pub use ui::Theme;
