//! Rate pipeline: counts every event in fixed tumbling windows and emits one
//! edits-per-second sample per window, empty windows included.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::sink::UiUpdate;
use crate::data::RateSample;
use crate::feed::EditEvent;
use crate::scheduler::{SchedulingContext, UiDispatcher};

/// What to do when window boundaries pass while the pipeline is stalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissedWindowPolicy {
    /// Emit one sample per elapsed window; windows missed while stalled
    /// report `0.0`.
    #[default]
    Emit,
    /// Fold every missed boundary into one late sample averaged over the
    /// whole span, then realign to the next boundary.
    Coalesce,
}

impl From<MissedWindowPolicy> for MissedTickBehavior {
    fn from(policy: MissedWindowPolicy) -> Self {
        match policy {
            MissedWindowPolicy::Emit => MissedTickBehavior::Burst,
            MissedWindowPolicy::Coalesce => MissedTickBehavior::Skip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateConfig {
    pub window: Duration,
    pub missed: MissedWindowPolicy,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5),
            missed: MissedWindowPolicy::default(),
        }
    }
}

/// Event counter for the window currently open.
#[derive(Debug, Clone)]
pub struct TumblingWindow {
    period: Duration,
    count: u64,
}

impl TumblingWindow {
    pub fn new(period: Duration) -> Self {
        Self { period, count: 0 }
    }

    pub fn record(&mut self, events: u64) {
        self.count = self.count.saturating_add(events);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Close the window spanning `windows` periods and start a fresh one.
    pub fn close(&mut self, windows: u32) -> RateSample {
        let span = self.period.as_secs_f64() * f64::from(windows.max(1));
        let sample = RateSample::from_count(self.count, span, Utc::now());
        self.count = 0;
        sample
    }

    /// Whole periods in `elapsed`, at least one.
    fn periods_in(&self, elapsed: Duration) -> u32 {
        let periods = (elapsed.as_secs_f64() / self.period.as_secs_f64()).round();
        (periods as u32).max(1)
    }
}

/// Start the rate pipeline on `context`, delivering samples to `ui`.
pub fn spawn(
    events: broadcast::Receiver<EditEvent>,
    config: RateConfig,
    context: &dyn SchedulingContext,
    ui: UiDispatcher<UiUpdate>,
) -> JoinHandle<()> {
    context.spawn(Box::pin(run(events, config, ui)))
}

async fn run(
    mut events: broadcast::Receiver<EditEvent>,
    config: RateConfig,
    ui: UiDispatcher<UiUpdate>,
) {
    let mut window = TumblingWindow::new(config.window);
    let mut last_close = Instant::now();
    let mut ticks = interval_at(last_close + config.window, config.window);
    ticks.set_missed_tick_behavior(config.missed.into());

    loop {
        tokio::select! {
            // Pending events belong to the window they arrived in
            biased;

            received = events.recv() => match received {
                Ok(_) => window.record(1),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, pipeline = "rate", "subscriber lagged");
                    window.record(skipped);
                }
                Err(RecvError::Closed) => break,
            },

            _ = ticks.tick() => {
                let windows = match config.missed {
                    MissedWindowPolicy::Emit => 1,
                    MissedWindowPolicy::Coalesce => window.periods_in(last_close.elapsed()),
                };
                last_close = Instant::now();
                let sample = window.close(windows);
                tracing::debug!(rate = sample.rate, events = sample.events, "rate sample");
                if !ui.deliver(UiUpdate::Rate(sample)) {
                    break;
                }
            }
        }
    }
    tracing::debug!(pipeline = "rate", "pipeline stopped");
}
