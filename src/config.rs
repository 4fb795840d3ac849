//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional file (TOML, JSON
//! or YAML, picked by extension), then `WIKIWATCH_*` environment variables.
//! Command-line flags are applied on top by the binary.
//!
//! ```toml
//! url = "ws://wiki-update-sockets.herokuapp.com/"
//! window_secs = 5
//! missed_window = "emit"
//! annotation_limit = 500
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::chart::{DEFAULT_HISTORY_LEN, DEFAULT_Y_MAX};
use crate::data::dashboard::DEFAULT_TICKER_TEXT;
use crate::data::{Dashboard, RateChart};
use crate::feed::Backoff;
use crate::pipeline::{MissedWindowPolicy, PipelineConfig, RateConfig};

/// The public Wikipedia edit feed.
pub const DEFAULT_FEED_URL: &str = "ws://wiki-update-sockets.herokuapp.com/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Websocket URL of the edit feed.
    pub url: String,
    /// Length of one rate window, in seconds.
    pub window_secs: u64,
    pub missed_window: MissedWindowPolicy,
    pub broadcast_capacity: usize,
    /// Maximum number of markers kept; unset keeps them all.
    pub annotation_limit: Option<usize>,
    /// Rate samples kept on the chart.
    pub history_len: usize,
    pub initial_ticker_text: String,
    /// Initial upper bound of the y axis in edits/second.
    pub y_max: f64,
    pub reconnect: bool,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// UI redraw interval.
    pub refresh_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let backoff = Backoff::default();
        let pipelines = PipelineConfig::default();
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            window_secs: pipelines.rate.window.as_secs(),
            missed_window: pipelines.rate.missed,
            broadcast_capacity: pipelines.broadcast_capacity,
            annotation_limit: None,
            history_len: DEFAULT_HISTORY_LEN,
            initial_ticker_text: DEFAULT_TICKER_TEXT.to_string(),
            y_max: DEFAULT_Y_MAX,
            reconnect: true,
            backoff_base_ms: backoff.base.as_millis() as u64,
            backoff_max_ms: backoff.max.as_millis() as u64,
            refresh_ms: 100,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file, and the environment.
    ///
    /// Not validated: apply command-line overrides first, then call
    /// [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("WIKIWATCH").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Reject values the pipelines cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            bail!("window_secs must be greater than zero");
        }
        if self.broadcast_capacity == 0 {
            bail!("broadcast_capacity must be greater than zero");
        }
        if self.history_len == 0 {
            bail!("history_len must be greater than zero");
        }
        if !(self.y_max.is_finite() && self.y_max > 0.0) {
            bail!("y_max must be a positive number");
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            bail!("backoff_base_ms must not exceed backoff_max_ms");
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(10))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            rate: RateConfig {
                window: self.window(),
                missed: self.missed_window,
            },
            broadcast_capacity: self.broadcast_capacity,
        }
    }

    /// Reconnect policy for the websocket connector.
    pub fn backoff(&self) -> Option<Backoff> {
        self.reconnect.then(|| Backoff {
            base: Duration::from_millis(self.backoff_base_ms),
            max: Duration::from_millis(self.backoff_max_ms),
        })
    }

    /// An empty dashboard configured from these settings.
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(
            RateChart::new(self.history_len, self.annotation_limit, self.y_max),
            &self.initial_ticker_text,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_pipeline_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.url, DEFAULT_FEED_URL);
        assert_eq!(settings.pipeline_config(), PipelineConfig::default());
        assert_eq!(settings.backoff(), Some(Backoff::default()));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
url = "wss://example.org/feed"
window_secs = 10
missed_window = "coalesce"
annotation_limit = 25
reconnect = false
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.url, "wss://example.org/feed");
        assert_eq!(settings.window(), Duration::from_secs(10));
        assert_eq!(settings.missed_window, MissedWindowPolicy::Coalesce);
        assert_eq!(settings.annotation_limit, Some(25));
        assert_eq!(settings.backoff(), None);
        // Unspecified fields keep their defaults
        assert_eq!(settings.history_len, DEFAULT_HISTORY_LEN);
    }

    #[test]
    fn test_invalid_file_value_can_be_overridden() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "window_secs = 0").unwrap();

        let mut settings = Settings::load(Some(file.path())).unwrap();
        assert!(settings.validate().is_err());

        settings.window_secs = 5;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let settings = Settings {
            window_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            backoff_base_ms: 60_000,
            backoff_max_ms: 1_000,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_dashboard_uses_initial_text() {
        let settings = Settings {
            initial_ticker_text: "hello".into(),
            ..Settings::default()
        };
        assert_eq!(settings.dashboard().ticker(), "hello");
    }
}
