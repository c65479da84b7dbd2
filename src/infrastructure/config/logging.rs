//! `[logging]` section and tracing subscriber setup.
//!
//! Engine events reach the log through `LogEventSink`, so this subscriber
//! is the only place they are rendered. `RUST_LOG` takes precedence over
//! the configured level, which lets a single module (for example
//! `crossarb::application::order_lifecycle=debug`) be turned up without
//! editing the file.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines for a terminal.
    #[default]
    Pretty,
    /// One JSON object per line, with event fields flattened.
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Filter from `RUST_LOG`, falling back to the configured level.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber.
    ///
    /// Returns false if one was already installed; the existing one is kept.
    pub fn init(&self) -> bool {
        let builder = fmt().with_env_filter(self.filter()).with_target(true);
        let installed = match self.format {
            LogFormat::Json => builder.json().flatten_event(true).try_init(),
            LogFormat::Pretty => builder.try_init(),
        };
        installed.is_ok()
    }
}
