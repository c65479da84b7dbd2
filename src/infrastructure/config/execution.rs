//! Quote freshness and execution timing.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::{CycleConfig, LifecycleConfig, QuoteAgeConfig};

/// Maximum quote age before a venue's book is considered stale.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotesConfig {
    #[serde(default = "default_staleness_bound_push_ms")]
    pub staleness_bound_push_ms: u64,
    /// Defaults to twice the venue's poll interval.
    #[serde(default)]
    pub staleness_bound_poll_ms: Option<u64>,
}

const fn default_staleness_bound_push_ms() -> u64 {
    2000
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            staleness_bound_push_ms: default_staleness_bound_push_ms(),
            staleness_bound_poll_ms: None,
        }
    }
}

impl From<&QuotesConfig> for QuoteAgeConfig {
    fn from(config: &QuotesConfig) -> Self {
        Self {
            push: Duration::from_millis(config.staleness_bound_push_ms),
            poll: config.staleness_bound_poll_ms.map(Duration::from_millis),
        }
    }
}

/// Order timing, retries and reconciliation.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_order_timeout_ms")]
    pub maker_order_timeout_ms: u64,
    #[serde(default = "default_order_timeout_ms")]
    pub taker_order_timeout_ms: u64,
    #[serde(default = "default_status_retry_attempts")]
    pub status_retry_attempts: u32,
    #[serde(default = "default_status_retry_backoff_ms")]
    pub status_retry_backoff_ms: u64,
    #[serde(default = "default_evaluation_interval_ms")]
    pub evaluation_interval_ms: u64,
    #[serde(default = "default_reconciliation_interval_secs")]
    pub reconciliation_interval_secs: u64,
    /// Reconciliation corrections up to this size are not reported as drift.
    #[serde(default)]
    pub drift_tolerance: Decimal,
    #[serde(default = "default_unwind_on_taker_failure")]
    pub unwind_on_taker_failure: bool,
}

const fn default_order_timeout_ms() -> u64 {
    5000
}

const fn default_status_retry_attempts() -> u32 {
    3
}

const fn default_status_retry_backoff_ms() -> u64 {
    100
}

const fn default_evaluation_interval_ms() -> u64 {
    50
}

const fn default_reconciliation_interval_secs() -> u64 {
    30
}

const fn default_unwind_on_taker_failure() -> bool {
    true
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            maker_order_timeout_ms: default_order_timeout_ms(),
            taker_order_timeout_ms: default_order_timeout_ms(),
            status_retry_attempts: default_status_retry_attempts(),
            status_retry_backoff_ms: default_status_retry_backoff_ms(),
            evaluation_interval_ms: default_evaluation_interval_ms(),
            reconciliation_interval_secs: default_reconciliation_interval_secs(),
            drift_tolerance: Decimal::ZERO,
            unwind_on_taker_failure: default_unwind_on_taker_failure(),
        }
    }
}

impl From<&ExecutionConfig> for CycleConfig {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            maker_order_timeout: Duration::from_millis(config.maker_order_timeout_ms),
            taker_order_timeout: Duration::from_millis(config.taker_order_timeout_ms),
            unwind_on_taker_failure: config.unwind_on_taker_failure,
        }
    }
}

impl From<&ExecutionConfig> for LifecycleConfig {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            status_retry_attempts: config.status_retry_attempts,
            status_retry_backoff: Duration::from_millis(config.status_retry_backoff_ms),
        }
    }
}
