//! Application configuration loading and validation.
//!
//! ```no_run
//! use crossarb::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::execution::{ExecutionConfig, QuotesConfig};
use super::logging::LoggingConfig;
use super::symbol::SymbolEntry;
use super::venue::{VenueConfig, VenuesConfig};
use crate::application::EngineConfig;
use crate::domain::Symbol;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Maker and taker venues.
    #[serde(default)]
    pub venues: VenuesConfig,

    #[serde(default)]
    pub quotes: QuotesConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Traded symbols. At least one is required.
    #[serde(default)]
    pub symbols: Vec<SymbolEntry>,
}

impl Config {
    /// Parse and validate configuration from TOML content.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    pub fn init_logging(&self) {
        if !self.logging.init() {
            tracing::debug!("Tracing subscriber already installed");
        }
    }

    /// Engine configuration, restricted to `only` when it is non-empty.
    pub fn engine_config(&self, only: &[Symbol]) -> Result<EngineConfig> {
        let symbols: Vec<_> = self
            .symbols
            .iter()
            .filter(|entry| only.is_empty() || only.contains(&entry.symbol()))
            .map(|entry| entry.to_symbol_config(self.execution.drift_tolerance))
            .collect();

        if let Some(missing) = only
            .iter()
            .find(|s| !self.symbols.iter().any(|entry| &entry.symbol() == *s))
        {
            return Err(ConfigError::InvalidValue {
                field: "symbol",
                reason: format!("{missing} is not configured"),
            }
            .into());
        }

        Ok(EngineConfig {
            symbols,
            cycle: (&self.execution).into(),
            lifecycle: (&self.execution).into(),
            quote_age: (&self.quotes).into(),
            evaluation_interval: Duration::from_millis(self.execution.evaluation_interval_ms),
            reconciliation_interval: Duration::from_secs(self.execution.reconciliation_interval_secs),
        })
    }

    fn validate(&self) -> Result<()> {
        validate_venue(&self.venues.maker)?;
        validate_venue(&self.venues.taker)?;
        if self.venues.maker.name == self.venues.taker.name {
            return Err(invalid("name", "maker and taker venues must have different names"));
        }

        if self.quotes.staleness_bound_push_ms == 0 {
            return Err(invalid("staleness_bound_push_ms", "must be greater than 0"));
        }
        if self.quotes.staleness_bound_poll_ms == Some(0) {
            return Err(invalid("staleness_bound_poll_ms", "must be greater than 0"));
        }

        let execution = &self.execution;
        if execution.maker_order_timeout_ms == 0 {
            return Err(invalid("maker_order_timeout_ms", "must be greater than 0"));
        }
        if execution.taker_order_timeout_ms == 0 {
            return Err(invalid("taker_order_timeout_ms", "must be greater than 0"));
        }
        if execution.status_retry_attempts == 0 {
            return Err(invalid("status_retry_attempts", "must be greater than 0"));
        }
        if execution.evaluation_interval_ms == 0 {
            return Err(invalid("evaluation_interval_ms", "must be greater than 0"));
        }
        if execution.reconciliation_interval_secs == 0 {
            return Err(invalid("reconciliation_interval_secs", "must be greater than 0"));
        }
        if execution.drift_tolerance < Decimal::ZERO {
            return Err(invalid("drift_tolerance", "must be 0 or greater"));
        }

        if self.symbols.is_empty() {
            return Err(ConfigError::MissingField { field: "symbols" }.into());
        }
        let mut seen = HashSet::new();
        for entry in &self.symbols {
            validate_symbol(entry)?;
            if !seen.insert(entry.symbol()) {
                return Err(ConfigError::InvalidValue {
                    field: "symbol",
                    reason: format!("{} is configured twice", entry.symbol()),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

fn validate_venue(venue: &VenueConfig) -> Result<()> {
    if venue.name.trim().is_empty() {
        return Err(ConfigError::MissingField { field: "name" }.into());
    }
    if venue.poll_interval_ms == 0 {
        return Err(invalid("poll_interval_ms", "must be greater than 0"));
    }
    let paper = &venue.paper;
    if paper.initial_price <= Decimal::ZERO {
        return Err(invalid("initial_price", "must be greater than 0"));
    }
    if paper.half_spread <= Decimal::ZERO {
        return Err(invalid("half_spread", "must be greater than 0"));
    }
    if paper.volatility < Decimal::ZERO {
        return Err(invalid("volatility", "must be 0 or greater"));
    }
    if !(0.0..=1.0).contains(&paper.fill_probability) {
        return Err(invalid("fill_probability", "must be between 0 and 1"));
    }
    if paper.tick_interval_ms == 0 {
        return Err(invalid("tick_interval_ms", "must be greater than 0"));
    }
    if paper.order_retention_secs == 0 {
        return Err(invalid("order_retention_secs", "must be greater than 0"));
    }
    Ok(())
}

fn validate_symbol(entry: &SymbolEntry) -> Result<()> {
    if entry.symbol.trim().is_empty() {
        return Err(ConfigError::MissingField { field: "symbol" }.into());
    }
    if entry.order_quantity <= Decimal::ZERO {
        return Err(invalid("order_quantity", "must be greater than 0"));
    }
    if entry.max_position < entry.order_quantity {
        return Err(invalid("max_position", "must be at least order_quantity"));
    }
    if entry.max_venue_position() < entry.order_quantity {
        return Err(invalid("max_venue_position", "must be at least order_quantity"));
    }
    if entry.imbalance_limit() < Decimal::ZERO {
        return Err(invalid("imbalance_limit", "must be 0 or greater"));
    }
    Ok(())
}
