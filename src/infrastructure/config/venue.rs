//! Venue configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::adapter::PaperConfig;
use crate::port::Delivery;

/// The maker and taker venue pair.
#[derive(Debug, Clone, Deserialize)]
pub struct VenuesConfig {
    #[serde(default = "default_maker")]
    pub maker: VenueConfig,
    #[serde(default = "default_taker")]
    pub taker: VenueConfig,
}

impl Default for VenuesConfig {
    fn default() -> Self {
        Self {
            maker: default_maker(),
            taker: default_taker(),
        }
    }
}

fn default_maker() -> VenueConfig {
    VenueConfig::named("maker", Delivery::Push)
}

fn default_taker() -> VenueConfig {
    VenueConfig::named("taker", Delivery::Poll)
}

/// One venue.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    pub name: String,
    #[serde(default)]
    pub delivery: Delivery,
    /// Quote and order-status polling interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Simulation settings used by the paper venue.
    #[serde(default)]
    pub paper: PaperSettings,
}

const fn default_poll_interval_ms() -> u64 {
    500
}

impl VenueConfig {
    fn named(name: &str, delivery: Delivery) -> Self {
        Self {
            name: name.into(),
            delivery,
            poll_interval_ms: default_poll_interval_ms(),
            paper: PaperSettings::default(),
        }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Paper venue simulation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperSettings {
    #[serde(default = "default_initial_price")]
    pub initial_price: Decimal,
    #[serde(default = "default_half_spread")]
    pub half_spread: Decimal,
    #[serde(default = "default_volatility")]
    pub volatility: Decimal,
    #[serde(default = "default_fill_probability")]
    pub fill_probability: f64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How long closed orders stay queryable.
    #[serde(default = "default_order_retention_secs")]
    pub order_retention_secs: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_initial_price() -> Decimal {
    Decimal::from(100)
}

fn default_half_spread() -> Decimal {
    Decimal::new(5, 2)
}

fn default_volatility() -> Decimal {
    Decimal::new(10, 2)
}

const fn default_fill_probability() -> f64 {
    0.05
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_order_retention_secs() -> u64 {
    60
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            initial_price: default_initial_price(),
            half_spread: default_half_spread(),
            volatility: default_volatility(),
            fill_probability: default_fill_probability(),
            tick_interval_ms: default_tick_interval_ms(),
            order_retention_secs: default_order_retention_secs(),
            seed: None,
        }
    }
}

impl From<&PaperSettings> for PaperConfig {
    fn from(settings: &PaperSettings) -> Self {
        Self {
            initial_price: settings.initial_price,
            half_spread: settings.half_spread,
            volatility: settings.volatility,
            fill_probability: settings.fill_probability,
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            order_retention: Duration::from_secs(settings.order_retention_secs),
            seed: settings.seed,
        }
    }
}
