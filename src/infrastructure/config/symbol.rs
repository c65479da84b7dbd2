//! Per-symbol trading parameters.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::{SymbolConfig, SymbolLimits, SymbolParams};
use crate::domain::{Symbol, Thresholds};

/// One `[[symbols]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolEntry {
    pub symbol: String,
    /// Minimum taker bid minus maker bid to go long on the maker venue.
    pub long_threshold: Decimal,
    /// Minimum maker ask minus taker ask to go short on the maker venue.
    pub short_threshold: Decimal,
    pub order_quantity: Decimal,
    pub max_position: Decimal,
    /// Defaults to `max_position`.
    #[serde(default)]
    pub max_venue_position: Option<Decimal>,
    /// Defaults to twice `order_quantity`.
    #[serde(default)]
    pub imbalance_limit: Option<Decimal>,
}

impl SymbolEntry {
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        Symbol::new(&self.symbol)
    }

    #[must_use]
    pub fn imbalance_limit(&self) -> Decimal {
        self.imbalance_limit
            .unwrap_or(self.order_quantity * Decimal::TWO)
    }

    #[must_use]
    pub fn max_venue_position(&self) -> Decimal {
        self.max_venue_position.unwrap_or(self.max_position)
    }

    /// Engine parameters for this symbol.
    #[must_use]
    pub fn to_symbol_config(&self, drift_tolerance: Decimal) -> SymbolConfig {
        SymbolConfig {
            params: SymbolParams {
                symbol: self.symbol(),
                thresholds: Thresholds {
                    long: self.long_threshold,
                    short: self.short_threshold,
                },
                order_quantity: self.order_quantity,
                imbalance_limit: self.imbalance_limit(),
            },
            limits: SymbolLimits::new(self.max_position)
                .with_venue_limit(self.max_venue_position())
                .with_drift_tolerance(drift_tolerance),
        }
    }
}
