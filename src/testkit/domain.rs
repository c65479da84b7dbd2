//! Builders for domain primitives used across tests.

use rust_decimal::Decimal;

use crate::application::{SymbolConfig, SymbolLimits, SymbolParams};
use crate::domain::{Price, PriceLevel, Quote, QuoteSource, Symbol, Thresholds};

/// A quote observed now, with unit size on both sides.
pub fn quote(venue: &str, symbol: &str, bid: Price, ask: Price) -> Quote {
    Quote::new(
        venue,
        symbol,
        PriceLevel::new(bid, Decimal::ONE),
        PriceLevel::new(ask, Decimal::ONE),
        QuoteSource::Push,
    )
}

/// Symbol parameters with equal long and short thresholds.
pub fn symbol_config(
    symbol: &str,
    threshold: Price,
    order_quantity: Decimal,
    max_position: Decimal,
) -> SymbolConfig {
    SymbolConfig {
        params: SymbolParams {
            symbol: Symbol::new(symbol),
            thresholds: Thresholds {
                long: threshold,
                short: threshold,
            },
            order_quantity,
            imbalance_limit: order_quantity * Decimal::TWO,
        },
        limits: SymbolLimits::new(max_position),
    }
}
