//! Best-bid/best-offer quotes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, Quantity, Symbol, VenueId};

/// How a quote reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    /// Delivered by a venue stream (websocket).
    Push,
    /// Fetched by a REST poll.
    Poll,
}

impl QuoteSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Poll => "poll",
        }
    }
}

/// A single top-of-book level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub size: Quantity,
}

impl PriceLevel {
    #[must_use]
    pub const fn new(price: Price, size: Quantity) -> Self {
        Self { price, size }
    }
}

/// Why a quote is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDefect {
    NonPositivePrice,
    CrossedBook,
}

/// Best bid and offer on one venue at one instant.
///
/// Quotes are replaced wholesale on every observation; fields are never
/// merged across observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub bid: PriceLevel,
    pub ask: PriceLevel,
    pub observed_at: DateTime<Utc>,
    pub source: QuoteSource,
}

impl Quote {
    /// Build a quote observed now.
    pub fn new(
        venue: impl Into<VenueId>,
        symbol: impl Into<Symbol>,
        bid: PriceLevel,
        ask: PriceLevel,
        source: QuoteSource,
    ) -> Self {
        Self {
            venue: venue.into(),
            symbol: symbol.into(),
            bid,
            ask,
            observed_at: Utc::now(),
            source,
        }
    }

    /// Override the observation timestamp.
    #[must_use]
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    /// Check the book is usable: positive prices and bid not above ask.
    pub fn validate(&self) -> Result<(), QuoteDefect> {
        if self.bid.price <= Decimal::ZERO || self.ask.price <= Decimal::ZERO {
            return Err(QuoteDefect::NonPositivePrice);
        }
        if self.bid.price > self.ask.price {
            return Err(QuoteDefect::CrossedBook);
        }
        Ok(())
    }

    /// Age of the quote relative to `now`. Timestamps in the future count as fresh.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.observed_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Return true if the quote is older than `max_age` at `now`.
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age_at(now) > max_age
    }

    #[must_use]
    pub fn mid(&self) -> Price {
        (self.bid.price + self.ask.price) / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(bid: Decimal, ask: Decimal) -> Quote {
        Quote::new(
            "maker",
            "BTC",
            PriceLevel::new(bid, dec!(1)),
            PriceLevel::new(ask, dec!(1)),
            QuoteSource::Push,
        )
    }

    #[test]
    fn locked_book_is_valid() {
        assert!(quote(dec!(100), dec!(100)).validate().is_ok());
    }

    #[test]
    fn crossed_book_is_rejected() {
        assert_eq!(
            quote(dec!(101), dec!(100)).validate(),
            Err(QuoteDefect::CrossedBook)
        );
    }

    #[test]
    fn zero_price_is_rejected() {
        assert_eq!(
            quote(dec!(0), dec!(100)).validate(),
            Err(QuoteDefect::NonPositivePrice)
        );
    }

    #[test]
    fn staleness_uses_strict_bound() {
        let now = Utc::now();
        let q = quote(dec!(100), dec!(101)).observed_at(now - chrono::Duration::seconds(2));
        assert!(!q.is_stale_at(now, Duration::from_secs(2)));
        assert!(q.is_stale_at(now, Duration::from_millis(1999)));
    }

    #[test]
    fn future_timestamp_counts_as_fresh() {
        let now = Utc::now();
        let q = quote(dec!(100), dec!(101)).observed_at(now + chrono::Duration::seconds(5));
        assert_eq!(q.age_at(now), Duration::ZERO);
    }

    #[test]
    fn mid_price() {
        assert_eq!(quote(dec!(100), dec!(102)).mid(), dec!(101));
    }
}
