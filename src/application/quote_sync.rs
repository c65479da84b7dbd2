//! Quote synchronizer.
//!
//! Keeps the latest best bid/offer per (symbol, venue) and decides whether
//! the maker and taker books are fresh enough to evaluate a signal.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::trace;

use crate::domain::{Quote, QuoteDefect, Symbol, VenueId};

/// Result of recording one quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Stored as the latest quote for its venue.
    Accepted,
    /// Older than the stored quote; discarded.
    Superseded,
    /// Malformed book; discarded.
    Invalid(QuoteDefect),
    /// The quote's venue is neither the maker nor the taker.
    UnknownVenue,
}

impl Observation {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Why quotes cannot be used right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReady {
    Missing { venue: VenueId },
    Stale { venue: VenueId, age: Duration },
}

/// Fresh quotes for both venues.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedQuotes {
    pub maker: Quote,
    pub taker: Quote,
}

/// Latest quote for one venue with its staleness flag.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueQuote {
    pub quote: Quote,
    pub stale: bool,
}

/// Per-venue view of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    pub maker: Option<VenueQuote>,
    pub taker: Option<VenueQuote>,
}

/// Maximum quote age for one venue.
#[derive(Debug, Clone)]
pub struct VenueBound {
    pub venue: VenueId,
    pub max_age: Duration,
}

impl VenueBound {
    pub fn new(venue: impl Into<VenueId>, max_age: Duration) -> Self {
        Self {
            venue: venue.into(),
            max_age,
        }
    }
}

/// Latest-quote store for the maker and taker venues.
///
/// Safe to call from several ingestion tasks at once. Per venue the quote
/// with the newest observation timestamp wins, so a slow poll response never
/// overwrites a fresher push update.
pub struct QuoteSynchronizer {
    maker: VenueBound,
    taker: VenueBound,
    quotes: RwLock<HashMap<(Symbol, VenueId), Quote>>,
}

impl QuoteSynchronizer {
    #[must_use]
    pub fn new(maker: VenueBound, taker: VenueBound) -> Self {
        Self {
            maker,
            taker,
            quotes: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn maker_venue(&self) -> &VenueId {
        &self.maker.venue
    }

    #[must_use]
    pub fn taker_venue(&self) -> &VenueId {
        &self.taker.venue
    }

    /// Record a quote, replacing any older one for the same venue and symbol.
    pub fn observe(&self, quote: Quote) -> Observation {
        if quote.venue != self.maker.venue && quote.venue != self.taker.venue {
            return Observation::UnknownVenue;
        }
        if let Err(defect) = quote.validate() {
            return Observation::Invalid(defect);
        }

        let key = (quote.symbol.clone(), quote.venue.clone());
        let mut quotes = self.quotes.write();
        if let Some(existing) = quotes.get(&key) {
            if existing.observed_at > quote.observed_at {
                trace!(
                    venue = %quote.venue,
                    symbol = %quote.symbol,
                    stored = %existing.observed_at,
                    incoming = %quote.observed_at,
                    "Discarding out-of-order quote"
                );
                return Observation::Superseded;
            }
        }
        quotes.insert(key, quote);
        Observation::Accepted
    }

    /// Fresh maker and taker quotes for `symbol`, or why they are not usable.
    pub fn current(&self, symbol: &Symbol) -> Result<SyncedQuotes, NotReady> {
        self.current_at(symbol, Utc::now())
    }

    /// Same as [`current`](Self::current) against an explicit clock.
    pub fn current_at(&self, symbol: &Symbol, now: DateTime<Utc>) -> Result<SyncedQuotes, NotReady> {
        let quotes = self.quotes.read();
        let maker = Self::fresh(&quotes, symbol, &self.maker, now)?;
        let taker = Self::fresh(&quotes, symbol, &self.taker, now)?;
        Ok(SyncedQuotes { maker, taker })
    }

    /// Latest quotes with staleness flags, whether or not they are usable.
    #[must_use]
    pub fn snapshot_at(&self, symbol: &Symbol, now: DateTime<Utc>) -> QuoteSnapshot {
        let quotes = self.quotes.read();
        let view = |bound: &VenueBound| {
            quotes
                .get(&(symbol.clone(), bound.venue.clone()))
                .map(|q| VenueQuote {
                    stale: q.is_stale_at(now, bound.max_age),
                    quote: q.clone(),
                })
        };
        QuoteSnapshot {
            maker: view(&self.maker),
            taker: view(&self.taker),
        }
    }

    fn fresh(
        quotes: &HashMap<(Symbol, VenueId), Quote>,
        symbol: &Symbol,
        bound: &VenueBound,
        now: DateTime<Utc>,
    ) -> Result<Quote, NotReady> {
        let quote = quotes
            .get(&(symbol.clone(), bound.venue.clone()))
            .ok_or_else(|| NotReady::Missing {
                venue: bound.venue.clone(),
            })?;
        if quote.is_stale_at(now, bound.max_age) {
            return Err(NotReady::Stale {
                venue: bound.venue.clone(),
                age: quote.age_at(now),
            });
        }
        Ok(quote.clone())
    }
}
