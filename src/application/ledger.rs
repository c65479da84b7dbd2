//! Position ledger.
//!
//! Tracks signed net position per (symbol, venue) and the combined position
//! per symbol. Exposure is reserved before an order is placed, then either
//! committed with the confirmed fill or released.
//!
//! Every symbol has its own lock: all ledger mutations for one symbol are
//! strictly sequential, while different symbols never contend.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::{Position, Quantity, Symbol, VenueId};
use crate::error::{Error, LedgerError, RiskError};
use crate::port::{Event, EventSink};

/// Exposure bounds for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolLimits {
    /// Maximum |combined position| across venues.
    pub max_position: Quantity,
    /// Maximum |position| on any single venue.
    pub max_venue_position: Quantity,
    /// Reconciliation drift above this is reported.
    pub drift_tolerance: Quantity,
}

impl SymbolLimits {
    /// Limits with the per-venue bound equal to the combined bound.
    #[must_use]
    pub fn new(max_position: Quantity) -> Self {
        Self {
            max_position,
            max_venue_position: max_position,
            drift_tolerance: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn with_venue_limit(mut self, max_venue_position: Quantity) -> Self {
        self.max_venue_position = max_venue_position;
        self
    }

    #[must_use]
    pub fn with_drift_tolerance(mut self, tolerance: Quantity) -> Self {
        self.drift_tolerance = tolerance;
        self
    }
}

/// Provisionally applied exposure.
///
/// Must be handed back through [`PositionLedger::commit`],
/// [`PositionLedger::commit_filled`] or [`PositionLedger::release`].
#[must_use = "a reservation holds exposure until committed or released"]
#[derive(Debug, PartialEq, Eq)]
pub struct Reservation {
    id: u64,
    symbol: Symbol,
    venue: VenueId,
    delta: Quantity,
}

impl Reservation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn venue(&self) -> &VenueId {
        &self.venue
    }

    pub fn delta(&self) -> Quantity {
        self.delta
    }
}

/// Result of replacing a tracked position with the venue's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub tracked: Quantity,
    pub authoritative: Quantity,
    pub drift: Quantity,
    /// True if |drift| exceeded the tolerance.
    pub drifted: bool,
}

/// Committed and pending exposure for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Exposure {
    pub committed: Quantity,
    pub pending: Quantity,
}

impl Exposure {
    #[must_use]
    pub fn projected(&self) -> Quantity {
        self.committed + self.pending
    }
}

struct SymbolBook {
    symbol: Symbol,
    limits: SymbolLimits,
    positions: BTreeMap<VenueId, Position>,
    pending: HashMap<u64, (VenueId, Quantity)>,
}

impl SymbolBook {
    fn new(symbol: Symbol, limits: SymbolLimits) -> Self {
        Self {
            symbol,
            limits,
            positions: BTreeMap::new(),
            pending: HashMap::new(),
        }
    }

    fn position_mut(&mut self, venue: &VenueId) -> &mut Position {
        let symbol = self.symbol.clone();
        self.positions
            .entry(venue.clone())
            .or_insert_with(|| Position::flat(venue.clone(), symbol))
    }

    fn committed(&self, venue: &VenueId) -> Quantity {
        self.positions
            .get(venue)
            .map(Position::quantity)
            .unwrap_or_default()
    }

    /// Position if `delta` and every pending reservation on the same side
    /// were filled, on one venue or across all of them.
    fn worst_case(&self, venue: Option<&VenueId>, delta: Quantity) -> Quantity {
        let committed = match venue {
            Some(venue) => self.committed(venue),
            None => self.exposure().committed,
        };
        let same_side: Quantity = self
            .pending
            .values()
            .filter(|(v, _)| venue.map_or(true, |venue| v == venue))
            .map(|(_, d)| *d)
            .filter(|d| d.is_sign_negative() == delta.is_sign_negative())
            .sum();
        committed + same_side + delta
    }

    fn exposure(&self) -> Exposure {
        Exposure {
            committed: self.positions.values().map(Position::quantity).sum(),
            pending: self.pending.values().map(|(_, delta)| *delta).sum(),
        }
    }
}

/// Authoritative net-exposure tracker, partitioned by symbol.
pub struct PositionLedger {
    books: DashMap<Symbol, Arc<Mutex<SymbolBook>>>,
    next_reservation: AtomicU64,
    sink: Arc<dyn EventSink>,
}

impl PositionLedger {
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            books: DashMap::new(),
            next_reservation: AtomicU64::new(1),
            sink,
        }
    }

    /// Register a symbol, or update its limits if already registered.
    pub fn register(&self, symbol: Symbol, limits: SymbolLimits) {
        if let Some(book) = self.books.get(&symbol) {
            book.lock().limits = limits;
            return;
        }
        self.books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(SymbolBook::new(symbol, limits))));
    }

    /// Registered symbols.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<_> = self.books.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Reserve `delta` on `venue`, checking combined and per-venue bounds.
    ///
    /// Pending reservations on the same side count towards both bounds, so
    /// no order in which concurrent reservations settle can exceed them.
    pub fn reserve(&self, symbol: &Symbol, venue: &VenueId, delta: Quantity) -> Result<Reservation, Error> {
        let book = self.book(symbol)?;
        let mut book = book.lock();

        let projected = book.worst_case(None, delta);
        if projected.abs() > book.limits.max_position {
            warn!(
                symbol = %symbol,
                venue = %venue,
                delta = %delta,
                projected = %projected,
                limit = %book.limits.max_position,
                "Combined position limit would be exceeded"
            );
            return Err(RiskError::PositionLimitExceeded {
                symbol: symbol.to_string(),
                projected,
                limit: book.limits.max_position,
            }
            .into());
        }

        let venue_projected = book.worst_case(Some(venue), delta);
        if venue_projected.abs() > book.limits.max_venue_position {
            warn!(
                symbol = %symbol,
                venue = %venue,
                delta = %delta,
                projected = %venue_projected,
                limit = %book.limits.max_venue_position,
                "Venue position limit would be exceeded"
            );
            return Err(RiskError::VenueLimitExceeded {
                symbol: symbol.to_string(),
                venue: venue.to_string(),
                projected: venue_projected,
                limit: book.limits.max_venue_position,
            }
            .into());
        }

        let id = self.next_reservation.fetch_add(1, Ordering::Relaxed);
        book.pending.insert(id, (venue.clone(), delta));
        debug!(symbol = %symbol, venue = %venue, delta = %delta, reservation = id, "Exposure reserved");

        Ok(Reservation {
            id,
            symbol: symbol.clone(),
            venue: venue.clone(),
            delta,
        })
    }

    /// Make a reservation permanent for its full quantity.
    pub fn commit(&self, reservation: Reservation) -> Result<Quantity, LedgerError> {
        let delta = reservation.delta;
        self.commit_filled(reservation, delta)
    }

    /// Settle a reservation with the quantity that actually filled.
    ///
    /// The unfilled remainder is released. Returns the venue's new position.
    pub fn commit_filled(&self, reservation: Reservation, filled: Quantity) -> Result<Quantity, LedgerError> {
        let book = self.book(&reservation.symbol)?;
        let mut book = book.lock();
        book.pending
            .remove(&reservation.id)
            .ok_or(LedgerError::UnknownReservation(reservation.id))?;

        let position = book.position_mut(&reservation.venue);
        position.apply(filled);
        let quantity = position.quantity();
        info!(
            symbol = %reservation.symbol,
            venue = %reservation.venue,
            reserved = %reservation.delta,
            filled = %filled,
            position = %quantity,
            "Reservation committed"
        );
        Ok(quantity)
    }

    /// Roll a reservation back without changing any position.
    pub fn release(&self, reservation: Reservation) -> Result<(), LedgerError> {
        let book = self.book(&reservation.symbol)?;
        let mut book = book.lock();
        book.pending
            .remove(&reservation.id)
            .ok_or(LedgerError::UnknownReservation(reservation.id))?;
        debug!(
            symbol = %reservation.symbol,
            venue = %reservation.venue,
            delta = %reservation.delta,
            "Reservation released"
        );
        Ok(())
    }

    /// Apply a confirmed fill that was not reserved (hedge or unwind legs).
    pub fn record_fill(&self, symbol: &Symbol, venue: &VenueId, delta: Quantity) -> Result<Quantity, LedgerError> {
        let book = self.book(symbol)?;
        let mut book = book.lock();
        let position = book.position_mut(venue);
        position.apply(delta);
        let quantity = position.quantity();
        info!(symbol = %symbol, venue = %venue, delta = %delta, position = %quantity, "Fill recorded");
        Ok(quantity)
    }

    /// Replace the tracked position on `venue` with the venue's own value.
    ///
    /// Pending reservations are left untouched. Emits a drift event when the
    /// correction exceeds the symbol's tolerance.
    pub fn reconcile(
        &self,
        symbol: &Symbol,
        venue: &VenueId,
        authoritative: Quantity,
    ) -> Result<Reconciliation, LedgerError> {
        let book = self.book(symbol)?;
        let mut book = book.lock();
        let tolerance = book.limits.drift_tolerance;
        let position = book.position_mut(venue);
        let tracked = position.quantity();
        let drift = position.replace(authoritative, Utc::now());
        let drifted = drift.abs() > tolerance;

        if drifted {
            warn!(
                symbol = %symbol,
                venue = %venue,
                tracked = %tracked,
                authoritative = %authoritative,
                drift = %drift,
                "Position drift corrected"
            );
            self.sink.emit(Event::PositionDrift {
                venue: venue.clone(),
                symbol: symbol.clone(),
                tracked,
                authoritative,
                drift,
            });
        } else {
            debug!(symbol = %symbol, venue = %venue, position = %authoritative, "Position reconciled");
        }

        Ok(Reconciliation {
            venue: venue.clone(),
            symbol: symbol.clone(),
            tracked,
            authoritative,
            drift,
            drifted,
        })
    }

    /// Tracked position on one venue.
    #[must_use]
    pub fn position(&self, symbol: &Symbol, venue: &VenueId) -> Option<Position> {
        let book = self.books.get(symbol)?.clone();
        let book = book.lock();
        book.positions.get(venue).cloned()
    }

    /// Tracked quantity on one venue, zero if never touched.
    #[must_use]
    pub fn quantity(&self, symbol: &Symbol, venue: &VenueId) -> Quantity {
        self.position(symbol, venue)
            .map(|p| p.quantity())
            .unwrap_or_default()
    }

    /// All tracked positions for a symbol.
    #[must_use]
    pub fn positions(&self, symbol: &Symbol) -> Vec<Position> {
        match self.books.get(symbol).map(|b| b.clone()) {
            Some(book) => book.lock().positions.values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Committed combined position for a symbol.
    #[must_use]
    pub fn combined(&self, symbol: &Symbol) -> Quantity {
        self.exposure(symbol).committed
    }

    /// Committed and pending exposure for a symbol.
    #[must_use]
    pub fn exposure(&self, symbol: &Symbol) -> Exposure {
        match self.books.get(symbol).map(|b| b.clone()) {
            Some(book) => book.lock().exposure(),
            None => Exposure::default(),
        }
    }

    /// Limits registered for a symbol.
    #[must_use]
    pub fn limits(&self, symbol: &Symbol) -> Option<SymbolLimits> {
        let book = self.books.get(symbol)?.clone();
        let limits = book.lock().limits.clone();
        Some(limits)
    }

    fn book(&self, symbol: &Symbol) -> Result<Arc<Mutex<SymbolBook>>, LedgerError> {
        self.books
            .get(symbol)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::UnknownSymbol(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::NullSink;
    use rust_decimal_macros::dec;

    fn ledger(max: Quantity) -> PositionLedger {
        let ledger = PositionLedger::new(Arc::new(NullSink));
        ledger.register(Symbol::from("BTC"), SymbolLimits::new(max));
        ledger
    }

    fn btc() -> Symbol {
        Symbol::from("BTC")
    }

    fn maker() -> VenueId {
        VenueId::from("maker")
    }

    fn taker() -> VenueId {
        VenueId::from("taker")
    }

    #[test]
    fn reserve_then_commit_moves_position() {
        let ledger = ledger(dec!(0.1));
        let res = ledger.reserve(&btc(), &maker(), dec!(0.01)).unwrap();
        assert_eq!(ledger.exposure(&btc()).pending, dec!(0.01));

        ledger.commit(res).unwrap();
        assert_eq!(ledger.quantity(&btc(), &maker()), dec!(0.01));
        assert_eq!(ledger.exposure(&btc()).pending, Decimal::ZERO);
    }

    #[test]
    fn release_rolls_back() {
        let ledger = ledger(dec!(0.1));
        let res = ledger.reserve(&btc(), &maker(), dec!(0.05)).unwrap();
        ledger.release(res).unwrap();
        assert_eq!(ledger.exposure(&btc()), Exposure::default());
    }

    #[test]
    fn commit_filled_releases_remainder() {
        let ledger = ledger(dec!(0.1));
        let res = ledger.reserve(&btc(), &maker(), dec!(-0.04)).unwrap();
        ledger.commit_filled(res, dec!(-0.01)).unwrap();
        assert_eq!(ledger.combined(&btc()), dec!(-0.01));
        assert_eq!(ledger.exposure(&btc()).pending, Decimal::ZERO);
    }

    #[test]
    fn reserve_rejects_combined_breach() {
        let ledger = ledger(dec!(0.1));
        ledger.register(btc(), SymbolLimits::new(dec!(0.1)).with_venue_limit(dec!(1)));
        let _held = ledger.reserve(&btc(), &maker(), dec!(0.08)).unwrap();
        let err = ledger.reserve(&btc(), &taker(), dec!(0.03)).unwrap_err();
        assert!(matches!(err, Error::Risk(RiskError::PositionLimitExceeded { .. })));
    }

    #[test]
    fn reserve_rejects_venue_breach_even_when_hedged() {
        let ledger = ledger(dec!(0.1));
        ledger.record_fill(&btc(), &maker(), dec!(0.1)).unwrap();
        ledger.record_fill(&btc(), &taker(), dec!(-0.1)).unwrap();
        assert_eq!(ledger.combined(&btc()), Decimal::ZERO);

        let err = ledger.reserve(&btc(), &maker(), dec!(0.01)).unwrap_err();
        assert!(matches!(err, Error::Risk(RiskError::VenueLimitExceeded { .. })));
        // reducing the venue position is still allowed
        assert!(ledger.reserve(&btc(), &maker(), dec!(-0.01)).is_ok());
    }

    #[test]
    fn opposite_pending_does_not_free_room() {
        let ledger = ledger(dec!(0.1));
        ledger.record_fill(&btc(), &maker(), dec!(0.1)).unwrap();
        let _sell = ledger.reserve(&btc(), &taker(), dec!(-0.05)).unwrap();
        // the sell may still be released, so the buy could land on top of 0.1
        assert!(ledger.reserve(&btc(), &maker(), dec!(0.01)).is_err());
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let ledger = ledger(dec!(0.1));
        let err = ledger.reserve(&Symbol::from("DOGE"), &maker(), dec!(1)).unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::UnknownSymbol(_))));
    }

    #[test]
    fn reconcile_replaces_and_flags_drift() {
        let ledger = PositionLedger::new(Arc::new(NullSink));
        ledger.register(
            btc(),
            SymbolLimits::new(dec!(1)).with_drift_tolerance(dec!(0.001)),
        );
        ledger.record_fill(&btc(), &maker(), dec!(0.01)).unwrap();

        let quiet = ledger.reconcile(&btc(), &maker(), dec!(0.0105)).unwrap();
        assert!(!quiet.drifted);

        let loud = ledger.reconcile(&btc(), &maker(), dec!(0)).unwrap();
        assert!(loud.drifted);
        assert_eq!(loud.drift, dec!(-0.0105));
        assert_eq!(ledger.quantity(&btc(), &maker()), Decimal::ZERO);
        assert!(ledger
            .position(&btc(), &maker())
            .and_then(|p| p.last_reconciled_at())
            .is_some());
    }

    #[test]
    fn reconcile_keeps_pending() {
        let ledger = ledger(dec!(0.1));
        let res = ledger.reserve(&btc(), &maker(), dec!(0.02)).unwrap();
        ledger.reconcile(&btc(), &maker(), dec!(0.05)).unwrap();
        assert_eq!(ledger.exposure(&btc()).pending, dec!(0.02));
        ledger.release(res).unwrap();
    }
}
