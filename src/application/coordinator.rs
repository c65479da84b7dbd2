//! Trade cycle coordinator.
//!
//! Turns a spread signal into a hedged pair of orders:
//!
//! 1. Reserve the maker exposure in the ledger
//! 2. Place a post-only maker order at the maker venue's touch
//! 3. Wait for the maker fill, cancelling at the deadline
//! 4. Hedge exactly the confirmed fill with a market order on the taker venue,
//!    even when the maker order later became unknown
//! 5. If the hedge fails, attempt one unwind on the maker venue
//!
//! At most one cycle per symbol is active at a time, and reconciliation
//! sweeps take the same slot. Every cycle ends in a
//! [`CycleOutcome`] and a [`Event::CycleClosed`] event; failures never
//! propagate out of [`TradeCycleCoordinator::run_cycle`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::ledger::{PositionLedger, Reconciliation, Reservation};
use super::order_lifecycle::{AwaitOutcome, OrderLifecycleManager};
use super::quote_sync::QuoteSynchronizer;
use crate::domain::{
    evaluate, CycleOutcome, CycleState, Order, OrderSpec, OrderStatus, Price, Quantity, Side,
    Signal, Symbol, Thresholds, TradeCycle,
};
use crate::port::{CycleSummary, Event, EventSink};

/// Trading parameters for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolParams {
    pub symbol: Symbol,
    pub thresholds: Thresholds,
    pub order_quantity: Quantity,
    /// New cycles are suppressed while |combined position| exceeds this.
    pub imbalance_limit: Quantity,
}

/// Timeouts and failure policy for cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    pub maker_order_timeout: Duration,
    pub taker_order_timeout: Duration,
    pub unwind_on_taker_failure: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            maker_order_timeout: Duration::from_secs(5),
            taker_order_timeout: Duration::from_secs(5),
            unwind_on_taker_failure: true,
        }
    }
}

/// Runs maker/taker cycles with single-flight per symbol.
pub struct TradeCycleCoordinator {
    maker: Arc<OrderLifecycleManager>,
    taker: Arc<OrderLifecycleManager>,
    quotes: Arc<QuoteSynchronizer>,
    ledger: Arc<PositionLedger>,
    sink: Arc<dyn EventSink>,
    config: CycleConfig,
    params: HashMap<Symbol, SymbolParams>,
    active: Mutex<HashSet<Symbol>>,
}

impl TradeCycleCoordinator {
    pub fn new(
        maker: Arc<OrderLifecycleManager>,
        taker: Arc<OrderLifecycleManager>,
        quotes: Arc<QuoteSynchronizer>,
        ledger: Arc<PositionLedger>,
        sink: Arc<dyn EventSink>,
        config: CycleConfig,
        params: impl IntoIterator<Item = SymbolParams>,
    ) -> Self {
        Self {
            maker,
            taker,
            quotes,
            ledger,
            sink,
            config,
            params: params.into_iter().map(|p| (p.symbol.clone(), p)).collect(),
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Symbols this coordinator trades.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<_> = self.params.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Return true if a cycle for `symbol` is in flight.
    #[must_use]
    pub fn is_active(&self, symbol: &Symbol) -> bool {
        self.active.lock().contains(symbol)
    }

    /// Reconcile both venues for `symbol` unless a cycle is in flight.
    ///
    /// Holds the symbol's single-flight slot for the whole reconciliation,
    /// so no cycle can book a fill between a venue's answer and the ledger
    /// update. Returns `None` if the symbol was busy.
    pub async fn reconcile_idle(&self, symbol: &Symbol) -> Option<Vec<Reconciliation>> {
        let Some(_guard) = ActiveGuard::acquire(&self.active, symbol) else {
            debug!(symbol = %symbol, "Skipping reconciliation, cycle active");
            return None;
        };
        let (maker, taker) = tokio::join!(self.maker.reconcile(symbol), self.taker.reconcile(symbol));
        Some(maker.into_iter().chain(taker).collect())
    }

    /// Evaluate `symbol` and run one cycle if a signal fires.
    ///
    /// Returns the closed cycle, or `None` if no cycle was opened.
    pub async fn run_cycle(&self, symbol: &Symbol) -> Option<TradeCycle> {
        let Some(params) = self.params.get(symbol) else {
            warn!(symbol = %symbol, "No parameters configured for symbol");
            return None;
        };

        let quotes = match self.quotes.current(symbol) {
            Ok(quotes) => quotes,
            Err(reason) => {
                debug!(symbol = %symbol, reason = ?reason, "Quotes not ready");
                return None;
            }
        };
        let signal = evaluate(&quotes.maker, &quotes.taker, params.thresholds)?;

        let Some(_guard) = ActiveGuard::acquire(&self.active, symbol) else {
            debug!(symbol = %symbol, "Cycle already active, ignoring signal");
            self.sink.emit(Event::SignalIgnored {
                symbol: symbol.clone(),
            });
            return None;
        };

        let combined = self.ledger.combined(symbol);
        if combined.abs() > params.imbalance_limit {
            warn!(
                symbol = %symbol,
                combined = %combined,
                limit = %params.imbalance_limit,
                "Position imbalance, suppressing new cycles"
            );
            self.sink.emit(Event::ImbalanceDetected {
                symbol: symbol.clone(),
                combined,
                limit: params.imbalance_limit,
            });
            self.suppress(symbol, format!("imbalance: combined {combined} exceeds {}", params.imbalance_limit));
            self.reconcile_both(symbol).await;
            return None;
        }

        let maker_side = signal.direction.maker_side();
        let reservation = match self.ledger.reserve(
            symbol,
            self.maker.venue(),
            maker_side.signed(params.order_quantity),
        ) {
            Ok(reservation) => reservation,
            Err(e) => {
                self.suppress(symbol, e.to_string());
                return None;
            }
        };

        info!(
            symbol = %symbol,
            direction = %signal.direction,
            spread = %signal.spread,
            maker_price = %signal.maker_price,
            taker_price = %signal.taker_price,
            "Signal detected"
        );
        self.sink.emit(Event::SignalDetected {
            symbol: symbol.clone(),
            direction: signal.direction,
            spread: signal.spread,
        });

        let mut cycle = TradeCycle::open(symbol.clone(), signal.direction);
        self.execute(&mut cycle, &signal, params, reservation).await;
        self.finish(&cycle);
        Some(cycle)
    }

    async fn execute(
        &self,
        cycle: &mut TradeCycle,
        signal: &Signal,
        params: &SymbolParams,
        reservation: Reservation,
    ) {
        let symbol = cycle.symbol().clone();
        let maker_side = signal.direction.maker_side();

        let spec = OrderSpec::post_only(
            self.maker.venue().clone(),
            symbol.clone(),
            maker_side,
            signal.maker_price,
            params.order_quantity,
        );
        let mut maker = self.maker.submit(&spec).await;
        if maker.status() == OrderStatus::Rejected {
            cycle.transition(CycleState::MakerRejected);
            let note = maker
                .rejection()
                .map_or_else(|| "maker rejected".to_string(), |e| format!("maker rejected: {e}"));
            cycle.set_maker(maker);
            self.release(reservation);
            cycle.close(CycleOutcome::Aborted, Some(note));
            return;
        }
        cycle.transition(CycleState::MakerPlaced);

        if self.maker.await_terminal(&mut maker, self.config.maker_order_timeout).await
            == AwaitOutcome::TimedOut
        {
            cycle.transition(CycleState::MakerTimeout);
            debug!(symbol = %symbol, "Maker order timed out, cancelling");
            self.maker.cancel_if_open(&mut maker).await;
        }

        let filled = maker.filled_quantity();
        match maker.status() {
            OrderStatus::Unknown if filled <= Decimal::ZERO => {
                cycle.set_maker(maker);
                self.release(reservation);
                cycle.close(
                    CycleOutcome::Aborted,
                    Some("maker status unknown, position reconciled".into()),
                );
                return;
            }
            OrderStatus::Unknown if maker.is_reconciled() => {
                // the reconciled venue position already holds the fill
                self.release(reservation);
                warn!(symbol = %symbol, filled = %filled, "Maker status unknown after fill, hedging confirmed quantity");
                cycle.transition(CycleState::MakerFilled);
            }
            _ if filled > Decimal::ZERO => {
                if let Err(e) = self.ledger.commit_filled(reservation, maker.signed_filled()) {
                    warn!(symbol = %symbol, error = %e, "Failed to commit maker fill");
                }
                cycle.transition(CycleState::MakerFilled);
            }
            status => {
                cycle.set_maker(maker);
                self.release(reservation);
                cycle.close(CycleOutcome::Aborted, Some(format!("maker {status} without fill")));
                return;
            }
        }
        cycle.set_maker(maker);

        let taker_side = signal.direction.taker_side();
        let price = self
            .touch(&symbol, false, taker_side)
            .unwrap_or(signal.taker_price);
        let spec = OrderSpec::market(self.taker.venue().clone(), symbol.clone(), taker_side, price, filled);
        let mut taker = self.taker.submit(&spec).await;
        if taker.status() != OrderStatus::Rejected {
            cycle.transition(CycleState::TakerPlaced);
        }
        if taker.is_open()
            && self.taker.await_terminal(&mut taker, self.config.taker_order_timeout).await
                == AwaitOutcome::TimedOut
        {
            self.taker.cancel_if_open(&mut taker).await;
        }
        self.record(&taker);

        if taker.status() == OrderStatus::Filled && taker.filled_quantity() >= filled {
            cycle.transition(CycleState::TakerConfirmed);
            cycle.set_taker(taker);
            cycle.close(CycleOutcome::Completed, None);
            return;
        }

        cycle.transition(CycleState::TakerFailed);
        let unhedged = filled - taker.filled_quantity();
        let taker_summary = taker
            .rejection()
            .map_or_else(|| format!("taker {}", taker.status()), |e| format!("taker failed: {e}"));
        warn!(
            symbol = %symbol,
            status = %taker.status(),
            hedged = %taker.filled_quantity(),
            unhedged = %unhedged,
            "Taker leg failed"
        );
        cycle.set_taker(taker);
        cycle.transition(CycleState::Unwinding);

        let note = if !self.config.unwind_on_taker_failure || unhedged <= Decimal::ZERO {
            format!("{taker_summary}, unhedged {unhedged}")
        } else {
            let unwind = self.unwind(&symbol, maker_side.opposite(), unhedged).await;
            let note = format!(
                "{taker_summary}, unwind {} filled {} of {unhedged}",
                unwind.status(),
                unwind.filled_quantity()
            );
            cycle.set_unwind(unwind);
            note
        };
        cycle.close(CycleOutcome::PartialUnwound, Some(note));
    }

    /// One market order on the maker venue to flatten an unhedged fill.
    async fn unwind(&self, symbol: &Symbol, side: Side, quantity: Quantity) -> Order {
        let price = self.touch(symbol, true, side).unwrap_or_default();
        let spec = OrderSpec::market(self.maker.venue().clone(), symbol.clone(), side, price, quantity);
        info!(symbol = %symbol, side = %side, quantity = %quantity, "Attempting unwind");

        let mut order = self.maker.submit(&spec).await;
        if order.is_open()
            && self.maker.await_terminal(&mut order, self.config.taker_order_timeout).await
                == AwaitOutcome::TimedOut
        {
            self.maker.cancel_if_open(&mut order).await;
        }
        self.record(&order);
        order
    }

    /// Book a confirmed hedge or unwind fill.
    fn record(&self, order: &Order) {
        // unknown orders were already reconciled from the venue
        if order.status() == OrderStatus::Unknown || order.filled_quantity() <= Decimal::ZERO {
            return;
        }
        if let Err(e) = self
            .ledger
            .record_fill(order.symbol(), order.venue(), order.signed_filled())
        {
            warn!(symbol = %order.symbol(), venue = %order.venue(), error = %e, "Failed to record fill");
        }
    }

    /// Price a market order would cross at: the bid for a sell, the ask for a buy.
    fn touch(&self, symbol: &Symbol, maker_venue: bool, side: Side) -> Option<Price> {
        let snapshot = self.quotes.snapshot_at(symbol, chrono::Utc::now());
        let venue = if maker_venue { snapshot.maker } else { snapshot.taker }?;
        Some(match side {
            Side::Sell => venue.quote.bid.price,
            Side::Buy => venue.quote.ask.price,
        })
    }

    fn release(&self, reservation: Reservation) {
        if let Err(e) = self.ledger.release(reservation) {
            warn!(error = %e, "Failed to release reservation");
        }
    }

    fn suppress(&self, symbol: &Symbol, reason: String) {
        info!(symbol = %symbol, reason = %reason, "Signal suppressed");
        self.sink.emit(Event::SignalSuppressed {
            symbol: symbol.clone(),
            reason,
        });
    }

    async fn reconcile_both(&self, symbol: &Symbol) {
        tokio::join!(self.maker.reconcile(symbol), self.taker.reconcile(symbol));
    }

    fn finish(&self, cycle: &TradeCycle) {
        let summary = CycleSummary::from(cycle);
        info!(
            cycle_id = %cycle.id(),
            symbol = %cycle.symbol(),
            direction = %cycle.direction(),
            outcome = ?cycle.outcome(),
            maker_filled = %summary.maker_filled,
            taker_filled = %summary.taker_filled,
            note = summary.note.as_deref().unwrap_or(""),
            "Cycle closed"
        );
        self.sink.emit(Event::CycleClosed(summary));
    }
}

/// Marks a symbol active for as long as it is held.
struct ActiveGuard<'a> {
    active: &'a Mutex<HashSet<Symbol>>,
    symbol: Symbol,
}

impl<'a> ActiveGuard<'a> {
    fn acquire(active: &'a Mutex<HashSet<Symbol>>, symbol: &Symbol) -> Option<Self> {
        if !active.lock().insert(symbol.clone()) {
            return None;
        }
        Some(Self {
            active,
            symbol: symbol.clone(),
        })
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.symbol);
    }
}
