//! Order lifecycle management for one venue.
//!
//! Places orders, follows them to a terminal status within a deadline and
//! cancels them when the deadline passes. Every status the core acts on comes
//! from the venue; local bookkeeping never infers a fill.
//!
//! An order whose status cannot be established after the configured retries
//! becomes [`OrderStatus::Unknown`] and triggers a position reconciliation
//! for its venue. A successful reconciliation is recorded on the order so
//! callers do not book its fill again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::ledger::{PositionLedger, Reconciliation};
use crate::domain::{Order, OrderSpec, OrderStatus, StatusReport, Symbol, VenueId};
use crate::error::GatewayError;
use crate::port::{Event, EventSink, VenueGateway};

/// Retry policy for status and position queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Consecutive connectivity failures tolerated before giving up.
    pub status_retry_attempts: u32,
    /// Base delay between retries, doubled after each failure.
    pub status_retry_backoff: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            status_retry_attempts: 3,
            status_retry_backoff: Duration::from_millis(100),
        }
    }
}

/// How a bounded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitOutcome {
    /// The order reached a terminal status (including `Unknown`).
    Terminal,
    /// The deadline passed with the order still open.
    TimedOut,
}

/// Drives orders on one venue through their lifecycle.
pub struct OrderLifecycleManager {
    gateway: Arc<dyn VenueGateway>,
    ledger: Arc<PositionLedger>,
    sink: Arc<dyn EventSink>,
    config: LifecycleConfig,
}

impl OrderLifecycleManager {
    pub fn new(
        gateway: Arc<dyn VenueGateway>,
        ledger: Arc<PositionLedger>,
        sink: Arc<dyn EventSink>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            gateway,
            ledger,
            sink,
            config,
        }
    }

    #[must_use]
    pub fn venue(&self) -> &VenueId {
        self.gateway.venue()
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn VenueGateway> {
        &self.gateway
    }

    /// Submit an order.
    ///
    /// Returns the order `Open` on acknowledgment or `Rejected` on any
    /// placement error. Placement is never retried: a connectivity failure
    /// leaves it unclear whether the order exists, so the venue's position
    /// is reconciled instead.
    pub async fn submit(&self, spec: &OrderSpec) -> Order {
        let mut order = Order::pending(spec);
        match self.gateway.place_order(spec).await {
            Ok(id) => {
                info!(
                    venue = %spec.venue,
                    symbol = %spec.symbol,
                    order_id = %id,
                    side = %spec.side,
                    price = %spec.price,
                    quantity = %spec.quantity,
                    "Order acknowledged"
                );
                self.track(&mut order, |o| o.mark_open(id));
            }
            Err(e) => {
                warn!(
                    venue = %spec.venue,
                    symbol = %spec.symbol,
                    side = %spec.side,
                    error = %e,
                    "Order placement failed"
                );
                let retryable = e.is_retryable();
                self.track(&mut order, |o| o.mark_rejected(e));
                if retryable {
                    self.reconcile(&spec.symbol).await;
                }
            }
        }
        order
    }

    /// Follow an order until it is terminal or `timeout` elapses.
    pub async fn await_terminal(&self, order: &mut Order, timeout: Duration) -> AwaitOutcome {
        let Some(order_id) = order.id().cloned() else {
            return AwaitOutcome::Terminal;
        };
        let deadline = Instant::now() + timeout;
        let mut failures = 0u32;

        loop {
            if order.is_terminal() {
                return AwaitOutcome::Terminal;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return AwaitOutcome::TimedOut;
            }

            let update = tokio::time::timeout(remaining, self.gateway.next_order_update(&order_id));
            match update.await {
                Err(_) => return AwaitOutcome::TimedOut,
                Ok(Ok(report)) => {
                    failures = 0;
                    self.apply(order, &report);
                }
                Ok(Err(e)) if e.is_retryable() && failures + 1 < self.config.status_retry_attempts => {
                    failures += 1;
                    warn!(
                        venue = %self.venue(),
                        order_id = %order_id,
                        attempt = failures,
                        error = %e,
                        "Order status query failed, retrying"
                    );
                    tokio::time::sleep(self.backoff(failures).min(remaining)).await;
                }
                Ok(Err(e)) => {
                    warn!(
                        venue = %self.venue(),
                        order_id = %order_id,
                        error = %e,
                        "Order status could not be established"
                    );
                    self.give_up(order).await;
                    return AwaitOutcome::Terminal;
                }
            }
        }
    }

    /// Cancel an order if it is still open, then re-query its final status.
    ///
    /// Returns immediately for orders that are already terminal, so calling
    /// it twice sends at most one cancel request. A fill reported by the
    /// re-query is kept even though a cancel was sent.
    pub async fn cancel_if_open(&self, order: &mut Order) {
        if !order.is_open() {
            return;
        }
        let Some(order_id) = order.id().cloned() else {
            return;
        };

        match self.gateway.cancel_order(&order_id).await {
            Ok(()) => debug!(venue = %self.venue(), order_id = %order_id, "Cancel requested"),
            // carry on: the re-query decides what happened
            Err(e) => warn!(venue = %self.venue(), order_id = %order_id, error = %e, "Cancel request failed"),
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.query(|| self.gateway.order_status(&order_id)).await {
                Ok(report) => {
                    self.apply(order, &report);
                    if order.is_terminal() {
                        return;
                    }
                    if attempt >= self.config.status_retry_attempts {
                        warn!(
                            venue = %self.venue(),
                            order_id = %order_id,
                            status = %order.status(),
                            "Order still open after cancel"
                        );
                        break;
                    }
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => {
                    warn!(
                        venue = %self.venue(),
                        order_id = %order_id,
                        error = %e,
                        "Order status unavailable after cancel"
                    );
                    break;
                }
            }
        }
        self.give_up(order).await;
    }

    /// Replace the ledger's view of this venue's position for `symbol`.
    pub async fn reconcile(&self, symbol: &Symbol) -> Option<Reconciliation> {
        let authoritative = match self.query(|| self.gateway.position(symbol)).await {
            Ok(quantity) => quantity,
            Err(e) => {
                warn!(venue = %self.venue(), symbol = %symbol, error = %e, "Position query failed");
                return None;
            }
        };
        match self.ledger.reconcile(symbol, self.venue(), authoritative) {
            Ok(reconciliation) => Some(reconciliation),
            Err(e) => {
                warn!(venue = %self.venue(), symbol = %symbol, error = %e, "Reconciliation failed");
                None
            }
        }
    }

    async fn give_up(&self, order: &mut Order) {
        self.track(order, Order::mark_unknown);
        let symbol = order.symbol().clone();
        if self.reconcile(&symbol).await.is_some() {
            order.mark_reconciled();
        }
    }

    fn apply(&self, order: &mut Order, report: &StatusReport) {
        if report.filled_quantity > order.quantity() {
            warn!(
                venue = %order.venue(),
                symbol = %order.symbol(),
                reported = %report.filled_quantity,
                quantity = %order.quantity(),
                "Venue reported more filled than ordered, capping"
            );
        }
        self.track(order, |o| {
            o.apply_report(report);
        });
    }

    /// Run a venue query, retrying connectivity failures with backoff.
    async fn query<T, F, Fut>(&self, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut failures = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && failures + 1 < self.config.status_retry_attempts => {
                    failures += 1;
                    debug!(venue = %self.venue(), attempt = failures, error = %e, "Query failed, retrying");
                    tokio::time::sleep(self.backoff(failures)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.saturating_sub(1).min(6);
        self.config.status_retry_backoff * factor
    }

    /// Apply a mutation and emit a transition event if anything changed.
    fn track(&self, order: &mut Order, mutate: impl FnOnce(&mut Order)) {
        let before = (order.status(), order.filled_quantity());
        mutate(order);
        if before == (order.status(), order.filled_quantity()) {
            return;
        }

        debug!(
            venue = %order.venue(),
            symbol = %order.symbol(),
            from = %before.0,
            to = %order.status(),
            filled = %order.filled_quantity(),
            "Order transition"
        );
        if order.status() == OrderStatus::Unknown {
            warn!(venue = %order.venue(), symbol = %order.symbol(), "Order status unknown");
        }
        self.sink.emit(Event::OrderTransition {
            venue: order.venue().clone(),
            symbol: order.symbol().clone(),
            order_id: order.id().map(ToString::to_string),
            from: before.0,
            to: order.status(),
            filled: order.filled_quantity(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let ledger = Arc::new(PositionLedger::new(Arc::new(crate::port::NullSink)));
        let gateway = Arc::new(crate::testkit::gateway::ScriptedGateway::new("maker"));
        let manager = OrderLifecycleManager::new(
            gateway,
            ledger,
            Arc::new(crate::port::NullSink),
            LifecycleConfig::default(),
        );
        assert_eq!(manager.backoff(1), Duration::from_millis(100));
        assert_eq!(manager.backoff(2), Duration::from_millis(200));
        assert_eq!(manager.backoff(3), Duration::from_millis(400));
    }
}
