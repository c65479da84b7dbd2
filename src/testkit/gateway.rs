//! Scripted [`VenueGateway`] for tests.
//!
//! Every placed order follows a [`FillPlan`]. Placement results, status
//! failures and position failures can be queued ahead of time; fills move
//! the gateway's own position so reconciliation sees them.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use crate::domain::{
    OrderId, OrderKind, OrderSpec, Quantity, Quote, StatusReport, Symbol, VenueId,
    VenueOrderStatus,
};
use crate::error::GatewayError;
use crate::port::{Delivery, VenueGateway};

/// How a scripted order fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPlan {
    /// Rests until cancelled, never fills.
    Never,
    /// Reports this fill on the first status query.
    Immediately(Quantity),
    /// Rests until cancelled, then reports this fill (the cancel race).
    OnCancel(Quantity),
    /// Reports this fill after the given number of status queries.
    AfterPolls(u32, Quantity),
    /// Stays open even after a cancel request.
    IgnoresCancel,
}

struct ScriptedOrder {
    spec: OrderSpec,
    plan: FillPlan,
    cancelled: bool,
    polls: u32,
    filled: Quantity,
}

impl ScriptedOrder {
    fn report(&mut self) -> StatusReport {
        self.polls += 1;
        let target = match self.plan {
            FillPlan::Never | FillPlan::IgnoresCancel => Decimal::ZERO,
            FillPlan::Immediately(q) => q,
            FillPlan::OnCancel(q) if self.cancelled => q,
            FillPlan::OnCancel(_) => Decimal::ZERO,
            FillPlan::AfterPolls(n, q) if self.polls > n => q,
            FillPlan::AfterPolls(..) => Decimal::ZERO,
        };
        self.filled = self.filled.max(target.min(self.spec.quantity));

        let full = self.filled >= self.spec.quantity;
        let status = match (full, self.cancelled && self.plan != FillPlan::IgnoresCancel) {
            (true, _) => VenueOrderStatus::Filled,
            (false, true) => VenueOrderStatus::Cancelled,
            (false, false) if self.filled > Decimal::ZERO => VenueOrderStatus::PartiallyFilled,
            (false, false) => VenueOrderStatus::Open,
        };
        StatusReport::new(status, self.filled).with_price(self.spec.price)
    }
}

#[derive(Default)]
struct Inner {
    placements: VecDeque<Result<(), GatewayError>>,
    fill_plans: VecDeque<FillPlan>,
    status_errors: VecDeque<GatewayError>,
    position_errors: VecDeque<GatewayError>,
    quotes: HashMap<Symbol, Quote>,
    orders: HashMap<OrderId, ScriptedOrder>,
    placed: Vec<OrderSpec>,
    cancels: Vec<OrderId>,
    status_queries: u32,
    positions: HashMap<Symbol, Quantity>,
    next_id: u64,
}

/// Deterministic venue gateway.
///
/// Without scripting, market orders fill in full on the first status query
/// and post-only orders rest until cancelled.
pub struct ScriptedGateway {
    venue: VenueId,
    delivery: Delivery,
    poll_interval: Duration,
    inner: Mutex<Inner>,
    quotes_tx: broadcast::Sender<Quote>,
}

impl ScriptedGateway {
    pub fn new(venue: &str) -> Self {
        let (quotes_tx, _) = broadcast::channel(64);
        Self {
            venue: VenueId::new(venue),
            delivery: Delivery::Poll,
            poll_interval: Duration::from_millis(100),
            inner: Mutex::new(Inner::default()),
            quotes_tx,
        }
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Queue the result of the next `place_order`.
    pub fn script_placement(&self, result: Result<(), GatewayError>) {
        self.inner.lock().placements.push_back(result);
    }

    /// Queue the fill plan of the next placed order.
    pub fn script_fill(&self, plan: FillPlan) {
        self.inner.lock().fill_plans.push_back(plan);
    }

    /// Fail the next `count` status queries with `error`.
    pub fn fail_status(&self, count: usize, error: GatewayError) {
        let mut inner = self.inner.lock();
        for _ in 0..count {
            inner.status_errors.push_back(error.clone());
        }
    }

    /// Fail the next `count` position queries with `error`.
    pub fn fail_positions(&self, count: usize, error: GatewayError) {
        let mut inner = self.inner.lock();
        for _ in 0..count {
            inner.position_errors.push_back(error.clone());
        }
    }

    /// Overwrite the venue's position, as if changed outside the engine.
    pub fn set_position(&self, symbol: &str, quantity: Quantity) {
        self.inner.lock().positions.insert(Symbol::new(symbol), quantity);
    }

    /// Store a quote for `quote()` answers.
    pub fn set_quote(&self, quote: Quote) {
        self.inner.lock().quotes.insert(quote.symbol.clone(), quote);
    }

    /// Broadcast a quote to subscribers. Returns the number of receivers.
    pub fn push_quote(&self, quote: Quote) -> usize {
        self.quotes_tx.send(quote).unwrap_or(0)
    }

    pub fn placed(&self) -> Vec<OrderSpec> {
        self.inner.lock().placed.clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.inner.lock().cancels.len()
    }

    pub fn status_queries(&self) -> u32 {
        self.inner.lock().status_queries
    }

    pub fn venue_position(&self, symbol: &str) -> Quantity {
        self.inner
            .lock()
            .positions
            .get(&Symbol::new(symbol))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl VenueGateway for ScriptedGateway {
    fn venue(&self) -> &VenueId {
        &self.venue
    }

    fn delivery(&self) -> Delivery {
        self.delivery
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn quote(&self, symbol: &Symbol) -> Result<Quote, GatewayError> {
        self.inner
            .lock()
            .quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| GatewayError::Unavailable(format!("no quote for {symbol}")))
    }

    fn subscribe_quotes(&self) -> Option<broadcast::Receiver<Quote>> {
        match self.delivery {
            Delivery::Push => Some(self.quotes_tx.subscribe()),
            Delivery::Poll => None,
        }
    }

    async fn place_order(&self, spec: &OrderSpec) -> Result<OrderId, GatewayError> {
        let mut inner = self.inner.lock();
        inner.placed.push(spec.clone());
        inner.placements.pop_front().unwrap_or(Ok(()))?;

        let plan = inner.fill_plans.pop_front().unwrap_or(match spec.kind {
            OrderKind::Market => FillPlan::Immediately(spec.quantity),
            OrderKind::PostOnly => FillPlan::Never,
        });
        inner.next_id += 1;
        let id = OrderId::new(format!("{}-{}", self.venue, inner.next_id));
        inner.orders.insert(
            id.clone(),
            ScriptedOrder {
                spec: spec.clone(),
                plan,
                cancelled: false,
                polls: 0,
                filled: Decimal::ZERO,
            },
        );
        Ok(id)
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        inner.cancels.push(order_id.clone());
        let order = inner
            .orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::InvalidParams(format!("unknown order {order_id}")))?;
        order.cancelled = true;
        Ok(())
    }

    async fn order_status(&self, order_id: &OrderId) -> Result<StatusReport, GatewayError> {
        let mut inner = self.inner.lock();
        inner.status_queries += 1;
        if let Some(error) = inner.status_errors.pop_front() {
            return Err(error);
        }

        let order = inner
            .orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::InvalidParams(format!("unknown order {order_id}")))?;
        let before = order.filled;
        let report = order.report();
        let delta = order.spec.side.signed(report.filled_quantity - before);
        let symbol = order.spec.symbol.clone();
        *inner.positions.entry(symbol).or_default() += delta;
        Ok(report)
    }

    async fn position(&self, symbol: &Symbol) -> Result<Quantity, GatewayError> {
        let mut inner = self.inner.lock();
        if let Some(error) = inner.position_errors.pop_front() {
            return Err(error);
        }
        Ok(inner.positions.get(symbol).copied().unwrap_or_default())
    }
}
