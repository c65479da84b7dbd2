//! In-process paper venue.
//!
//! Simulates one venue's book as a random walk around a starting mid price.
//! Post-only orders that would cross are rejected, resting orders fill when
//! the book moves through them or at random, and market orders fill at the
//! touch immediately. Positions are tracked per symbol.
//!
//! Closed orders stay queryable for `order_retention`, then are dropped.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::{
    OrderId, OrderKind, OrderSpec, Price, PriceLevel, Quantity, Quote, QuoteSource, Side,
    StatusReport, Symbol, VenueId, VenueOrderStatus,
};
use crate::error::GatewayError;
use crate::port::{Delivery, VenueGateway};

/// Simulation knobs for a paper venue.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperConfig {
    pub initial_price: Price,
    pub half_spread: Price,
    /// Largest mid move per tick.
    pub volatility: Price,
    /// Chance per tick that a resting order fills without being crossed.
    pub fill_probability: f64,
    pub tick_interval: Duration,
    /// How long filled and cancelled orders answer status queries.
    pub order_retention: Duration,
    pub seed: Option<u64>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_price: Decimal::from(100),
            half_spread: Decimal::new(5, 2),
            volatility: Decimal::new(10, 2),
            fill_probability: 0.05,
            tick_interval: Duration::from_millis(100),
            order_retention: Duration::from_secs(60),
            seed: None,
        }
    }
}

struct PaperOrder {
    spec: OrderSpec,
    status: VenueOrderStatus,
    filled: Quantity,
    average_price: Option<Price>,
}

impl PaperOrder {
    fn report(&self) -> StatusReport {
        let report = StatusReport::new(self.status, self.filled);
        match self.average_price {
            Some(price) => report.with_price(price),
            None => report,
        }
    }

    fn is_resting(&self) -> bool {
        matches!(
            self.status,
            VenueOrderStatus::Open | VenueOrderStatus::PartiallyFilled
        )
    }
}

struct PaperState {
    mids: HashMap<Symbol, Price>,
    orders: HashMap<OrderId, PaperOrder>,
    /// Orders still on the book.
    resting: HashSet<OrderId>,
    /// Closed orders, oldest first.
    closed: VecDeque<(Instant, OrderId)>,
    positions: HashMap<Symbol, Quantity>,
    rng: StdRng,
}

impl PaperState {
    fn fill(&mut self, order_id: &OrderId, price: Price) {
        let Some(order) = self.orders.get_mut(order_id) else {
            return;
        };
        let remaining = order.spec.quantity - order.filled;
        order.filled = order.spec.quantity;
        order.status = VenueOrderStatus::Filled;
        order.average_price = Some(price);
        *self.positions.entry(order.spec.symbol.clone()).or_default() +=
            order.spec.side.signed(remaining);
        self.close(order_id);
    }

    fn close(&mut self, order_id: &OrderId) {
        self.resting.remove(order_id);
        self.closed.push_back((Instant::now(), order_id.clone()));
    }

    fn prune(&mut self, retention: Duration) {
        let now = Instant::now();
        while let Some((closed_at, _)) = self.closed.front() {
            if now.duration_since(*closed_at) < retention {
                break;
            }
            if let Some((_, id)) = self.closed.pop_front() {
                self.orders.remove(&id);
            }
        }
    }
}

/// Paper trading venue.
pub struct PaperVenue {
    venue: VenueId,
    delivery: Delivery,
    poll_interval: Duration,
    config: PaperConfig,
    state: Mutex<PaperState>,
    quotes: broadcast::Sender<Quote>,
    next_order: AtomicU64,
}

impl PaperVenue {
    pub fn new(
        venue: impl Into<VenueId>,
        delivery: Delivery,
        poll_interval: Duration,
        symbols: impl IntoIterator<Item = Symbol>,
        config: PaperConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mids = symbols
            .into_iter()
            .map(|s| (s, config.initial_price))
            .collect();
        let (quotes, _) = broadcast::channel(1024);
        Self {
            venue: venue.into(),
            delivery,
            poll_interval,
            config,
            state: Mutex::new(PaperState {
                mids,
                orders: HashMap::new(),
                resting: HashSet::new(),
                closed: VecDeque::new(),
                positions: HashMap::new(),
                rng,
            }),
            quotes,
            next_order: AtomicU64::new(1),
        }
    }

    /// Move every book one step and fill resting orders it reaches.
    pub fn tick(&self) {
        let mut state = self.state.lock();
        state.prune(self.config.order_retention);
        let symbols: Vec<Symbol> = state.mids.keys().cloned().collect();
        for symbol in symbols {
            let step = Decimal::new(state.rng.gen_range(-100i64..=100), 2) * self.config.volatility;
            let Some(mid) = state.mids.get_mut(&symbol) else {
                continue;
            };
            *mid = (*mid + step).max(self.config.half_spread * Decimal::TWO);
            let mid = *mid;
            let (bid, ask) = (mid - self.config.half_spread, mid + self.config.half_spread);

            let resting: Vec<(OrderId, Side, Price)> = state
                .resting
                .iter()
                .filter_map(|id| state.orders.get(id).map(|o| (id, o)))
                .filter(|(_, o)| o.spec.symbol == symbol)
                .map(|(id, o)| (id.clone(), o.spec.side, o.spec.price))
                .collect();
            for (id, side, price) in resting {
                let crossed = match side {
                    Side::Buy => ask <= price,
                    Side::Sell => bid >= price,
                };
                if crossed || state.rng.gen_bool(self.config.fill_probability) {
                    debug!(venue = %self.venue, order_id = %id, price = %price, "Paper order filled");
                    state.fill(&id, price);
                }
            }

            // no receivers is fine
            let _ = self.quotes.send(self.book(&symbol, mid, QuoteSource::Push));
        }
    }

    /// Tick every `tick_interval` until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(venue = %self.venue, delivery = self.delivery.as_str(), "Paper venue started");
        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => self.tick(),
            }
        }
    }

    fn book(&self, symbol: &Symbol, mid: Price, source: QuoteSource) -> Quote {
        Quote::new(
            self.venue.clone(),
            symbol.clone(),
            PriceLevel::new(mid - self.config.half_spread, Decimal::ONE),
            PriceLevel::new(mid + self.config.half_spread, Decimal::ONE),
            source,
        )
    }
}

#[async_trait]
impl VenueGateway for PaperVenue {
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
        let mid = self
            .state
            .lock()
            .mids
            .get(symbol)
            .copied()
            .ok_or_else(|| GatewayError::Unavailable(format!("no book for {symbol}")))?;
        Ok(self.book(symbol, mid, QuoteSource::Poll))
    }

    fn subscribe_quotes(&self) -> Option<broadcast::Receiver<Quote>> {
        match self.delivery {
            Delivery::Push => Some(self.quotes.subscribe()),
            Delivery::Poll => None,
        }
    }

    async fn place_order(&self, spec: &OrderSpec) -> Result<OrderId, GatewayError> {
        if spec.quantity <= Decimal::ZERO {
            return Err(GatewayError::InvalidParams(format!(
                "quantity must be positive, got {}",
                spec.quantity
            )));
        }

        let mut state = self.state.lock();
        let mid = state
            .mids
            .get(&spec.symbol)
            .copied()
            .ok_or_else(|| GatewayError::InvalidParams(format!("unknown symbol {}", spec.symbol)))?;
        let (bid, ask) = (mid - self.config.half_spread, mid + self.config.half_spread);

        let id = OrderId::new(format!(
            "{}-{}",
            self.venue,
            self.next_order.fetch_add(1, Ordering::Relaxed)
        ));
        let order = PaperOrder {
            spec: spec.clone(),
            status: VenueOrderStatus::Open,
            filled: Decimal::ZERO,
            average_price: None,
        };

        match spec.kind {
            OrderKind::PostOnly => {
                let crosses = match spec.side {
                    Side::Buy => spec.price >= ask,
                    Side::Sell => spec.price <= bid,
                };
                if crosses {
                    return Err(GatewayError::Rejected(
                        "post-only order would take liquidity".into(),
                    ));
                }
                state.orders.insert(id.clone(), order);
                state.resting.insert(id.clone());
            }
            OrderKind::Market => {
                let price = match spec.side {
                    Side::Buy => ask,
                    Side::Sell => bid,
                };
                state.orders.insert(id.clone(), order);
                state.fill(&id, price);
            }
        }
        Ok(id)
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::InvalidParams(format!("unknown order {order_id}")))?;
        if order.is_resting() {
            order.status = VenueOrderStatus::Cancelled;
            state.close(order_id);
        }
        Ok(())
    }

    async fn order_status(&self, order_id: &OrderId) -> Result<StatusReport, GatewayError> {
        self.state
            .lock()
            .orders
            .get(order_id)
            .map(PaperOrder::report)
            .ok_or_else(|| GatewayError::InvalidParams(format!("unknown order {order_id}")))
    }

    async fn position(&self, symbol: &Symbol) -> Result<Quantity, GatewayError> {
        Ok(self
            .state
            .lock()
            .positions
            .get(symbol)
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn venue() -> PaperVenue {
        PaperVenue::new(
            "paper",
            Delivery::Push,
            Duration::from_millis(100),
            [Symbol::from("BTC")],
            PaperConfig {
                fill_probability: 0.0,
                seed: Some(7),
                ..PaperConfig::default()
            },
        )
    }

    fn btc() -> Symbol {
        Symbol::from("BTC")
    }

    #[tokio::test]
    async fn crossing_post_only_is_rejected() {
        let venue = venue();
        let quote = venue.quote(&btc()).await.unwrap();
        let spec = OrderSpec::post_only(
            venue.venue().clone(),
            btc(),
            Side::Buy,
            quote.ask.price,
            dec!(0.01),
        );
        assert!(matches!(venue.place_order(&spec).await, Err(GatewayError::Rejected(_))));
    }

    #[tokio::test]
    async fn market_order_fills_at_touch_and_moves_position() {
        let venue = venue();
        let quote = venue.quote(&btc()).await.unwrap();
        let spec = OrderSpec::market(venue.venue().clone(), btc(), Side::Sell, quote.bid.price, dec!(0.01));
        let id = venue.place_order(&spec).await.unwrap();

        let report = venue.order_status(&id).await.unwrap();
        assert_eq!(report.status, VenueOrderStatus::Filled);
        assert_eq!(report.average_price, Some(quote.bid.price));
        assert_eq!(venue.position(&btc()).await.unwrap(), dec!(-0.01));
    }

    #[tokio::test]
    async fn resting_order_cancels_without_fill() {
        let venue = venue();
        let quote = venue.quote(&btc()).await.unwrap();
        let spec = OrderSpec::post_only(
            venue.venue().clone(),
            btc(),
            Side::Buy,
            quote.bid.price - dec!(10),
            dec!(0.01),
        );
        let id = venue.place_order(&spec).await.unwrap();
        venue.cancel_order(&id).await.unwrap();
        venue.cancel_order(&id).await.unwrap();

        let report = venue.order_status(&id).await.unwrap();
        assert_eq!(report.status, VenueOrderStatus::Cancelled);
        assert_eq!(report.filled_quantity, Decimal::ZERO);
        assert_eq!(venue.position(&btc()).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn resting_order_fills_when_book_moves_through() {
        let venue = PaperVenue::new(
            "paper",
            Delivery::Poll,
            Duration::from_millis(100),
            [btc()],
            PaperConfig {
                fill_probability: 1.0,
                seed: Some(1),
                ..PaperConfig::default()
            },
        );
        let quote = venue.quote(&btc()).await.unwrap();
        let spec = OrderSpec::post_only(venue.venue().clone(), btc(), Side::Buy, quote.bid.price, dec!(0.02));
        let id = venue.place_order(&spec).await.unwrap();

        venue.tick();
        let report = venue.order_status(&id).await.unwrap();
        assert_eq!(report.status, VenueOrderStatus::Filled);
        assert_eq!(venue.position(&btc()).await.unwrap(), dec!(0.02));
        assert!(venue.subscribe_quotes().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_orders_are_dropped_after_retention() {
        let venue = venue();
        let quote = venue.quote(&btc()).await.unwrap();
        let filled = venue
            .place_order(&OrderSpec::market(venue.venue().clone(), btc(), Side::Buy, quote.ask.price, dec!(0.01)))
            .await
            .unwrap();
        let resting = venue
            .place_order(&OrderSpec::post_only(
                venue.venue().clone(),
                btc(),
                Side::Buy,
                quote.bid.price - dec!(10),
                dec!(0.01),
            ))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        venue.tick();
        assert!(venue.order_status(&filled).await.is_ok());

        tokio::time::advance(Duration::from_secs(31)).await;
        venue.tick();
        assert!(matches!(
            venue.order_status(&filled).await,
            Err(GatewayError::InvalidParams(_))
        ));
        assert!(venue.order_status(&resting).await.is_ok());
        {
            let state = venue.state.lock();
            assert_eq!(state.orders.len(), 1);
            assert!(state.resting.contains(&resting));
            assert!(state.closed.is_empty());
        }
        assert_eq!(venue.position(&btc()).await.unwrap(), dec!(0.01));
    }

    #[tokio::test]
    async fn tick_publishes_quotes_when_pushing() {
        let venue = venue();
        let mut rx = venue.subscribe_quotes().unwrap();
        venue.tick();
        let quote = rx.try_recv().unwrap();
        assert_eq!(quote.source, QuoteSource::Push);
        assert!(quote.validate().is_ok());
    }
}
