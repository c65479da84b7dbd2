//! A coordinator wired to two scripted venues.
//!
//! Defaults: symbol `BTC`, thresholds 10, order quantity 0.01, max position
//! 0.1, 5s order timeouts, 3 status attempts with 100ms backoff.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::domain::{quote, symbol_config};
use super::gateway::ScriptedGateway;
use super::sink::RecordingSink;
use crate::application::{
    CycleConfig, LifecycleConfig, OrderLifecycleManager, PositionLedger, QuoteSynchronizer,
    SymbolConfig, TradeCycleCoordinator, VenueBound,
};
use crate::domain::{Price, Symbol, TradeCycle, VenueId};

pub const MAKER: &str = "maker";
pub const TAKER: &str = "taker";
pub const SYMBOL: &str = "BTC";

pub struct CycleHarness {
    pub maker: Arc<ScriptedGateway>,
    pub taker: Arc<ScriptedGateway>,
    pub sink: Arc<RecordingSink>,
    pub ledger: Arc<PositionLedger>,
    pub quotes: Arc<QuoteSynchronizer>,
    pub maker_manager: Arc<OrderLifecycleManager>,
    pub taker_manager: Arc<OrderLifecycleManager>,
    pub coordinator: Arc<TradeCycleCoordinator>,
}

impl CycleHarness {
    pub fn new() -> Self {
        Self::with(CycleConfig::default(), default_symbol())
    }

    pub fn with(cycle: CycleConfig, symbol: SymbolConfig) -> Self {
        let maker = Arc::new(ScriptedGateway::new(MAKER));
        let taker = Arc::new(ScriptedGateway::new(TAKER));
        let sink = Arc::new(RecordingSink::new());
        let ledger = Arc::new(PositionLedger::new(sink.clone()));
        ledger.register(symbol.params.symbol.clone(), symbol.limits.clone());

        let quotes = Arc::new(QuoteSynchronizer::new(
            VenueBound::new(MAKER, Duration::from_secs(2)),
            VenueBound::new(TAKER, Duration::from_secs(2)),
        ));
        let lifecycle = LifecycleConfig::default();
        let maker_manager = Arc::new(OrderLifecycleManager::new(
            maker.clone(),
            ledger.clone(),
            sink.clone(),
            lifecycle,
        ));
        let taker_manager = Arc::new(OrderLifecycleManager::new(
            taker.clone(),
            ledger.clone(),
            sink.clone(),
            lifecycle,
        ));
        let coordinator = Arc::new(TradeCycleCoordinator::new(
            maker_manager.clone(),
            taker_manager.clone(),
            quotes.clone(),
            ledger.clone(),
            sink.clone(),
            cycle,
            [symbol.params],
        ));

        Self {
            maker,
            taker,
            sink,
            ledger,
            quotes,
            maker_manager,
            taker_manager,
            coordinator,
        }
    }

    /// Observe a fresh book on both venues.
    pub fn books(&self, maker: (Price, Price), taker: (Price, Price)) {
        self.quotes.observe(quote(MAKER, SYMBOL, maker.0, maker.1));
        self.quotes.observe(quote(TAKER, SYMBOL, taker.0, taker.1));
    }

    /// Books where the taker bid sits 12 above the maker bid.
    pub fn long_signal(&self) {
        self.books((dec!(100), dec!(101)), (dec!(112), dec!(113)));
    }

    pub async fn run(&self) -> Option<TradeCycle> {
        self.coordinator.run_cycle(&symbol()).await
    }

    pub fn maker_position(&self) -> Decimal {
        self.ledger.quantity(&symbol(), &VenueId::new(MAKER))
    }

    pub fn taker_position(&self) -> Decimal {
        self.ledger.quantity(&symbol(), &VenueId::new(TAKER))
    }
}

impl Default for CycleHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn symbol() -> Symbol {
    Symbol::new(SYMBOL)
}

pub fn default_symbol() -> SymbolConfig {
    symbol_config(SYMBOL, dec!(10), dec!(0.01), dec!(0.1))
}
