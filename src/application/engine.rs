//! Engine wiring and main loop.
//!
//! Builds the services for a maker/taker venue pair, reconciles positions at
//! startup and then runs until shutdown:
//!
//! - one quote feed per venue
//! - one evaluation loop per symbol
//! - a periodic reconciliation sweep
//!
//! Shutdown lets in-flight cycles finish before the loops exit.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::coordinator::{CycleConfig, SymbolParams, TradeCycleCoordinator};
use super::feed::QuoteFeed;
use super::ledger::{PositionLedger, Reconciliation, SymbolLimits};
use super::order_lifecycle::{LifecycleConfig, OrderLifecycleManager};
use super::quote_sync::{QuoteSynchronizer, VenueBound};
use super::reconcile::Reconciler;
use crate::domain::Symbol;
use crate::error::{ConfigError, Result};
use crate::port::{Delivery, EventSink, VenueGateway};

/// Maximum quote age per delivery mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteAgeConfig {
    pub push: Duration,
    /// Defaults to twice the venue's poll interval.
    pub poll: Option<Duration>,
}

impl Default for QuoteAgeConfig {
    fn default() -> Self {
        Self {
            push: Duration::from_secs(2),
            poll: None,
        }
    }
}

impl QuoteAgeConfig {
    fn bound_for(&self, gateway: &dyn VenueGateway) -> VenueBound {
        let max_age = match gateway.delivery() {
            Delivery::Push => self.push,
            Delivery::Poll => self.poll.unwrap_or(gateway.poll_interval() * 2),
        };
        VenueBound::new(gateway.venue().clone(), max_age)
    }
}

/// Parameters and limits for one traded symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolConfig {
    pub params: SymbolParams,
    pub limits: SymbolLimits,
}

/// Everything the engine needs besides the gateways.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub symbols: Vec<SymbolConfig>,
    pub cycle: CycleConfig,
    pub lifecycle: LifecycleConfig,
    pub quote_age: QuoteAgeConfig,
    pub evaluation_interval: Duration,
    pub reconciliation_interval: Duration,
}

/// The assembled arbitrage engine.
pub struct Engine {
    maker_gateway: Arc<dyn VenueGateway>,
    taker_gateway: Arc<dyn VenueGateway>,
    maker: Arc<OrderLifecycleManager>,
    taker: Arc<OrderLifecycleManager>,
    quotes: Arc<QuoteSynchronizer>,
    ledger: Arc<PositionLedger>,
    coordinator: Arc<TradeCycleCoordinator>,
    sink: Arc<dyn EventSink>,
    symbols: Vec<Symbol>,
    evaluation_interval: Duration,
    reconciliation_interval: Duration,
}

impl Engine {
    pub fn new(
        maker_gateway: Arc<dyn VenueGateway>,
        taker_gateway: Arc<dyn VenueGateway>,
        sink: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Result<Self> {
        if config.symbols.is_empty() {
            return Err(ConfigError::MissingField { field: "symbols" }.into());
        }
        if maker_gateway.venue() == taker_gateway.venue() {
            return Err(ConfigError::InvalidValue {
                field: "venues",
                reason: "maker and taker venues must differ".into(),
            }
            .into());
        }

        let ledger = Arc::new(PositionLedger::new(Arc::clone(&sink)));
        for symbol in &config.symbols {
            ledger.register(symbol.params.symbol.clone(), symbol.limits.clone());
        }

        let quotes = Arc::new(QuoteSynchronizer::new(
            config.quote_age.bound_for(maker_gateway.as_ref()),
            config.quote_age.bound_for(taker_gateway.as_ref()),
        ));
        let maker = Arc::new(OrderLifecycleManager::new(
            Arc::clone(&maker_gateway),
            Arc::clone(&ledger),
            Arc::clone(&sink),
            config.lifecycle,
        ));
        let taker = Arc::new(OrderLifecycleManager::new(
            Arc::clone(&taker_gateway),
            Arc::clone(&ledger),
            Arc::clone(&sink),
            config.lifecycle,
        ));
        let symbols = config.symbols.iter().map(|s| s.params.symbol.clone()).collect();
        let coordinator = Arc::new(TradeCycleCoordinator::new(
            Arc::clone(&maker),
            Arc::clone(&taker),
            Arc::clone(&quotes),
            Arc::clone(&ledger),
            Arc::clone(&sink),
            config.cycle,
            config.symbols.into_iter().map(|s| s.params),
        ));

        Ok(Self {
            maker_gateway,
            taker_gateway,
            maker,
            taker,
            quotes,
            ledger,
            coordinator,
            sink,
            symbols,
            evaluation_interval: config.evaluation_interval,
            reconciliation_interval: config.reconciliation_interval,
        })
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<TradeCycleCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<PositionLedger> {
        &self.ledger
    }

    #[must_use]
    pub fn quotes(&self) -> &Arc<QuoteSynchronizer> {
        &self.quotes
    }

    /// Seed the ledger from both venues before any evaluation.
    pub async fn reconcile_startup(&self) -> Vec<Reconciliation> {
        let tasks = self.symbols.iter().flat_map(|symbol| {
            [self.maker.reconcile(symbol), self.taker.reconcile(symbol)]
        });
        let results: Vec<_> = join_all(tasks).await.into_iter().flatten().collect();
        for r in &results {
            info!(symbol = %r.symbol, venue = %r.venue, position = %r.authoritative, "Initial position");
        }
        results
    }

    /// Run until `shutdown` flips to true.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            maker = %self.maker.venue(),
            taker = %self.taker.venue(),
            symbols = self.symbols.len(),
            "Engine starting"
        );
        self.reconcile_startup().await;

        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        for gateway in [&self.maker_gateway, &self.taker_gateway] {
            let feed = QuoteFeed::new(
                Arc::clone(gateway),
                Arc::clone(&self.quotes),
                Arc::clone(&self.sink),
                self.symbols.clone(),
            );
            handles.push(tokio::spawn(feed.run(shutdown.clone())));
        }

        let reconciler = Reconciler::new(Arc::clone(&self.coordinator), self.reconciliation_interval);
        handles.push(tokio::spawn(reconciler.run(shutdown.clone())));

        for symbol in &self.symbols {
            handles.push(tokio::spawn(evaluation_loop(
                Arc::clone(&self.coordinator),
                symbol.clone(),
                self.evaluation_interval,
                shutdown.clone(),
            )));
        }

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Engine task failed");
            }
        }
        info!("Engine stopped");
        Ok(())
    }
}

/// Evaluate one symbol every `interval`; a running cycle is never interrupted.
async fn evaluation_loop(
    coordinator: Arc<TradeCycleCoordinator>,
    symbol: Symbol,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        coordinator.run_cycle(&symbol).await;
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
