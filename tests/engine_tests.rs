//! Engine wiring: feeds, evaluation loops, startup reconciliation and
//! shutdown, over two scripted venues.

use std::sync::Arc;
use std::time::Duration;

use crossarb::application::{CycleConfig, Engine, EngineConfig, LifecycleConfig, QuoteAgeConfig};
use crossarb::domain::CycleOutcome;
use crossarb::port::{Delivery, VenueGateway};
use crossarb::testkit::domain::{quote, symbol_config};
use crossarb::testkit::gateway::{FillPlan, ScriptedGateway};
use crossarb::testkit::sink::RecordingSink;
use rust_decimal_macros::dec;
use tokio::sync::watch;

fn config() -> EngineConfig {
    EngineConfig {
        symbols: vec![symbol_config("BTC", dec!(10), dec!(0.01), dec!(0.1))],
        cycle: CycleConfig::default(),
        lifecycle: LifecycleConfig::default(),
        quote_age: QuoteAgeConfig::default(),
        evaluation_interval: Duration::from_secs(1),
        reconciliation_interval: Duration::from_secs(30),
    }
}

struct Venues {
    maker: Arc<ScriptedGateway>,
    taker: Arc<ScriptedGateway>,
}

/// Maker streams, taker is polled; the books show a long opportunity.
fn venues() -> Venues {
    let maker = Arc::new(ScriptedGateway::new("maker").with_delivery(Delivery::Push));
    let taker = Arc::new(ScriptedGateway::new("taker"));
    maker.set_quote(quote("maker", "BTC", dec!(100), dec!(101)));
    taker.set_quote(quote("taker", "BTC", dec!(112), dec!(113)));
    Venues { maker, taker }
}

async fn run_for(engine: Arc<Engine>, duration: Duration) {
    let (tx, rx) = watch::channel(false);
    let running = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run(rx).await })
    };
    tokio::time::sleep(duration).await;
    tx.send(true).unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn opportunity_is_traded_and_hedged() {
    let venues = venues();
    venues.maker.script_fill(FillPlan::Immediately(dec!(0.01)));
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(
        Engine::new(venues.maker.clone(), venues.taker.clone(), sink.clone(), config()).unwrap(),
    );

    run_for(engine.clone(), Duration::from_millis(1500)).await;

    let cycles = sink.cycles();
    assert!(!cycles.is_empty());
    assert_eq!(cycles[0].outcome, Some(CycleOutcome::Completed));
    assert_eq!(venues.maker.venue_position("BTC"), dec!(0.01));
    assert_eq!(venues.taker.venue_position("BTC"), dec!(-0.01));
    assert_eq!(engine.ledger().combined(&"BTC".into()), dec!(0));
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_cycle_in_flight() {
    let venues = venues();
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(
        Engine::new(venues.maker.clone(), venues.taker.clone(), sink.clone(), config()).unwrap(),
    );

    // the maker order rests for its full 5s timeout
    run_for(engine.clone(), Duration::from_millis(1500)).await;

    assert_eq!(sink.cycles().len(), 1);
    assert_eq!(venues.maker.cancel_count(), 1);
    assert!(!engine.coordinator().is_active(&"BTC".into()));
}

#[tokio::test(start_paused = true)]
async fn imbalance_found_at_startup_blocks_trading() {
    let venues = venues();
    venues.maker.set_position("BTC", dec!(0.03));
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(
        Engine::new(venues.maker.clone(), venues.taker.clone(), sink.clone(), config()).unwrap(),
    );

    run_for(engine.clone(), Duration::from_millis(2500)).await;

    assert!(venues.maker.placed().is_empty());
    assert!(venues.taker.placed().is_empty());
    assert!(sink.count("imbalance_detected") >= 1);
    assert!(sink.count("signal_suppressed") >= 1);
    assert_eq!(engine.ledger().combined(&"BTC".into()), dec!(0.03));
}

#[tokio::test]
async fn startup_reconciliation_seeds_ledger() {
    let venues = venues();
    venues.maker.set_position("BTC", dec!(0.02));
    venues.taker.set_position("BTC", dec!(-0.02));
    let engine = Engine::new(
        venues.maker.clone(),
        venues.taker.clone(),
        Arc::new(RecordingSink::new()),
        config(),
    )
    .unwrap();

    let results = engine.reconcile_startup().await;

    assert_eq!(results.len(), 2);
    assert_eq!(engine.ledger().quantity(&"BTC".into(), venues.maker.venue()), dec!(0.02));
    assert_eq!(engine.ledger().quantity(&"BTC".into(), venues.taker.venue()), dec!(-0.02));
}

#[test]
fn engine_requires_distinct_venues_and_symbols() {
    let sink = Arc::new(RecordingSink::new());
    let same = Engine::new(
        Arc::new(ScriptedGateway::new("maker")),
        Arc::new(ScriptedGateway::new("maker")),
        sink.clone(),
        config(),
    );
    assert!(same.is_err());

    let mut empty = config();
    empty.symbols.clear();
    let none = Engine::new(
        Arc::new(ScriptedGateway::new("maker")),
        Arc::new(ScriptedGateway::new("taker")),
        sink,
        empty,
    );
    assert!(none.is_err());
}
