//! Periodic reconciliation sweep against scripted venues.

use std::time::Duration;

use crossarb::application::Reconciler;
use crossarb::domain::CycleOutcome;
use crossarb::error::GatewayError;
use crossarb::testkit::harness::{symbol, CycleHarness, MAKER, SYMBOL, TAKER};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;

fn reconciler(h: &CycleHarness) -> Reconciler {
    Reconciler::new(h.coordinator.clone(), Duration::from_secs(30))
}

#[tokio::test(start_paused = true)]
async fn sweep_replaces_drifted_positions() {
    let h = CycleHarness::new();
    h.ledger.record_fill(&symbol(), &MAKER.into(), dec!(0.01)).unwrap();
    h.maker.set_position(SYMBOL, dec!(0.02));
    h.taker.set_position(SYMBOL, dec!(-0.02));

    let results = reconciler(&h).sweep().await;

    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().filter(|r| r.drifted).count(), 2);
    assert_eq!(h.maker_position(), dec!(0.02));
    assert_eq!(h.taker_position(), dec!(-0.02));
    assert_eq!(h.sink.count("position_drift"), 2);
}

#[tokio::test(start_paused = true)]
async fn sweep_skips_symbol_with_cycle_in_flight() {
    let h = CycleHarness::new();
    h.long_signal();
    let reconciler = reconciler(&h);

    // the maker order rests until its 5s timeout
    let coordinator = h.coordinator.clone();
    let running = tokio::spawn(async move { coordinator.run_cycle(&symbol()).await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.coordinator.is_active(&symbol()));
    h.maker.set_position(SYMBOL, dec!(0.05));

    assert!(reconciler.sweep().await.is_empty());
    assert_eq!(h.maker_position(), Decimal::ZERO);
    assert_eq!(h.sink.count("position_drift"), 0);

    let cycle = running.await.unwrap().expect("cycle should open");
    assert_eq!(cycle.outcome(), Some(CycleOutcome::Aborted));

    assert_eq!(reconciler.sweep().await.len(), 2);
    assert_eq!(h.maker_position(), dec!(0.05));
}

#[tokio::test(start_paused = true)]
async fn cycle_waits_out_reconciliation_in_progress() {
    let h = CycleHarness::new();
    h.long_signal();
    // retries keep the position query pending for a while
    h.maker
        .fail_positions(2, GatewayError::Connectivity("timeout".into()));
    h.maker.set_position(SYMBOL, dec!(0.01));
    let reconciler = reconciler(&h);

    let (results, cycle) = tokio::join!(reconciler.sweep(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.run().await
    });

    assert!(cycle.is_none());
    assert_eq!(h.sink.count("signal_ignored"), 1);
    assert!(h.maker.placed().is_empty());
    assert_eq!(results.len(), 2);
    assert_eq!(h.maker_position(), dec!(0.01));
}

#[tokio::test(start_paused = true)]
async fn sweep_runs_every_interval() {
    let h = CycleHarness::new();
    let (tx, rx) = watch::channel(false);
    let running = tokio::spawn(reconciler(&h).run(rx));
    h.taker.set_position(SYMBOL, dec!(-0.03));

    // the immediate first tick is skipped
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.taker_position(), Decimal::ZERO);

    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(h.taker_position(), dec!(-0.03));
    assert_eq!(h.sink.count("position_drift"), 1);

    tx.send(true).unwrap();
    running.await.unwrap();
    assert_eq!(h.ledger.quantity(&symbol(), &TAKER.into()), dec!(-0.03));
}
