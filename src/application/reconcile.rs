//! Periodic position reconciliation.
//!
//! Replaces every tracked (symbol, venue) position with the venue's own
//! value. Each symbol is reconciled while holding its single-flight slot,
//! so a sweep and a trade cycle never touch the same symbol at once and a
//! fill being booked is never overwritten or counted twice.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tracing::info;

use super::coordinator::TradeCycleCoordinator;
use super::ledger::Reconciliation;

pub struct Reconciler {
    coordinator: Arc<TradeCycleCoordinator>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(coordinator: Arc<TradeCycleCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    /// Reconcile every symbol on both venues, busy symbols excepted.
    pub async fn sweep(&self) -> Vec<Reconciliation> {
        let symbols = self.coordinator.symbols();
        let tasks = symbols
            .iter()
            .map(|symbol| self.coordinator.reconcile_idle(symbol));
        let outcomes = join_all(tasks).await;

        let skipped = outcomes.iter().filter(|o| o.is_none()).count();
        let results: Vec<_> = outcomes.into_iter().flatten().flatten().collect();
        let drifted = results.iter().filter(|r| r.drifted).count();
        info!(positions = results.len(), drifted, skipped, "Reconciliation sweep complete");
        results
    }

    /// Sweep every interval until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick fires immediately; startup already reconciled
        interval.tick().await;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }
    }
}
