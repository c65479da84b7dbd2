//! Event sink port.
//!
//! The core produces structured events for observability and never depends
//! on them being consumed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    CycleOutcome, Direction, OrderStatus, Price, Quantity, QuoteSource, Symbol, TradeCycle,
    VenueId,
};

/// Events emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A quote was accepted by the synchronizer.
    QuoteUpdated {
        venue: VenueId,
        symbol: Symbol,
        bid: Price,
        ask: Price,
        source: QuoteSource,
    },
    /// A quote was dropped (out of order or malformed).
    QuoteDiscarded {
        venue: VenueId,
        symbol: Symbol,
        reason: String,
    },
    /// The spread condition held and a cycle is being opened.
    SignalDetected {
        symbol: Symbol,
        direction: Direction,
        spread: Price,
    },
    /// A signal was suppressed by a risk check.
    SignalSuppressed { symbol: Symbol, reason: String },
    /// A signal arrived while a cycle for the symbol was still active.
    SignalIgnored { symbol: Symbol },
    /// An order changed status.
    OrderTransition {
        venue: VenueId,
        symbol: Symbol,
        order_id: Option<String>,
        from: OrderStatus,
        to: OrderStatus,
        filled: Quantity,
    },
    /// A cycle reached a terminal outcome.
    CycleClosed(CycleSummary),
    /// Reconciliation found the tracked position differed from the venue.
    PositionDrift {
        venue: VenueId,
        symbol: Symbol,
        tracked: Quantity,
        authoritative: Quantity,
        drift: Quantity,
    },
    /// Combined position is further from flat than allowed.
    ImbalanceDetected {
        symbol: Symbol,
        combined: Quantity,
        limit: Quantity,
    },
}

impl Event {
    /// Stable event name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::QuoteUpdated { .. } => "quote_updated",
            Self::QuoteDiscarded { .. } => "quote_discarded",
            Self::SignalDetected { .. } => "signal_detected",
            Self::SignalSuppressed { .. } => "signal_suppressed",
            Self::SignalIgnored { .. } => "signal_ignored",
            Self::OrderTransition { .. } => "order_transition",
            Self::CycleClosed(_) => "cycle_closed",
            Self::PositionDrift { .. } => "position_drift",
            Self::ImbalanceDetected { .. } => "imbalance_detected",
        }
    }
}

/// Snapshot of a closed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: String,
    pub symbol: Symbol,
    pub direction: Direction,
    pub outcome: Option<CycleOutcome>,
    pub maker_filled: Quantity,
    pub taker_filled: Quantity,
    pub unwind_filled: Quantity,
    pub note: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<&TradeCycle> for CycleSummary {
    fn from(cycle: &TradeCycle) -> Self {
        let filled = |order: Option<&crate::domain::Order>| {
            order.map(|o| o.filled_quantity()).unwrap_or_default()
        };
        Self {
            cycle_id: cycle.id().to_string(),
            symbol: cycle.symbol().clone(),
            direction: cycle.direction(),
            outcome: cycle.outcome(),
            maker_filled: filled(cycle.maker()),
            taker_filled: filled(cycle.taker()),
            unwind_filled: filled(cycle.unwind()),
            note: cycle.note().map(str::to_string),
            opened_at: cycle.opened_at(),
            closed_at: cycle.closed_at(),
        }
    }
}

/// Receiver of engine events.
///
/// `emit` is fire-and-forget: implementations must return quickly and must
/// not block. Slow backends should hand the event to a task.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Registry of sinks (composite pattern).
///
/// Broadcasts events to all registered sinks.
#[derive(Default)]
pub struct EventSinkRegistry {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventSinkRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { sinks: vec![] }
    }

    /// Register a sink.
    pub fn register(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for EventSinkRegistry {
    fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}
