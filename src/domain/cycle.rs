//! Trade cycles: one maker leg hedged by one taker leg.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CycleId, Order, Side, Symbol};

/// Which way the maker leg trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Buy on the maker venue, sell on the taker venue.
    LongMaker,
    /// Sell on the maker venue, buy on the taker venue.
    ShortMaker,
}

impl Direction {
    #[must_use]
    pub const fn maker_side(self) -> Side {
        match self {
            Self::LongMaker => Side::Buy,
            Self::ShortMaker => Side::Sell,
        }
    }

    #[must_use]
    pub const fn taker_side(self) -> Side {
        self.maker_side().opposite()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LongMaker => "long_maker",
            Self::ShortMaker => "short_maker",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinator state for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    SignalEvaluating,
    MakerPlaced,
    MakerFilled,
    MakerTimeout,
    MakerRejected,
    TakerPlaced,
    TakerConfirmed,
    TakerFailed,
    Unwinding,
    Closed,
}

impl CycleState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SignalEvaluating => "signal_evaluating",
            Self::MakerPlaced => "maker_placed",
            Self::MakerFilled => "maker_filled",
            Self::MakerTimeout => "maker_timeout",
            Self::MakerRejected => "maker_rejected",
            Self::TakerPlaced => "taker_placed",
            Self::TakerConfirmed => "taker_confirmed",
            Self::TakerFailed => "taker_failed",
            Self::Unwinding => "unwinding",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a closed cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Both legs filled for the same quantity.
    Completed,
    /// No exposure was taken on.
    Aborted,
    /// The hedge failed; an unwind was attempted and the position is left to
    /// reconciliation.
    PartialUnwound,
}

impl CycleOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::PartialUnwound => "partial_unwound",
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A maker/taker round trip for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct TradeCycle {
    id: CycleId,
    symbol: Symbol,
    direction: Direction,
    maker: Option<Order>,
    taker: Option<Order>,
    unwind: Option<Order>,
    state: CycleState,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    outcome: Option<CycleOutcome>,
    note: Option<String>,
}

impl TradeCycle {
    #[must_use]
    pub fn open(symbol: Symbol, direction: Direction) -> Self {
        Self {
            id: CycleId::new(),
            symbol,
            direction,
            maker: None,
            taker: None,
            unwind: None,
            state: CycleState::SignalEvaluating,
            opened_at: Utc::now(),
            closed_at: None,
            outcome: None,
            note: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &CycleId {
        &self.id
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn maker(&self) -> Option<&Order> {
        self.maker.as_ref()
    }

    #[must_use]
    pub fn taker(&self) -> Option<&Order> {
        self.taker.as_ref()
    }

    #[must_use]
    pub fn unwind(&self) -> Option<&Order> {
        self.unwind.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    #[must_use]
    pub fn outcome(&self) -> Option<CycleOutcome> {
        self.outcome
    }

    /// Free-form reason attached when the cycle did not complete cleanly.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == CycleState::Closed
    }

    pub(crate) fn transition(&mut self, state: CycleState) {
        self.state = state;
    }

    pub(crate) fn set_maker(&mut self, order: Order) {
        self.maker = Some(order);
    }

    pub(crate) fn set_taker(&mut self, order: Order) {
        self.taker = Some(order);
    }

    pub(crate) fn set_unwind(&mut self, order: Order) {
        self.unwind = Some(order);
    }

    pub(crate) fn close(&mut self, outcome: CycleOutcome, note: Option<String>) {
        self.state = CycleState::Closed;
        self.outcome = Some(outcome);
        self.closed_at = Some(Utc::now());
        self.note = note;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sides() {
        assert_eq!(Direction::LongMaker.maker_side(), Side::Buy);
        assert_eq!(Direction::LongMaker.taker_side(), Side::Sell);
        assert_eq!(Direction::ShortMaker.maker_side(), Side::Sell);
        assert_eq!(Direction::ShortMaker.taker_side(), Side::Buy);
    }

    #[test]
    fn close_sets_outcome_and_timestamp() {
        let mut cycle = TradeCycle::open(Symbol::from("BTC"), Direction::LongMaker);
        assert_eq!(cycle.state(), CycleState::SignalEvaluating);
        cycle.close(CycleOutcome::Aborted, Some("maker cancelled".into()));
        assert!(cycle.is_closed());
        assert_eq!(cycle.outcome(), Some(CycleOutcome::Aborted));
        assert!(cycle.closed_at().is_some());
        assert_eq!(cycle.note(), Some("maker cancelled"));
    }
}
