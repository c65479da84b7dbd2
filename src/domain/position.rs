//! Net position per venue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Quantity, Symbol, VenueId};

/// Signed net quantity held on one venue for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    venue: VenueId,
    symbol: Symbol,
    quantity: Quantity,
    last_reconciled_at: Option<DateTime<Utc>>,
}

impl Position {
    /// A flat position that has never been reconciled.
    #[must_use]
    pub fn flat(venue: VenueId, symbol: Symbol) -> Self {
        Self {
            venue,
            symbol,
            quantity: Decimal::ZERO,
            last_reconciled_at: None,
        }
    }

    #[must_use]
    pub fn venue(&self) -> &VenueId {
        &self.venue
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[must_use]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    #[must_use]
    pub fn last_reconciled_at(&self) -> Option<DateTime<Utc>> {
        self.last_reconciled_at
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    pub(crate) fn apply(&mut self, delta: Quantity) {
        self.quantity += delta;
    }

    /// Replace the tracked quantity with an authoritative one.
    ///
    /// Returns the drift (`authoritative - tracked`).
    pub(crate) fn replace(&mut self, authoritative: Quantity, at: DateTime<Utc>) -> Quantity {
        let drift = authoritative - self.quantity;
        self.quantity = authoritative;
        self.last_reconciled_at = Some(at);
        drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn replace_reports_drift() {
        let mut pos = Position::flat(VenueId::from("maker"), Symbol::from("BTC"));
        pos.apply(dec!(0.02));
        let drift = pos.replace(dec!(0.01), Utc::now());
        assert_eq!(drift, dec!(-0.01));
        assert_eq!(pos.quantity(), dec!(0.01));
        assert!(pos.last_reconciled_at().is_some());
    }

    #[test]
    fn flat_position() {
        let pos = Position::flat(VenueId::from("taker"), Symbol::from("ETH"));
        assert!(pos.is_flat());
        assert!(pos.last_reconciled_at().is_none());
    }
}
