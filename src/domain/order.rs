//! Order types and the per-order state machine.
//!
//! ```text
//! PendingSubmit ──ack──► Open ──fill──► PartiallyFilled ──► Filled
//!       │                 │                   │
//!       └─error─► Rejected└──cancel──► Cancelled (or Filled if qty > 0)
//!
//! any non-terminal ──status lost──► Unknown
//! ```
//!
//! Transitions are applied only through the `pub(crate)` mutators, which the
//! order lifecycle manager drives. Everything else sees read-only snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderId, Price, Quantity, Symbol, VenueId};
use crate::error::GatewayError;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side that offsets this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Position sign of a fill on this side: `+1` for buys, `-1` for sells.
    #[must_use]
    pub fn sign(self) -> Decimal {
        match self {
            Self::Buy => Decimal::ONE,
            Self::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    /// Signed position delta for a fill of `quantity`.
    #[must_use]
    pub fn signed(self, quantity: Quantity) -> Quantity {
        self.sign() * quantity
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Resting limit order that must not take liquidity.
    PostOnly,
    /// Marketable order that takes liquidity immediately.
    Market,
}

/// What to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    /// Limit price for post-only orders, reference price for market orders.
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderSpec {
    pub fn post_only(
        venue: VenueId,
        symbol: Symbol,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            venue,
            symbol,
            side,
            kind: OrderKind::PostOnly,
            price,
            quantity,
        }
    }

    pub fn market(
        venue: VenueId,
        symbol: Symbol,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            venue,
            symbol,
            side,
            kind: OrderKind::Market,
            price,
            quantity,
        }
    }
}

/// Status as reported by a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueOrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// One status observation from a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: VenueOrderStatus,
    pub filled_quantity: Quantity,
    pub average_price: Option<Price>,
}

impl StatusReport {
    #[must_use]
    pub const fn new(status: VenueOrderStatus, filled_quantity: Quantity) -> Self {
        Self {
            status,
            filled_quantity,
            average_price: None,
        }
    }

    #[must_use]
    pub const fn with_price(mut self, price: Price) -> Self {
        self.average_price = Some(price);
        self
    }

    /// Return true if the venue still considers the order working.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(
            self.status,
            VenueOrderStatus::Open | VenueOrderStatus::PartiallyFilled
        )
    }
}

/// Tracked order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingSubmit,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    /// Status could not be established; the venue position must be reconciled.
    Unknown,
}

impl OrderStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Unknown
        )
    }

    /// Return true while the order may still rest on the book.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::PartiallyFilled)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingSubmit => "pending_submit",
            Self::Open => "open",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    id: Option<OrderId>,
    venue: VenueId,
    symbol: Symbol,
    side: Side,
    kind: OrderKind,
    price: Price,
    quantity: Quantity,
    filled_quantity: Quantity,
    average_price: Option<Price>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    rejection: Option<GatewayError>,
    /// Set once the venue position was reconciled after the order went unknown.
    reconciled: bool,
}

impl Order {
    /// A new order that has not been acknowledged yet.
    #[must_use]
    pub fn pending(spec: &OrderSpec) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            venue: spec.venue.clone(),
            symbol: spec.symbol.clone(),
            side: spec.side,
            kind: spec.kind,
            price: spec.price,
            quantity: spec.quantity,
            filled_quantity: Decimal::ZERO,
            average_price: None,
            status: OrderStatus::PendingSubmit,
            created_at: now,
            updated_at: now,
            rejection: None,
            reconciled: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&OrderId> {
        self.id.as_ref()
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
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    #[must_use]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    #[must_use]
    pub fn filled_quantity(&self) -> Quantity {
        self.filled_quantity
    }

    /// Filled quantity with the position sign of the order side.
    #[must_use]
    pub fn signed_filled(&self) -> Quantity {
        self.side.signed(self.filled_quantity)
    }

    #[must_use]
    pub fn average_price(&self) -> Option<Price> {
        self.average_price
    }

    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The gateway error that rejected the order, if any.
    #[must_use]
    pub fn rejection(&self) -> Option<&GatewayError> {
        self.rejection.as_ref()
    }

    /// Return true if the venue position already reflects this order.
    ///
    /// Only unknown orders are reconciled; their fills must not be booked
    /// again.
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    #[must_use]
    pub fn is_fully_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    pub(crate) fn mark_open(&mut self, id: OrderId) {
        if self.status == OrderStatus::PendingSubmit {
            self.id = Some(id);
            self.set_status(OrderStatus::Open);
        }
    }

    pub(crate) fn mark_rejected(&mut self, error: GatewayError) {
        if self.status == OrderStatus::PendingSubmit {
            self.rejection = Some(error);
            self.set_status(OrderStatus::Rejected);
        }
    }

    pub(crate) fn mark_unknown(&mut self) {
        if !self.status.is_terminal() {
            self.set_status(OrderStatus::Unknown);
        }
    }

    pub(crate) fn mark_reconciled(&mut self) {
        if self.status == OrderStatus::Unknown {
            self.reconciled = true;
        }
    }

    /// Fold one venue report into the tracked state.
    ///
    /// Filled quantity never decreases, never exceeds the order quantity,
    /// and terminal states are never left.
    /// A closed order with a positive fill resolves to `Filled`. Returns
    /// true if anything changed.
    pub(crate) fn apply_report(&mut self, report: &StatusReport) -> bool {
        if self.status.is_terminal() || self.status == OrderStatus::PendingSubmit {
            return false;
        }

        let before = (self.status, self.filled_quantity);
        let reported = report.filled_quantity.min(self.quantity);
        if reported > self.filled_quantity {
            self.filled_quantity = reported;
            if report.average_price.is_some() {
                self.average_price = report.average_price;
            }
        }

        let filled = self.filled_quantity > Decimal::ZERO;
        let next = match report.status {
            VenueOrderStatus::Open | VenueOrderStatus::PartiallyFilled if filled => {
                OrderStatus::PartiallyFilled
            }
            VenueOrderStatus::Open | VenueOrderStatus::PartiallyFilled => OrderStatus::Open,
            VenueOrderStatus::Filled => OrderStatus::Filled,
            VenueOrderStatus::Cancelled | VenueOrderStatus::Rejected if filled => {
                OrderStatus::Filled
            }
            VenueOrderStatus::Cancelled => OrderStatus::Cancelled,
            VenueOrderStatus::Rejected => OrderStatus::Rejected,
        };
        self.set_status(next);

        let changed = before != (self.status, self.filled_quantity);
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    fn set_status(&mut self, status: OrderStatus) {
        if self.status != status {
            self.status = status;
            self.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn open_order(qty: Decimal) -> Order {
        let spec = OrderSpec::post_only(
            VenueId::from("maker"),
            Symbol::from("BTC"),
            Side::Buy,
            dec!(100),
            qty,
        );
        let mut order = Order::pending(&spec);
        order.mark_open(OrderId::from("o-1"));
        order
    }

    #[test]
    fn side_sign_and_opposite() {
        assert_eq!(Side::Buy.signed(dec!(0.5)), dec!(0.5));
        assert_eq!(Side::Sell.signed(dec!(0.5)), dec!(-0.5));
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn ack_moves_pending_to_open() {
        let order = open_order(dec!(1));
        assert_eq!(order.status(), OrderStatus::Open);
        assert_eq!(order.id().map(OrderId::as_str), Some("o-1"));
    }

    #[test]
    fn partial_fill_stays_open() {
        let mut order = open_order(dec!(1));
        order.apply_report(&StatusReport::new(VenueOrderStatus::Open, dec!(0.3)));
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
        assert!(order.is_open());
    }

    #[test]
    fn cancelled_with_fill_resolves_to_filled() {
        let mut order = open_order(dec!(1));
        order.apply_report(&StatusReport::new(VenueOrderStatus::Cancelled, dec!(0.4)));
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.filled_quantity(), dec!(0.4));
        assert!(!order.is_fully_filled());
    }

    #[test]
    fn filled_quantity_is_monotonic() {
        let mut order = open_order(dec!(1));
        order.apply_report(&StatusReport::new(VenueOrderStatus::PartiallyFilled, dec!(0.6)));
        order.apply_report(&StatusReport::new(VenueOrderStatus::Open, dec!(0.2)));
        assert_eq!(order.filled_quantity(), dec!(0.6));
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
    }

    #[test]
    fn over_reported_fill_is_capped_at_quantity() {
        let mut order = open_order(dec!(0.01));
        order.apply_report(&StatusReport::new(VenueOrderStatus::Filled, dec!(0.05)));
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.filled_quantity(), dec!(0.01));
    }

    #[test]
    fn only_unknown_orders_are_marked_reconciled() {
        let mut order = open_order(dec!(1));
        order.mark_reconciled();
        assert!(!order.is_reconciled());

        order.mark_unknown();
        order.mark_reconciled();
        assert!(order.is_reconciled());
    }

    #[test]
    fn terminal_state_is_never_left() {
        let mut order = open_order(dec!(1));
        order.apply_report(&StatusReport::new(VenueOrderStatus::Cancelled, dec!(0)));
        assert!(!order.apply_report(&StatusReport::new(VenueOrderStatus::Filled, dec!(1))));
        assert_eq!(order.status(), OrderStatus::Cancelled);
        order.mark_unknown();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn rejection_is_recorded() {
        let spec = OrderSpec::market(
            VenueId::from("taker"),
            Symbol::from("BTC"),
            Side::Sell,
            dec!(112),
            dec!(0.01),
        );
        let mut order = Order::pending(&spec);
        order.mark_rejected(GatewayError::Rejected("margin".into()));
        assert_eq!(order.status(), OrderStatus::Rejected);
        assert!(order.rejection().is_some());
        assert_eq!(order.signed_filled(), Decimal::ZERO);
    }
}
