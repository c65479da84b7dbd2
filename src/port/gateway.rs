//! Venue gateway port.
//!
//! One implementation per venue. Push and poll venues satisfy the same
//! contract so the core never branches on how a venue delivers data.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::{OrderId, OrderSpec, Quantity, Quote, StatusReport, Symbol, VenueId};
use crate::error::GatewayError;

/// How a venue delivers quotes and order updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Streams updates (websocket).
    #[default]
    Push,
    /// Must be polled (REST).
    Poll,
}

impl Delivery {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Poll => "poll",
        }
    }
}

/// Access to one trading venue.
///
/// Implementations must be thread-safe (`Send + Sync`) and tolerate
/// concurrent calls from quote ingestion, order lifecycle and
/// reconciliation.
#[async_trait]
pub trait VenueGateway: Send + Sync {
    /// Venue identifier used in positions and events.
    fn venue(&self) -> &VenueId;

    /// How this venue delivers data.
    fn delivery(&self) -> Delivery;

    /// Interval between polls for quotes and order status.
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Fetch the current best bid and offer.
    ///
    /// Returns [`GatewayError::Unavailable`] when the venue has no book.
    async fn quote(&self, symbol: &Symbol) -> Result<Quote, GatewayError>;

    /// Subscribe to pushed quotes. Poll venues return `None`.
    fn subscribe_quotes(&self) -> Option<broadcast::Receiver<Quote>> {
        None
    }

    /// Place an order and return the venue-assigned id on acknowledgment.
    async fn place_order(&self, spec: &OrderSpec) -> Result<OrderId, GatewayError>;

    /// Request cancellation. Success means the request was accepted, not
    /// that the order is cancelled.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), GatewayError>;

    /// Authoritative status of an order.
    async fn order_status(&self, order_id: &OrderId) -> Result<StatusReport, GatewayError>;

    /// Authoritative signed position for a symbol.
    async fn position(&self, symbol: &Symbol) -> Result<Quantity, GatewayError>;

    /// Wait for the next status observation of an order.
    ///
    /// The default polls: it sleeps one poll interval and queries the
    /// status. Push venues override this to wait on their stream. Callers
    /// bound the wait with their own timeout.
    async fn next_order_update(&self, order_id: &OrderId) -> Result<StatusReport, GatewayError> {
        tokio::time::sleep(self.poll_interval()).await;
        self.order_status(order_id).await
    }
}
