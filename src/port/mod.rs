//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │       Application        │
//!     ┌───────────┤  sync · ledger · cycles  ├───────────┐
//!     │           └──────────────────────────┘           │
//!     ▼                                                  ▼
//! ┌──────────────┐                                ┌─────────────┐
//! │ VenueGateway │  maker venue, taker venue      │  EventSink  │
//! └──────────────┘                                └─────────────┘
//! ```
//!
//! - [`VenueGateway`] - quotes, orders and positions for one venue
//! - [`EventSink`] - fire-and-forget structured events

mod event;
mod gateway;

pub use event::{CycleSummary, Event, EventSink, EventSinkRegistry, NullSink};
pub use gateway::{Delivery, VenueGateway};
