//! Venue-agnostic domain types.

mod cycle;
mod id;
mod money;
mod order;
mod position;
mod quote;
mod signal;

pub use cycle::{CycleOutcome, CycleState, Direction, TradeCycle};
pub use id::{CycleId, OrderId, Symbol, VenueId};
pub use money::{Price, Quantity};
pub use order::{Order, OrderKind, OrderSpec, OrderStatus, Side, StatusReport, VenueOrderStatus};
pub use position::Position;
pub use quote::{PriceLevel, Quote, QuoteDefect, QuoteSource};
pub use signal::{evaluate, Signal, Spreads, Thresholds};
