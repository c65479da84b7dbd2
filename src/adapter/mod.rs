//! Adapters implementing the ports.
//!
//! - [`paper`] - simulated venue gateway
//! - [`sink`] - tracing event sink

pub mod paper;
pub mod sink;

pub use paper::{PaperConfig, PaperVenue};
pub use sink::LogEventSink;
