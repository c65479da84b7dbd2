//! Crossarb - cross-venue maker/taker spread arbitrage.
//!
//! Rests a post-only order on a maker venue when the spread against a taker
//! venue is wide enough, and hedges every confirmed maker fill with a market
//! order on the taker venue.
//!
//! # Modules
//!
//! - [`domain`] - ids, quotes, orders, positions, trade cycles and signal evaluation
//! - [`port`] - venue gateway and event sink traits
//! - [`application`] - quote synchronizer, position ledger, order lifecycles,
//!   trade cycle coordinator and the engine that runs them
//! - [`adapter`] - paper venue and tracing event sink
//! - [`infrastructure`] - configuration, logging and wiring
//! - [`cli`] - command-line interface
//! - [`error`] - error types
//!
//! # Features
//!
//! - `testkit` - scripted gateways and recording sinks for integration tests

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
