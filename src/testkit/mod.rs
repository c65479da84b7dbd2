//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`gateway`] - `ScriptedGateway`, a deterministic [`VenueGateway`](crate::port::VenueGateway)
//! - [`sink`] - `RecordingSink`, keeps every emitted event
//! - [`domain`] - builders for quotes and symbol configs
//! - [`harness`] - a coordinator wired to two scripted venues

pub mod domain;
pub mod gateway;
pub mod harness;
pub mod sink;
