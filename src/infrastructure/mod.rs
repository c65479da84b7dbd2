//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! trading logic.
//!
//! - [`bootstrap`] - composition root for runtime wiring
//! - [`config`] - configuration loading and validation

pub mod bootstrap;
pub mod config;
