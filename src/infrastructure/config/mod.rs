//! Infrastructure configuration modules.

pub mod execution;
pub mod logging;
pub mod settings;
pub mod symbol;
pub mod venue;

pub use settings::Config;
