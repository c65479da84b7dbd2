//! Application services.
//!
//! These services orchestrate domain logic over the venue and event ports:
//! quote synchronization, position bookkeeping, order lifecycles and trade
//! cycles, wired together by the [`Engine`].

pub mod coordinator;
pub mod engine;
pub mod feed;
pub mod ledger;
pub mod order_lifecycle;
pub mod quote_sync;
pub mod reconcile;

pub use coordinator::{CycleConfig, SymbolParams, TradeCycleCoordinator};
pub use engine::{Engine, EngineConfig, QuoteAgeConfig, SymbolConfig};
pub use feed::QuoteFeed;
pub use ledger::{Exposure, PositionLedger, Reconciliation, Reservation, SymbolLimits};
pub use order_lifecycle::{AwaitOutcome, LifecycleConfig, OrderLifecycleManager};
pub use quote_sync::{NotReady, Observation, QuoteSnapshot, QuoteSynchronizer, SyncedQuotes, VenueBound, VenueQuote};
pub use reconcile::Reconciler;
