//! Intent Settlement - matches barter-style exchange intents into closed
//! settlement cycles
//!
//! Actors post intents (offer X, want Y). The matching engine searches the
//! open intents for a cycle in which every offer satisfies the next want, and
//! the coordinator re-validates a proposed cycle against current state before
//! closing its intents and recording the settlement in one atomic step.

pub mod api;
pub mod config;
pub mod coordination;
pub mod error;
pub mod intent;
pub mod matching;
pub mod metrics;
pub mod state;

pub use coordination::SettlementCoordinator;
pub use error::{ServiceError, ServiceResult};
pub use intent::{Intent, IntentId, IntentSnapshot, NewIntent, Settlement};
pub use matching::{ChainFinder, ChainRejection, ChainValidator, EngineError};
