//! Coordination of discovery and settlement
//!
//! The coordinator:
//! 1. Accepts and cancels intents through the store
//! 2. Snapshots open intents and runs chain discovery
//! 3. Submits proposed chains for atomic validate-and-close settlement

pub mod engine;

pub use engine::SettlementCoordinator;
