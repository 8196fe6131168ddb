//! Intent and settlement persistence
//!
//! Handles:
//! - Intent creation, lookup and cancellation
//! - Open-intent snapshots for chain discovery
//! - Atomic validate-and-close settlement commits
//! - Settlement history

mod manager;
mod memory;

pub use manager::StateManager;
pub use memory::MemoryStore;

use crate::error::ServiceResult;
use crate::intent::{Intent, IntentId, IntentSnapshot, NewIntent, Settlement};
use crate::matching::ChainRejection;

use async_trait::async_trait;

/// Result of an attempt to commit a settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Every intent was closed and the settlement recorded
    Committed(Settlement),
    /// The chain failed validation; nothing was changed
    Rejected(ChainRejection),
}

/// Repository of intents and settlements
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Persist a new open intent
    async fn create_intent(&self, intent: NewIntent) -> ServiceResult<Intent>;

    async fn get_intent(&self, id: IntentId) -> ServiceResult<Option<Intent>>;

    /// All intents, newest first
    async fn list_intents(&self) -> ServiceResult<Vec<Intent>>;

    /// Close an intent; returns false if it does not exist
    async fn cancel_intent(&self, id: IntentId) -> ServiceResult<bool>;

    /// Open intents in insertion order
    async fn open_snapshot(&self) -> ServiceResult<IntentSnapshot>;

    /// Validate `chain` against current state and, if it holds, close every
    /// intent in it and record the settlement, all as one atomic step
    async fn commit_settlement(&self, chain: &[IntentId]) -> ServiceResult<SettlementOutcome>;

    /// All settlements, newest first
    async fn list_settlements(&self) -> ServiceResult<Vec<Settlement>>;

    async fn health_check(&self) -> ServiceResult<()>;
}
