//! In-memory intent store (lost on restart)

use super::{IntentStore, SettlementOutcome};
use crate::error::ServiceResult;
use crate::intent::{Intent, IntentId, IntentSnapshot, NewIntent, Settlement};
use crate::matching::ChainValidator;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    /// Intents in creation order
    intents: Vec<Intent>,
    /// Settlements in commit order
    settlements: Vec<Settlement>,
    next_intent_id: IntentId,
    next_settlement_id: i64,
}

impl MemoryState {
    fn intent_mut(&mut self, id: IntentId) -> Option<&mut Intent> {
        self.intents.iter_mut().find(|i| i.id == id)
    }
}

/// Intent store held entirely in process memory
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_intent_id: 1,
                next_settlement_id: 1,
                ..Default::default()
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentStore for MemoryStore {
    async fn create_intent(&self, intent: NewIntent) -> ServiceResult<Intent> {
        let mut state = self.state.lock().await;
        let id = state.next_intent_id;
        state.next_intent_id += 1;

        let intent = Intent {
            id,
            actor: intent.actor,
            offer: intent.offer,
            want: intent.want,
            deadline: intent.deadline,
            is_open: true,
            created_at: Utc::now(),
        };
        state.intents.push(intent.clone());

        debug!("Stored intent {} from {}", id, intent.actor);
        Ok(intent)
    }

    async fn get_intent(&self, id: IntentId) -> ServiceResult<Option<Intent>> {
        let state = self.state.lock().await;
        Ok(state.intents.iter().find(|i| i.id == id).cloned())
    }

    async fn list_intents(&self) -> ServiceResult<Vec<Intent>> {
        let state = self.state.lock().await;
        Ok(state.intents.iter().rev().cloned().collect())
    }

    async fn cancel_intent(&self, id: IntentId) -> ServiceResult<bool> {
        let mut state = self.state.lock().await;
        match state.intent_mut(id) {
            Some(intent) => {
                intent.is_open = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn open_snapshot(&self) -> ServiceResult<IntentSnapshot> {
        let state = self.state.lock().await;
        Ok(state.intents.iter().filter(|i| i.is_open).cloned().collect())
    }

    async fn commit_settlement(&self, chain: &[IntentId]) -> ServiceResult<SettlementOutcome> {
        // Held for the whole read-validate-write sequence
        let mut state = self.state.lock().await;

        let current: IntentSnapshot = state
            .intents
            .iter()
            .filter(|i| chain.contains(&i.id))
            .cloned()
            .collect();

        if let Err(rejection) = ChainValidator::check(chain, &current) {
            return Ok(SettlementOutcome::Rejected(rejection));
        }

        for &id in chain {
            if let Some(intent) = state.intent_mut(id) {
                intent.is_open = false;
            }
        }

        let settlement = Settlement {
            id: state.next_settlement_id,
            chain: chain.to_vec(),
            created_at: Utc::now(),
        };
        state.next_settlement_id += 1;
        state.settlements.push(settlement.clone());

        Ok(SettlementOutcome::Committed(settlement))
    }

    async fn list_settlements(&self) -> ServiceResult<Vec<Settlement>> {
        let state = self.state.lock().await;
        Ok(state.settlements.iter().rev().cloned().collect())
    }

    async fn health_check(&self) -> ServiceResult<()> {
        Ok(())
    }
}
