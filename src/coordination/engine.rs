//! Settlement coordinator tying the matching engine to the intent store

use crate::config::EngineConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::intent::{Intent, IntentId, NewIntent, Settlement};
use crate::matching::ChainFinder;
use crate::metrics;
use crate::state::{IntentStore, SettlementOutcome};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Discovers and settles intent cycles against a store
pub struct SettlementCoordinator {
    /// Intent and settlement persistence
    store: Arc<dyn IntentStore>,
    /// Chain search with the configured depth bound
    finder: ChainFinder,
}

impl SettlementCoordinator {
    /// Create a new coordinator
    pub fn new(store: Arc<dyn IntentStore>, config: &EngineConfig) -> ServiceResult<Self> {
        let finder = ChainFinder::new(config.max_depth)?;
        Ok(Self { store, finder })
    }

    /// Post a new open intent
    pub async fn post_intent(&self, payload: NewIntent) -> ServiceResult<Intent> {
        let payload = payload.validate()?;
        let intent = self.store.create_intent(payload).await?;

        info!(
            "Intent {} posted by {}: offers {} wants {}",
            intent.id, intent.actor, intent.offer, intent.want
        );
        metrics::record_intent_created();
        Ok(intent)
    }

    /// All intents, newest first
    pub async fn intents(&self) -> ServiceResult<Vec<Intent>> {
        self.store.list_intents().await
    }

    pub async fn intent(&self, id: IntentId) -> ServiceResult<Intent> {
        self.store
            .get_intent(id)
            .await?
            .ok_or(ServiceError::IntentNotFound { id })
    }

    /// Close an intent so it no longer takes part in chains
    pub async fn cancel_intent(&self, id: IntentId) -> ServiceResult<()> {
        if !self.store.cancel_intent(id).await? {
            return Err(ServiceError::IntentNotFound { id });
        }

        info!("Intent {} cancelled", id);
        metrics::record_intent_cancelled();
        Ok(())
    }

    /// Find a settlement cycle through intent `id` over the current open intents
    pub async fn discover(&self, id: IntentId) -> ServiceResult<Vec<IntentId>> {
        if self.store.get_intent(id).await?.is_none() {
            return Err(ServiceError::IntentNotFound { id });
        }

        let snapshot = self.store.open_snapshot().await?;
        if snapshot.is_empty() {
            debug!("No open intents, skipping search for {}", id);
            return Err(ServiceError::NoChain { id });
        }

        let started = Instant::now();
        let found = self.finder.find_chain(id, &snapshot)?;
        let elapsed = started.elapsed().as_secs_f64();

        match found {
            Some(chain) => {
                info!("Discovered chain for intent {}: {:?}", id, chain);
                metrics::record_chain_found(chain.len(), elapsed);
                Ok(chain)
            }
            None => {
                debug!(
                    "No chain for intent {} among {} open intents",
                    id,
                    snapshot.len()
                );
                metrics::record_chain_not_found(elapsed);
                Err(ServiceError::NoChain { id })
            }
        }
    }

    /// Validate `chain` against current state and close it as one settlement
    pub async fn settle(&self, chain: &[IntentId]) -> ServiceResult<Settlement> {
        match self.store.commit_settlement(chain).await? {
            SettlementOutcome::Committed(settlement) => {
                info!("Settlement {} committed: {:?}", settlement.id, settlement.chain);
                metrics::record_settlement_committed();
                Ok(settlement)
            }
            SettlementOutcome::Rejected(rejection) => {
                warn!("Settlement of {:?} rejected: {}", chain, rejection);
                metrics::record_settlement_rejected();
                Err(ServiceError::InvalidChain(rejection))
            }
        }
    }

    /// Committed settlements, newest first
    pub async fn settlements(&self) -> ServiceResult<Vec<Settlement>> {
        self.store.list_settlements().await
    }

    pub async fn health_check(&self) -> ServiceResult<()> {
        self.store.health_check().await
    }
}
