//! Re-verification of proposed settlement chains

use super::relation::satisfies;
use crate::intent::{IntentId, IntentSnapshot};

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Why a proposed chain cannot be settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ChainRejection {
    TooShort { len: usize },
    Duplicate { id: IntentId },
    UnknownIntent { id: IntentId },
    Closed { id: IntentId },
    BrokenLink { from: IntentId, to: IntentId },
}

impl fmt::Display for ChainRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRejection::TooShort { len } => {
                write!(f, "chain has {} intents, at least 2 required", len)
            }
            ChainRejection::Duplicate { id } => write!(f, "intent {} appears more than once", id),
            ChainRejection::UnknownIntent { id } => write!(f, "intent {} does not exist", id),
            ChainRejection::Closed { id } => write!(f, "intent {} is closed", id),
            ChainRejection::BrokenLink { from, to } => {
                write!(f, "intent {} does not offer what intent {} wants", from, to)
            }
        }
    }
}

/// Certifies that a chain, in the order given, is an open settlement cycle
pub struct ChainValidator;

impl ChainValidator {
    /// Check `chain` against `current` state, reporting the first failure
    pub fn check(chain: &[IntentId], current: &IntentSnapshot) -> Result<(), ChainRejection> {
        if chain.len() < 2 {
            return Err(ChainRejection::TooShort { len: chain.len() });
        }

        let mut seen = HashSet::with_capacity(chain.len());
        for &id in chain {
            if !seen.insert(id) {
                return Err(ChainRejection::Duplicate { id });
            }
        }

        let mut ordered = Vec::with_capacity(chain.len());
        for &id in chain {
            let intent = current
                .get(id)
                .ok_or(ChainRejection::UnknownIntent { id })?;
            if !intent.is_open {
                return Err(ChainRejection::Closed { id });
            }
            ordered.push(intent);
        }

        // Every offer feeds the next want, wrapping back to the start
        for (idx, giver) in ordered.iter().enumerate() {
            let receiver = ordered[(idx + 1) % ordered.len()];
            if !satisfies(giver, receiver) {
                return Err(ChainRejection::BrokenLink {
                    from: giver.id,
                    to: receiver.id,
                });
            }
        }

        Ok(())
    }

    /// Whether `chain` may be settled against `current` state
    pub fn validate(chain: &[IntentId], current: &IntentSnapshot) -> bool {
        match Self::check(chain, current) {
            Ok(()) => true,
            Err(rejection) => {
                debug!("Rejected chain {:?}: {}", chain, rejection);
                false
            }
        }
    }
}
