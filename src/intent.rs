//! Intent and settlement records
//!
//! Defines the exchange intents posted by actors, the settlement records
//! produced when a cycle of intents is closed, and the point-in-time
//! snapshots the matching engine searches over.

use crate::error::{ServiceError, ServiceResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier assigned to an intent by the owning store
pub type IntentId = i64;

const MAX_ACTOR_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 128;

/// A posted offer/want pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    pub actor: String,
    pub offer: String,
    pub want: String,
    pub deadline: Option<String>,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

impl Intent {
    /// Build an open intent with the current timestamp
    pub fn open(id: IntentId, actor: &str, offer: &str, want: &str) -> Self {
        Self {
            id,
            actor: actor.to_string(),
            offer: offer.to_string(),
            want: want.to_string(),
            deadline: None,
            is_open: true,
            created_at: Utc::now(),
        }
    }

    /// Same intent, closed
    pub fn closed(mut self) -> Self {
        self.is_open = false;
        self
    }
}

/// Payload for posting a new intent
#[derive(Debug, Clone, Deserialize)]
pub struct NewIntent {
    pub actor: String,
    pub offer: String,
    pub want: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

impl NewIntent {
    pub fn new(actor: &str, offer: &str, want: &str) -> Self {
        Self {
            actor: actor.to_string(),
            offer: offer.to_string(),
            want: want.to_string(),
            deadline: None,
        }
    }

    /// Trim all fields and enforce length limits
    pub fn validate(self) -> ServiceResult<Self> {
        let actor = bounded("actor", &self.actor, MAX_ACTOR_LEN)?;
        let offer = bounded("offer", &self.offer, MAX_LABEL_LEN)?;
        let want = bounded("want", &self.want, MAX_LABEL_LEN)?;
        let deadline = self
            .deadline
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            actor,
            offer,
            want,
            deadline,
        })
    }
}

fn bounded(field: &str, value: &str, max: usize) -> ServiceResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > max {
        return Err(ServiceError::InvalidInput(format!(
            "{} must be between 1 and {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Immutable record of a committed settlement cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: i64,
    pub chain: Vec<IntentId>,
    pub created_at: DateTime<Utc>,
}

/// Serialize an ordered chain for storage
pub fn encode_chain(chain: &[IntentId]) -> String {
    chain
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a stored chain back into its submitted order
pub fn decode_chain(raw: &str) -> ServiceResult<Vec<IntentId>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    raw.split(',')
        .map(|part| {
            part.parse::<IntentId>()
                .map_err(|e| ServiceError::CorruptRecord(format!("bad chain '{}': {}", raw, e)))
        })
        .collect()
}

/// Point-in-time view of intents, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct IntentSnapshot {
    intents: Vec<Intent>,
    index: HashMap<IntentId, usize>,
}

impl IntentSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an intent; an id already present is left untouched
    pub fn insert(&mut self, intent: Intent) {
        if self.index.contains_key(&intent.id) {
            return;
        }
        self.index.insert(intent.id, self.intents.len());
        self.intents.push(intent);
    }

    pub fn get(&self, id: IntentId) -> Option<&Intent> {
        self.index.get(&id).map(|&pos| &self.intents[pos])
    }

    pub fn contains(&self, id: IntentId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of an intent in insertion order
    pub fn position(&self, id: IntentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn as_slice(&self) -> &[Intent] {
        &self.intents
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

impl FromIterator<Intent> for IntentSnapshot {
    fn from_iter<T: IntoIterator<Item = Intent>>(iter: T) -> Self {
        let mut snapshot = IntentSnapshot::new();
        for intent in iter {
            snapshot.insert(intent);
        }
        snapshot
    }
}
