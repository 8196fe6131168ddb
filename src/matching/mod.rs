//! Cycle-resolution engine
//!
//! The matching engine:
//! 1. Discovers a closed settlement cycle starting from a given intent
//! 2. Re-verifies a proposed cycle against current intent state
//!
//! Both halves are pure functions of the snapshot they are handed; reading
//! and mutating intents is left to the store.

pub mod finder;
pub mod relation;
pub mod validator;

pub use finder::{ChainFinder, DEFAULT_MAX_DEPTH};
pub use validator::{ChainRejection, ChainValidator};

use thiserror::Error;

/// Caller contract violations raised by the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Search depth must be at least 1, got {0}")]
    InvalidDepth(usize),

    #[error("Cannot search an empty snapshot")]
    EmptySnapshot,
}
