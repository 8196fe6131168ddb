//! Error types for the intent settlement service

use crate::intent::IntentId;
use crate::matching::{ChainRejection, EngineError};

use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Intent {id} not found")]
    IntentNotFound { id: IntentId },

    #[error("No chain found for intent {id}")]
    NoChain { id: IntentId },

    #[error("Invalid or stale chain: {0}")]
    InvalidChain(ChainRejection),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Outcome caused by the request rather than a service fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::IntentNotFound { .. }
                | ServiceError::NoChain { .. }
                | ServiceError::InvalidChain(_)
                | ServiceError::InvalidInput(_)
        )
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
