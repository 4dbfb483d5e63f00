//! Error types raised by record store implementations.

use rules_core::{ActorId, ErrorSeverity, ItemId, RulesError};
use thiserror::Error;

/// Errors surfaced by record store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store lock was poisoned")]
    LockPoisoned,

    #[error("record '{0}' not found")]
    NotFound(ActorId),

    #[error("record '{actor}' has no item '{item}'")]
    UnknownItem { actor: ActorId, item: ItemId },

    #[error("record id '{0}' cannot be used as a file name")]
    InvalidId(ActorId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

impl RulesError for StoreError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound(_) | Self::UnknownItem { .. } | Self::InvalidId(_) => {
                ErrorSeverity::Validation
            }
            Self::LockPoisoned | Self::Io(_) | Self::Json(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::LockPoisoned => "STORE_LOCK_POISONED",
            Self::NotFound(_) => "STORE_NOT_FOUND",
            Self::UnknownItem { .. } => "STORE_UNKNOWN_ITEM",
            Self::InvalidId(_) => "STORE_INVALID_ID",
            Self::Io(_) => "STORE_IO",
            Self::Json(_) => "STORE_JSON",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
