//! Unified error types surfaced by the runtime API.
//!
//! Wraps store failures and typed resource failures so callers can bubble them
//! up with consistent context. A cancelled rest or repair is not an error; see
//! [`crate::WorkflowOutcome::Cancelled`].

use rules_core::{ActorId, ActorKind, ErrorSeverity, InsufficientResource, RulesError};
use thiserror::Error;

pub use crate::repository::StoreError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InsufficientResource(#[from] InsufficientResource),

    #[error("actor '{actor}' is a {kind}, not a starship with a size item")]
    NotAStarship { actor: ActorId, kind: ActorKind },

    #[error("actor '{actor}' has no {resource}")]
    NoSuchResource { actor: ActorId, resource: String },

    /// A die or slot choice was dismissed.
    #[error("decision cancelled")]
    Cancelled,

    #[error("modifier source failed: {0}")]
    Modifiers(String),

    #[error("engine requires a record store before building")]
    MissingStore,
}

impl RulesError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Store(e) => e.severity(),
            Self::InsufficientResource(e) => e.severity(),
            Self::NotAStarship { .. } | Self::NoSuchResource { .. } => ErrorSeverity::Validation,
            Self::Cancelled => ErrorSeverity::Recoverable,
            Self::Modifiers(_) | Self::MissingStore => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::InsufficientResource(e) => e.error_code(),
            Self::NotAStarship { .. } => "NOT_A_STARSHIP",
            Self::NoSuchResource { .. } => "NO_SUCH_RESOURCE",
            Self::Cancelled => "CANCELLED",
            Self::Modifiers(_) => "MODIFIER_SOURCE",
            Self::MissingStore => "MISSING_STORE",
        }
    }
}
