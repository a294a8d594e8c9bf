//! Error types for santa-exchange.

use serde::Serialize;
use thiserror::Error;

use santa_core::{ActorId, ParticipantName, RegistryError, SnapshotError, StoreError};

/// Everything a workflow request can be rejected with.
///
/// `NameUnavailable`, `AlreadyClaimed`, `DuplicateActor` and `InvalidState`
/// are ordinary user-facing outcomes. `Internal` means the allocation logic
/// and the pool disagree; it is never the caller's fault.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("name '{0}' is already taken or not on the roster")]
    NameUnavailable(ParticipantName),

    #[error("name '{0}' was claimed by someone else first")]
    AlreadyClaimed(ParticipantName),

    #[error("actor {actor} already claimed '{held}'")]
    DuplicateActor {
        actor: ActorId,
        held: ParticipantName,
    },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// `warning` is set when the claim the fault left committed could not
    /// be saved either.
    #[error("internal allocation fault: {source}")]
    Internal {
        #[source]
        source: RegistryError,
        warning: Option<PersistenceWarning>,
    },

    #[error("registry store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid seed: {0}")]
    Seed(#[from] SnapshotError),
}

impl ExchangeError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::NameUnavailable(_) => "name_unavailable",
            ExchangeError::AlreadyClaimed(_) => "already_claimed",
            ExchangeError::DuplicateActor { .. } => "duplicate_actor",
            ExchangeError::InvalidState { .. } => "invalid_state",
            ExchangeError::Internal { .. } => "internal",
            ExchangeError::Store(_) => "store",
            ExchangeError::Seed(_) => "seed",
        }
    }

    /// Whether the error signals a fault rather than a user outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::Internal { .. } | ExchangeError::Store(_) | ExchangeError::Seed(_)
        )
    }

    /// Save failure attached to a fault, if any.
    pub fn persistence_warning(&self) -> Option<&PersistenceWarning> {
        match self {
            ExchangeError::Internal { warning, .. } => warning.as_ref(),
            _ => None,
        }
    }
}

/// A save that failed after an otherwise successful mutation.
///
/// The in-memory state stays authoritative; nothing is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceWarning {
    pub message: String,
}

impl From<&StoreError> for PersistenceWarning {
    fn from(err: &StoreError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}
