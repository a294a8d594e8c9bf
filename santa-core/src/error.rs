//! Error types for santa-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ActorId, AttributeToken, ParticipantName};

/// Rejections from in-memory registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is not on the roster.
    #[error("participant '{0}' is not on the roster")]
    UnknownParticipant(ParticipantName),

    /// Another actor already holds this participant.
    #[error("participant '{name}' is already claimed by actor {holder}")]
    AlreadyClaimed {
        name: ParticipantName,
        holder: ActorId,
    },

    /// The actor already holds a different participant.
    #[error("actor {actor} already claimed '{held}'")]
    DuplicateActor {
        actor: ActorId,
        held: ParticipantName,
    },

    /// Recipient and attribute are write-once.
    #[error("participant '{0}' already has an assignment")]
    AlreadyAssigned(ParticipantName),

    /// A participant can never be its own recipient.
    #[error("participant '{0}' cannot be assigned to itself")]
    SelfAssignment(ParticipantName),

    /// The token is not in the remaining pool.
    #[error("attribute '{0}' is not in the pool")]
    AttributeNotFound(AttributeToken),
}

/// Structural problems found while building a registry from a seed or a
/// persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("roster is empty")]
    EmptyRoster,

    #[error("roster contains a blank name")]
    EmptyName,

    #[error("attribute pool contains a blank token")]
    EmptyAttribute,

    #[error("duplicate roster name '{0}'")]
    DuplicateName(ParticipantName),

    #[error("duplicate attribute '{0}'")]
    DuplicateAttribute(AttributeToken),

    #[error("actor {actor} holds more than one participant ('{first}', '{second}')")]
    DuplicateActor {
        actor: ActorId,
        first: ParticipantName,
        second: ParticipantName,
    },

    #[error("participant '{0}' has only one of recipient/attribute set")]
    HalfAssigned(ParticipantName),

    #[error("participant '{0}' has inconsistent approved/user_id fields")]
    ClaimMismatch(ParticipantName),

    #[error("participant '{0}' is assigned to itself")]
    SelfAssignment(ParticipantName),

    #[error("participant '{name}' is assigned to unknown recipient '{recipient}'")]
    UnknownRecipient {
        name: ParticipantName,
        recipient: ParticipantName,
    },

    #[error("attribute '{0}' is both in the pool and assigned")]
    AttributeDoubleSpent(AttributeToken),
}

/// Errors from loading or saving registry snapshots and seed files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot JSON on disk could not be parsed or failed validation.
    #[error("failed to parse snapshot at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Seed YAML could not be parsed.
    #[error("failed to parse seed at {path}: {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Seed YAML serialization error.
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// Injected failure from an in-memory gateway.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
