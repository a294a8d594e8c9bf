//! Domain types for the gift-exchange registry.
//!
//! Identifiers are newtypes so that an actor id, a roster name and an
//! attribute token can never be confused at a call site.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// External requester identity (a chat user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub i64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for ActorId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A name on the fixed roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantName(pub String);

impl ParticipantName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ParticipantName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ParticipantName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A decorative token drawn once from the attribute pool (a gift colour).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeToken(pub String);

impl AttributeToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AttributeToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AttributeToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A recipient + attribute pair. Both halves are written together and never
/// cleared, so a participant is either fully assigned or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub recipient: ParticipantName,
    pub attribute: AttributeToken,
}

/// A roster entry.
///
/// Valid combinations are `claimed_by` unset/set × `assignment` unset/set.
/// A participant can be assigned before it is claimed: that happens when an
/// earlier claimant drew it as their target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: ParticipantName,
    pub claimed_by: Option<ActorId>,
    pub assignment: Option<Assignment>,
}

impl Participant {
    /// A fresh, unclaimed and unassigned roster entry.
    pub fn new(name: impl Into<ParticipantName>) -> Self {
        Self {
            name: name.into(),
            claimed_by: None,
            assignment: None,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }

    pub fn is_claimed_by(&self, actor: ActorId) -> bool {
        self.claimed_by == Some(actor)
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
