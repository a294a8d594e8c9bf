//! In-memory participant table and attribute pool.
//!
//! The registry owns no lock of its own; callers serialize access (see the
//! `Exchange` facade in santa-exchange). Every mutator either applies fully
//! or returns an error without touching state.

use std::collections::BTreeSet;

use crate::error::{RegistryError, SnapshotError};
use crate::snapshot::{self, RegistrySnapshot};
use crate::types::{ActorId, Assignment, AttributeToken, Participant, ParticipantName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    participants: Vec<Participant>,
    attributes: BTreeSet<AttributeToken>,
}

impl Registry {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Build a fresh registry from a roster and an attribute list.
    pub fn from_seed<N, A>(roster: N, attributes: A) -> Result<Self, SnapshotError>
    where
        N: IntoIterator,
        N::Item: Into<ParticipantName>,
        A: IntoIterator,
        A::Item: Into<AttributeToken>,
    {
        let participants: Vec<Participant> = roster.into_iter().map(Participant::new).collect();
        let mut pool = BTreeSet::new();
        for token in attributes {
            let token = token.into();
            if pool.contains(&token) {
                return Err(SnapshotError::DuplicateAttribute(token));
            }
            pool.insert(token);
        }
        Self::from_snapshot(RegistrySnapshot {
            participants,
            attributes: pool,
        })
    }

    /// Restore a registry from a persisted snapshot.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Result<Self, SnapshotError> {
        snapshot::validate(&snapshot)?;
        Ok(Self {
            participants: snapshot.participants,
            attributes: snapshot.attributes,
        })
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            participants: self.participants.clone(),
            attributes: self.attributes.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Roster in seed order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Remaining attribute pool.
    pub fn attributes(&self) -> &BTreeSet<AttributeToken> {
        &self.attributes
    }

    pub fn find_by_name(&self, name: &ParticipantName) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.name == name)
    }

    /// The participant held by `actor`, if any.
    pub fn find_by_actor(&self, actor: ActorId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_claimed_by(actor))
    }

    /// The participant called `name`, only while nobody holds it.
    pub fn find_unclaimed_by_name(&self, name: &ParticipantName) -> Option<&Participant> {
        self.find_by_name(name).filter(|p| !p.is_claimed())
    }

    /// Unclaimed names plus the actor's own claimed name, in roster order.
    pub fn list_claimable_names(&self, actor: ActorId) -> Vec<ParticipantName> {
        self.participants
            .iter()
            .filter(|p| !p.is_claimed() || p.is_claimed_by(actor))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Participants other than `exclude` that nobody has drawn yet.
    pub fn allocation_candidates(&self, exclude: &ParticipantName) -> Vec<&Participant> {
        self.participants
            .iter()
            .filter(|p| &p.name != exclude && !p.is_assigned())
            .collect()
    }

    /// The assignment recorded on the actor's participant.
    pub fn assignment_for(&self, actor: ActorId) -> Option<&Assignment> {
        self.find_by_actor(actor).and_then(|p| p.assignment.as_ref())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Bind `actor` to the participant `name`.
    ///
    /// Re-committing the pair the actor already holds is a no-op.
    pub fn commit_claim(
        &mut self,
        name: &ParticipantName,
        actor: ActorId,
    ) -> Result<(), RegistryError> {
        let index = self.index_of(name)?;
        if let Some(holder) = self.participants[index].claimed_by {
            if holder == actor {
                return Ok(());
            }
            return Err(RegistryError::AlreadyClaimed {
                name: name.clone(),
                holder,
            });
        }
        if let Some(held) = self.find_by_actor(actor) {
            return Err(RegistryError::DuplicateActor {
                actor,
                held: held.name.clone(),
            });
        }
        self.participants[index].claimed_by = Some(actor);
        Ok(())
    }

    /// Write the recipient/attribute pair on `name`. Write-once.
    pub fn assign_recipient(
        &mut self,
        name: &ParticipantName,
        recipient: ParticipantName,
        attribute: AttributeToken,
    ) -> Result<(), RegistryError> {
        let index = self.index_of(name)?;
        if &recipient == name {
            return Err(RegistryError::SelfAssignment(name.clone()));
        }
        if self.find_by_name(&recipient).is_none() {
            return Err(RegistryError::UnknownParticipant(recipient));
        }
        let participant = &mut self.participants[index];
        if participant.assignment.is_some() {
            return Err(RegistryError::AlreadyAssigned(name.clone()));
        }
        participant.assignment = Some(Assignment {
            recipient,
            attribute,
        });
        Ok(())
    }

    /// Take `token` out of the pool for good.
    pub fn remove_attribute(&mut self, token: &AttributeToken) -> Result<(), RegistryError> {
        if self.attributes.remove(token) {
            Ok(())
        } else {
            Err(RegistryError::AttributeNotFound(token.clone()))
        }
    }

    fn index_of(&self, name: &ParticipantName) -> Result<usize, RegistryError> {
        self.participants
            .iter()
            .position(|p| &p.name == name)
            .ok_or_else(|| RegistryError::UnknownParticipant(name.clone()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
