//! Two-phase claim workflow behind one synchronized [`Exchange`].
//!
//! Per actor: `NoClaim → Proposed(name) → Claimed`. `Claimed` is terminal.
//!
//! ## Locking
//!
//! Registry, proposal table and selector live under a single
//! `parking_lot::RwLock`. `confirm` holds the write lock across the re-check,
//! the claim commit, the allocation draw, the token removal and the save, so
//! no two confirmations can interleave between selecting and removing a
//! token. Queries take the read lock and see a consistent snapshot.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use santa_core::{
    ActorId, Assignment, ParticipantName, PersistenceGateway, Registry, RegistryError,
    RegistrySnapshot, SeedConfig,
};

use crate::allocation::{self, Allocation};
use crate::error::{ExchangeError, PersistenceWarning};
use crate::selector::Selector;

// ---------------------------------------------------------------------------
// Public outcome types
// ---------------------------------------------------------------------------

/// An unconfirmed claim. Proposals never expire on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub name: ParticipantName,
    pub proposed_at: DateTime<Utc>,
}

/// Where an actor stands in the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimState {
    NoClaim,
    Proposed(Proposal),
    Claimed { name: ParticipantName },
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimState::NoClaim => write!(f, "no claim is pending"),
            ClaimState::Proposed(p) => write!(f, "a claim for '{}' is pending", p.name),
            ClaimState::Claimed { name } => write!(f, "'{name}' is already claimed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProposeOutcome {
    /// A proposal is now pending confirmation.
    Proposed { name: ParticipantName },
    /// The actor already holds this name; nothing was re-proposed.
    AlreadyYours {
        name: ParticipantName,
        assignment: Option<Assignment>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmed {
    pub name: ParticipantName,
    pub allocation: Allocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PersistenceWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cancelled {
    pub name: ParticipantName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssignmentView {
    Assigned {
        name: ParticipantName,
        assignment: Assignment,
    },
    NotAssignedYet {
        name: ParticipantName,
    },
    NoClaim,
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

struct State {
    registry: Registry,
    proposals: HashMap<ActorId, Proposal>,
    selector: Box<dyn Selector>,
    #[cfg(test)]
    injected_fault: Option<RegistryError>,
}

/// The shared, synchronized gift-exchange pool.
pub struct Exchange {
    state: RwLock<State>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl Exchange {
    pub fn new(
        registry: Registry,
        gateway: Arc<dyn PersistenceGateway>,
        selector: Box<dyn Selector>,
    ) -> Self {
        Self {
            state: RwLock::new(State {
                registry,
                proposals: HashMap::new(),
                selector,
                #[cfg(test)]
                injected_fault: None,
            }),
            gateway,
        }
    }

    /// Restore from the gateway, or build from `seed` and save immediately
    /// when nothing was persisted yet.
    pub fn open(
        gateway: Arc<dyn PersistenceGateway>,
        seed: SeedConfig,
        selector: Box<dyn Selector>,
    ) -> Result<Self, ExchangeError> {
        let registry = match gateway.load()? {
            Some(snapshot) => {
                tracing::info!(
                    participants = snapshot.participants.len(),
                    attributes = snapshot.attributes.len(),
                    "registry restored from snapshot",
                );
                Registry::from_snapshot(snapshot)?
            }
            None => {
                let registry = seed.into_registry()?;
                gateway.save(&registry.snapshot())?;
                tracing::info!(
                    participants = registry.participants().len(),
                    attributes = registry.attributes().len(),
                    "registry initialised from seed",
                );
                registry
            }
        };
        Ok(Self::new(registry, gateway, selector))
    }

    // -----------------------------------------------------------------------
    // Workflow transitions
    // -----------------------------------------------------------------------

    /// `NoClaim → Proposed(name)`.
    pub fn propose(
        &self,
        actor: ActorId,
        name: ParticipantName,
    ) -> Result<ProposeOutcome, ExchangeError> {
        let mut state = self.state.write();

        if let Some(own) = state.registry.find_by_actor(actor) {
            if own.name == name {
                tracing::info!(actor = %actor, name = %name, "actor re-selected own name");
                return Ok(ProposeOutcome::AlreadyYours {
                    name,
                    assignment: own.assignment.clone(),
                });
            }
            return Err(ExchangeError::InvalidState {
                operation: "propose",
                state: ClaimState::Claimed {
                    name: own.name.clone(),
                }
                .to_string(),
            });
        }

        if let Some(pending) = state.proposals.get(&actor) {
            return Err(ExchangeError::InvalidState {
                operation: "propose",
                state: ClaimState::Proposed(pending.clone()).to_string(),
            });
        }

        if state.registry.find_unclaimed_by_name(&name).is_none() {
            tracing::warn!(actor = %actor, name = %name, "proposed name unavailable");
            return Err(ExchangeError::NameUnavailable(name));
        }

        state.proposals.insert(
            actor,
            Proposal {
                name: name.clone(),
                proposed_at: Utc::now(),
            },
        );
        tracing::info!(actor = %actor, name = %name, "claim proposed, awaiting confirmation");
        Ok(ProposeOutcome::Proposed { name })
    }

    /// `Proposed(name) → Claimed`, then allocate and save.
    ///
    /// The proposal is consumed whatever the result, so a race loser is back
    /// in `NoClaim` and may propose again.
    pub fn confirm(&self, actor: ActorId) -> Result<Confirmed, ExchangeError> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let Some(proposal) = state.proposals.remove(&actor) else {
            return Err(ExchangeError::InvalidState {
                operation: "confirm",
                state: current_state(state, actor).to_string(),
            });
        };
        let name = proposal.name;

        state
            .registry
            .commit_claim(&name, actor)
            .map_err(|err| match err {
                RegistryError::AlreadyClaimed { name, holder } => {
                    tracing::info!(actor = %actor, name = %name, holder = %holder, "confirm lost claim race");
                    ExchangeError::AlreadyClaimed(name)
                }
                RegistryError::DuplicateActor { actor, held } => {
                    ExchangeError::DuplicateActor { actor, held }
                }
                other => ExchangeError::Internal {
                    source: other,
                    warning: None,
                },
            })?;
        tracing::info!(actor = %actor, name = %name, "claim confirmed");

        let allocation = match draw(state, &name) {
            Ok(allocation) => allocation,
            Err(fault) => {
                tracing::error!(actor = %actor, name = %name, error = %fault, "allocation fault");
                let warning = self.persist(&state.registry);
                if let Some(warning) = &warning {
                    tracing::error!(
                        actor = %actor,
                        name = %name,
                        error = %warning.message,
                        "claim left committed by allocation fault is not on disk",
                    );
                }
                return Err(ExchangeError::Internal {
                    source: fault,
                    warning,
                });
            }
        };

        let warning = self.persist(&state.registry);
        Ok(Confirmed {
            name,
            allocation,
            warning,
        })
    }

    /// `Proposed(name) → NoClaim`.
    pub fn cancel(&self, actor: ActorId) -> Result<Cancelled, ExchangeError> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        match state.proposals.remove(&actor) {
            Some(proposal) => {
                tracing::info!(actor = %actor, name = %proposal.name, "proposal cancelled");
                Ok(Cancelled {
                    name: proposal.name,
                })
            }
            None => Err(ExchangeError::InvalidState {
                operation: "cancel",
                state: current_state(state, actor).to_string(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn my_assignment(&self, actor: ActorId) -> AssignmentView {
        let state = self.state.read();
        match state.registry.find_by_actor(actor) {
            Some(p) => match &p.assignment {
                Some(assignment) => AssignmentView::Assigned {
                    name: p.name.clone(),
                    assignment: assignment.clone(),
                },
                None => AssignmentView::NotAssignedYet {
                    name: p.name.clone(),
                },
            },
            None => AssignmentView::NoClaim,
        }
    }

    pub fn list_claimable_names(&self, actor: ActorId) -> Vec<ParticipantName> {
        self.state.read().registry.list_claimable_names(actor)
    }

    pub fn claim_state(&self, actor: ActorId) -> ClaimState {
        current_state(&self.state.read(), actor)
    }

    pub fn pending_proposals(&self) -> usize {
        self.state.read().proposals.len()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.state.read().registry.snapshot()
    }

    // -----------------------------------------------------------------------
    // Persistence hook
    // -----------------------------------------------------------------------

    /// Make the next allocation fail with `fault`.
    #[cfg(test)]
    fn inject_fault(&self, fault: RegistryError) {
        self.state.write().injected_fault = Some(fault);
    }

    fn persist(&self, registry: &Registry) -> Option<PersistenceWarning> {
        match self.gateway.save(&registry.snapshot()) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(error = %err, "registry save failed; in-memory state kept");
                Some(PersistenceWarning::from(&err))
            }
        }
    }
}

fn draw(state: &mut State, claimant: &ParticipantName) -> Result<Allocation, RegistryError> {
    #[cfg(test)]
    {
        if let Some(fault) = state.injected_fault.take() {
            return Err(fault);
        }
    }
    allocation::allocate(&mut state.registry, claimant, state.selector.as_mut())
}

fn current_state(state: &State, actor: ActorId) -> ClaimState {
    if let Some(p) = state.registry.find_by_actor(actor) {
        return ClaimState::Claimed {
            name: p.name.clone(),
        };
    }
    match state.proposals.get(&actor) {
        Some(proposal) => ClaimState::Proposed(proposal.clone()),
        None => ClaimState::NoClaim,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
