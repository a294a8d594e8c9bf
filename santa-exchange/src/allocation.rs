//! Allocation engine: draws a target participant and an attribute token for a
//! freshly claimed participant.
//!
//! ## Draw protocol
//!
//! 1. Candidates = every participant except the claimant that nobody has drawn yet.
//! 2. Tokens = the remaining attribute pool.
//! 3. Either set empty → [`Allocation::Exhausted`], registry untouched.
//! 4. Pick one candidate `T` and one token `C` uniformly through the [`Selector`].
//! 5. `T` records the claimant with `C`; the claimant mirrors `T` with `C`.
//! 6. `C` leaves the pool.
//!
//! Steps 5–6 run against a scratch copy that replaces the registry only when
//! every step succeeded, so a fault leaves no half-written pair behind.

use serde::Serialize;

use santa_core::{Assignment, AttributeToken, ParticipantName, Registry, RegistryError};

use crate::selector::Selector;

/// Result of one allocation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Allocation {
    /// A new target and token were drawn for the claimant.
    Assigned(Assignment),
    /// The claimant had already been drawn as someone else's target before
    /// claiming; the existing pair is kept and nothing new is drawn.
    Reciprocal(Assignment),
    /// No candidate or no token was left. The claim stands without a task.
    Exhausted { candidates: usize, attributes: usize },
}

impl Allocation {
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Allocation::Assigned(a) | Allocation::Reciprocal(a) => Some(a),
            Allocation::Exhausted { .. } => None,
        }
    }

    /// Whether this allocation changed the registry.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Allocation::Assigned(_))
    }
}

/// Run the draw protocol for `claimant`.
///
/// Any `Err` is an internal invariant violation (for example a token that the
/// engine selected but the pool no longer holds).
pub fn allocate(
    registry: &mut Registry,
    claimant: &ParticipantName,
    selector: &mut dyn Selector,
) -> Result<Allocation, RegistryError> {
    let Some(participant) = registry.find_by_name(claimant) else {
        return Err(RegistryError::UnknownParticipant(claimant.clone()));
    };
    if let Some(existing) = &participant.assignment {
        return Ok(Allocation::Reciprocal(existing.clone()));
    }

    let candidates: Vec<ParticipantName> = registry
        .allocation_candidates(claimant)
        .into_iter()
        .map(|p| p.name.clone())
        .collect();
    let tokens: Vec<AttributeToken> = registry.attributes().iter().cloned().collect();
    if candidates.is_empty() || tokens.is_empty() {
        tracing::warn!(
            claimant = %claimant,
            candidates = candidates.len(),
            attributes = tokens.len(),
            "allocation exhausted",
        );
        return Ok(Allocation::Exhausted {
            candidates: candidates.len(),
            attributes: tokens.len(),
        });
    }

    let target = candidates[selector.pick(candidates.len())].clone();
    let token = tokens[selector.pick(tokens.len())].clone();

    let mut draft = registry.clone();
    draft.assign_recipient(&target, claimant.clone(), token.clone())?;
    draft.assign_recipient(claimant, target.clone(), token.clone())?;
    draft.remove_attribute(&token)?;
    *registry = draft;

    tracing::info!(
        claimant = %claimant,
        target = %target,
        attribute = %token,
        "allocation drawn",
    );
    Ok(Allocation::Assigned(Assignment {
        recipient: target,
        attribute: token,
    }))
}
