//! Template context — serializable rendering payload built from workflow outcomes.

use serde::{Deserialize, Serialize};

use santa_core::{Assignment, ParticipantName};
use santa_exchange::ExchangeError;

use crate::error::RenderError;

/// Flat payload shared by every reply template.
///
/// Templates only read the fields relevant to them; unused fields stay at
/// their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyContext {
    /// The participant name the reply is about.
    pub name: String,
    /// Claimable names, in roster order.
    pub names: Vec<String>,
    pub assignment: Option<AssignmentCtx>,
    /// Machine-readable error kind for `error.tera`.
    pub kind: Option<String>,
    /// Human-readable detail for `error.tera`.
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCtx {
    pub recipient: String,
    pub attribute: String,
}

impl From<&Assignment> for AssignmentCtx {
    fn from(a: &Assignment) -> Self {
        Self {
            recipient: a.recipient.to_string(),
            attribute: a.attribute.to_string(),
        }
    }
}

impl ReplyContext {
    pub fn for_name(name: &ParticipantName) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn for_names(names: &[ParticipantName]) -> Self {
        Self {
            names: names.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn with_assignment(mut self, assignment: Option<&Assignment>) -> Self {
        self.assignment = assignment.map(AssignmentCtx::from);
        self
    }

    pub fn for_error(err: &ExchangeError) -> Self {
        let name = match err {
            ExchangeError::NameUnavailable(name) | ExchangeError::AlreadyClaimed(name) => {
                name.to_string()
            }
            ExchangeError::DuplicateActor { held, .. } => held.to_string(),
            _ => String::new(),
        };
        let message = match err {
            ExchangeError::InvalidState { state, .. } => state.clone(),
            other => other.to_string(),
        };
        Self {
            name,
            kind: Some(err.kind().to_string()),
            message: Some(message),
            ..Self::default()
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}
