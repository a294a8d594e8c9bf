//! Registry snapshot and its on-disk record layout.
//!
//! The JSON layout matches the `participants.json` file written by earlier
//! deployments of the bot:
//!
//! ```json
//! {
//!   "participants": [
//!     {"name": "Ann", "approved": true, "user_id": 7, "assigned_to": "Bob", "color": "Red"}
//!   ],
//!   "colors": ["Blue"]
//! }
//! ```
//!
//! Decoding goes through [`validate`], so a snapshot obtained from serde is
//! always one the registry can accept.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::types::{ActorId, Assignment, AttributeToken, Participant, ParticipantName};

/// Full registry state: ordered roster plus the remaining attribute pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotFile", into = "SnapshotFile")]
pub struct RegistrySnapshot {
    pub participants: Vec<Participant>,
    pub attributes: BTreeSet<AttributeToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFile {
    participants: Vec<ParticipantRecord>,
    #[serde(default)]
    colors: Vec<AttributeToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticipantRecord {
    name: ParticipantName,
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    user_id: Option<ActorId>,
    #[serde(default)]
    assigned_to: Option<ParticipantName>,
    #[serde(default)]
    color: Option<AttributeToken>,
}

impl From<RegistrySnapshot> for SnapshotFile {
    fn from(snapshot: RegistrySnapshot) -> Self {
        let participants = snapshot
            .participants
            .into_iter()
            .map(|p| {
                let (assigned_to, color) = match p.assignment {
                    Some(a) => (Some(a.recipient), Some(a.attribute)),
                    None => (None, None),
                };
                ParticipantRecord {
                    name: p.name,
                    approved: p.claimed_by.is_some(),
                    user_id: p.claimed_by,
                    assigned_to,
                    color,
                }
            })
            .collect();
        SnapshotFile {
            participants,
            colors: snapshot.attributes.into_iter().collect(),
        }
    }
}

impl TryFrom<SnapshotFile> for RegistrySnapshot {
    type Error = SnapshotError;

    fn try_from(file: SnapshotFile) -> Result<Self, Self::Error> {
        let mut participants = Vec::with_capacity(file.participants.len());
        for record in file.participants {
            let claimed_by = match (record.approved, record.user_id) {
                (true, Some(actor)) => Some(actor),
                (false, None) => None,
                _ => return Err(SnapshotError::ClaimMismatch(record.name)),
            };
            let assignment = match (record.assigned_to, record.color) {
                (Some(recipient), Some(attribute)) => Some(Assignment {
                    recipient,
                    attribute,
                }),
                (None, None) => None,
                _ => return Err(SnapshotError::HalfAssigned(record.name)),
            };
            participants.push(Participant {
                name: record.name,
                claimed_by,
                assignment,
            });
        }

        let mut attributes = BTreeSet::new();
        for token in file.colors {
            if attributes.contains(&token) {
                return Err(SnapshotError::DuplicateAttribute(token));
            }
            attributes.insert(token);
        }

        let snapshot = RegistrySnapshot {
            participants,
            attributes,
        };
        validate(&snapshot)?;
        Ok(snapshot)
    }
}

/// Check every cross-participant invariant of a snapshot.
pub fn validate(snapshot: &RegistrySnapshot) -> Result<(), SnapshotError> {
    if snapshot.participants.is_empty() {
        return Err(SnapshotError::EmptyRoster);
    }

    if snapshot.attributes.iter().any(|a| a.as_str().trim().is_empty()) {
        return Err(SnapshotError::EmptyAttribute);
    }

    let mut names = HashSet::new();
    for p in &snapshot.participants {
        if p.name.as_str().trim().is_empty() {
            return Err(SnapshotError::EmptyName);
        }
        if !names.insert(&p.name) {
            return Err(SnapshotError::DuplicateName(p.name.clone()));
        }
    }

    let mut holders: HashMap<ActorId, &ParticipantName> = HashMap::new();
    for p in &snapshot.participants {
        if let Some(actor) = p.claimed_by {
            if let Some(first) = holders.insert(actor, &p.name) {
                return Err(SnapshotError::DuplicateActor {
                    actor,
                    first: first.clone(),
                    second: p.name.clone(),
                });
            }
        }

        let Some(assignment) = &p.assignment else {
            continue;
        };
        if assignment.attribute.as_str().trim().is_empty() {
            return Err(SnapshotError::EmptyAttribute);
        }
        if assignment.recipient == p.name {
            return Err(SnapshotError::SelfAssignment(p.name.clone()));
        }
        if !names.contains(&assignment.recipient) {
            return Err(SnapshotError::UnknownRecipient {
                name: p.name.clone(),
                recipient: assignment.recipient.clone(),
            });
        }
        if snapshot.attributes.contains(&assignment.attribute) {
            return Err(SnapshotError::AttributeDoubleSpent(
                assignment.attribute.clone(),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RegistrySnapshot, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn decodes_legacy_layout_with_nulls() {
        let snapshot = parse(
            r#"{
                "participants": [
                    {"name": "Ann", "approved": true, "user_id": 7, "assigned_to": "Bob", "color": "Red"},
                    {"name": "Bob", "approved": false, "user_id": null, "assigned_to": "Ann", "color": "Red"},
                    {"name": "Cara", "approved": false, "user_id": null, "assigned_to": null, "color": null}
                ],
                "colors": ["Blue"]
            }"#,
        )
        .expect("decode");

        assert_eq!(snapshot.participants.len(), 3);
        assert_eq!(snapshot.participants[0].claimed_by, Some(ActorId(7)));
        assert_eq!(
            snapshot.participants[1].assignment.as_ref().map(|a| a.recipient.as_str()),
            Some("Ann")
        );
        assert!(snapshot.participants[2].assignment.is_none());
        assert!(snapshot.attributes.contains(&AttributeToken::from("Blue")));
    }

    #[test]
    fn rejects_half_assigned_record() {
        let err = parse(
            r#"{"participants": [
                {"name": "Ann", "assigned_to": "Bob"},
                {"name": "Bob"}
            ], "colors": []}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("only one of recipient/attribute"), "got: {err}");
    }

    #[test]
    fn rejects_approved_without_user_id() {
        let err = parse(r#"{"participants": [{"name": "Ann", "approved": true}], "colors": []}"#)
            .unwrap_err();
        assert!(err.to_string().contains("approved/user_id"), "got: {err}");
    }

    #[test]
    fn rejects_token_both_in_pool_and_assigned() {
        let err = parse(
            r#"{"participants": [
                {"name": "Ann", "assigned_to": "Bob", "color": "Red"},
                {"name": "Bob"}
            ], "colors": ["Red"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both in the pool"), "got: {err}");
    }

    #[test]
    fn rejects_duplicate_colors() {
        let err = parse(r#"{"participants": [{"name": "Ann"}], "colors": ["Red", "Red"]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate attribute"), "got: {err}");
    }

    #[test]
    fn rejects_blank_names_and_tokens() {
        let err = parse(r#"{"participants": [{"name": "Ann"}, {"name": " "}], "colors": []}"#)
            .unwrap_err();
        assert!(err.to_string().contains("blank name"), "got: {err}");

        let err = parse(r#"{"participants": [{"name": "Ann"}], "colors": ["Red", ""]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("blank token"), "got: {err}");
    }

    #[test]
    fn encodes_claim_as_approved_flag() {
        let snapshot = RegistrySnapshot {
            participants: vec![Participant {
                name: ParticipantName::from("Ann"),
                claimed_by: Some(ActorId(5)),
                assignment: None,
            }],
            attributes: BTreeSet::new(),
        };
        let value = serde_json::to_value(&snapshot).expect("encode");
        assert_eq!(value["participants"][0]["approved"], serde_json::json!(true));
        assert_eq!(value["participants"][0]["user_id"], serde_json::json!(5));
        assert_eq!(value["participants"][0]["color"], serde_json::Value::Null);
    }
}
