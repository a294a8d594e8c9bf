//! # santa-exchange
//!
//! Claim workflow and allocation engine over a shared registry.
//!
//! Build an [`Exchange`] once (usually via [`Exchange::open`]) and share it
//! behind an `Arc`; every method takes `&self` and serializes internally.

pub mod allocation;
pub mod error;
pub mod selector;
pub mod workflow;

pub use allocation::Allocation;
pub use error::{ExchangeError, PersistenceWarning};
pub use selector::{RandomSelector, ScriptedSelector, Selector};
pub use workflow::{
    AssignmentView, Cancelled, ClaimState, Confirmed, Exchange, Proposal, ProposeOutcome,
};
