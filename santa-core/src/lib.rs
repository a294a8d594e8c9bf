//! Santa core library — domain types, in-memory registry, snapshot store.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`RegistryError`], [`SnapshotError`], [`StoreError`]
//! - [`registry`] — participant table + attribute pool
//! - [`snapshot`] — persisted registry layout
//! - [`store`] — snapshot file load / save
//! - [`seed`] — roster + attribute seed configuration
//! - [`gateway`] — [`PersistenceGateway`] and its file / memory implementations

pub mod error;
pub mod gateway;
pub mod registry;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{RegistryError, SnapshotError, StoreError};
pub use gateway::{FileGateway, MemoryGateway, PersistenceGateway};
pub use registry::Registry;
pub use seed::SeedConfig;
pub use snapshot::RegistrySnapshot;
pub use types::{ActorId, Assignment, AttributeToken, Participant, ParticipantName};
