//! Persistence: per-entity save/load with dispatch rebinding, whole-world snapshots and a
//! file-backed snapshot store.
//!
//! # Invariants
//! - Only the type tag is persisted; dispatch is re-resolved from it on load.
//! - Handles never reach disk. Loaded entities get fresh handles and the caller learns the
//!   cell to re-register them at.
//! - Snapshots are content-hashed and the store's manifest is a hash chain.

pub mod adapter;
mod codec;
pub mod error;
pub mod snapshot;
pub mod store;

pub use adapter::{SavedEntity, SavedState, deserialize, initialize, load, save, serialize_entity};
pub use error::PersistError;
pub use snapshot::WorldSnapshot;
pub use store::{StoreError, WorldMeta, WorldStore};
