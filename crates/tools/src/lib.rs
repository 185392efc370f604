//! Developer tooling: a read-only world inspector.
//!
//! # Invariants
//! - Tools never mutate the world; everything goes through `&World` and render views.

pub mod inspector;

pub use inspector::{EntityInfo, Inspector, WorldSummary};
