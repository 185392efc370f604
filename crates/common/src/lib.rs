//! Shared vocabulary for the mob simulation runtime: identities, grid coordinates,
//! bounds, waypoint directions, movement profiles and collaborator contracts.

mod direction;
mod env;
mod profile;
mod types;

pub use direction::Direction;
pub use env::{Material, Pathfinder, SpatialIndex, TerrainSampler};
pub use profile::Profile;
pub use types::{Aabb, EntityId, GCoord, Handle, SpatialId, Transform};
