//! Streaming and world partition: the collaborators entity updates sample.
//!
//! # Invariants
//! - Queries never mutate; registration changes only while the scheduler drains.
//! - Query and search results are ordered deterministically.
//!
//! Provides a fixed-size 3D grid spatial index, a voxel terrain sampler with a ground
//! plane, carved pits and liquid fill, and a bounded breadth-first pathfinder.

mod grid;
mod path;
mod terrain;

pub use grid::{CellCoord, GridIndex, IndexError};
pub use path::GridPathfinder;
pub use terrain::VoxelTerrain;
