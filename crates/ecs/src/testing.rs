//! Shared fixtures for unit tests.

use mobsim_kernel::{SimConfig, TickContext};
use mobsim_stream::{GridIndex, GridPathfinder, VoxelTerrain};

pub(crate) struct Fixture {
    terrain: VoxelTerrain,
    index: GridIndex,
    pathfinder: GridPathfinder,
}

impl Fixture {
    pub(crate) fn flat() -> Self {
        Self::with_terrain(VoxelTerrain::flat(0))
    }

    pub(crate) fn pond() -> Self {
        Self::with_terrain(VoxelTerrain::flat(0).with_liquid(3))
    }

    pub(crate) fn with_terrain(terrain: VoxelTerrain) -> Self {
        Self {
            terrain,
            index: GridIndex::new(4.0).unwrap(),
            pathfinder: GridPathfinder,
        }
    }

    pub(crate) fn terrain_mut(&mut self) -> &mut VoxelTerrain {
        &mut self.terrain
    }

    pub(crate) fn ctx(&self, delta_time: f32) -> TickContext<'_> {
        TickContext {
            tick: 0,
            seed: 0,
            delta_time,
            gravity: SimConfig::default().gravity,
            terrain: &self.terrain,
            spatial: &self.index,
            pathfinder: &self.pathfinder,
        }
    }
}
