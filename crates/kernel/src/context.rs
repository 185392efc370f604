use mobsim_common::{Pathfinder, SpatialIndex, TerrainSampler};
use serde::{Deserialize, Serialize};

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds simulated per tick.
    pub delta_time: f32,
    /// Downward acceleration in blocks per second squared.
    pub gravity: f32,
    /// Maximum number of live entities.
    pub arena_capacity: usize,
    /// Initial world seed.
    pub seed: u64,
    /// Fan the running phase out across the rayon pool.
    pub parallel: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            delta_time: 0.05,
            gravity: 9.81,
            arena_capacity: 4096,
            seed: 0,
            parallel: true,
        }
    }
}

/// Read-only state shared by every update of one tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub tick: u64,
    pub seed: u64,
    pub delta_time: f32,
    pub gravity: f32,
    pub terrain: &'a dyn TerrainSampler,
    pub spatial: &'a dyn SpatialIndex,
    pub pathfinder: &'a dyn Pathfinder,
}

impl std::fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickContext")
            .field("tick", &self.tick)
            .field("seed", &self.seed)
            .field("delta_time", &self.delta_time)
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}
