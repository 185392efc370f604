use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::{Aabb, Direction, GCoord, TerrainSampler};

/// Static collision bounds and movement limits for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Half extents of the collision box; the box stands on the entity's foot point.
    pub half_extents: Vec3,
    /// Maximum distance an entity may stray from its last reached waypoint.
    pub max_drift: f32,
    /// Whether a cell needs solid support (or liquid to swim in) to be occupied.
    pub requires_ground: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            half_extents: Vec3::new(0.3, 0.45, 0.3),
            max_drift: 2.0,
            requires_ground: true,
        }
    }
}

impl Profile {
    pub fn bounds_at(&self, foot: Vec3) -> Aabb {
        Aabb::standing(foot, self.half_extents)
    }

    /// Number of cells the profile occupies vertically.
    pub fn height_cells(&self) -> i32 {
        ((self.half_extents.y * 2.0).ceil() as i32).max(1)
    }

    /// Whether an entity with this profile may occupy `cell`.
    pub fn is_valid(&self, terrain: &dyn TerrainSampler, cell: GCoord) -> bool {
        for dy in 0..self.height_cells() {
            if terrain.classify(cell.offset(IVec3::Y * dy).center()).is_solid() {
                return false;
            }
        }
        if !self.requires_ground {
            return true;
        }
        let below = terrain.classify(cell.offset(IVec3::NEG_Y).center());
        below.is_solid() || terrain.classify(cell.center()).is_liquid()
    }

    /// Whether the single step `from → from + dir` is legal.
    ///
    /// Diagonal steps must not cut through solid corners, and climbing needs headroom
    /// above the starting cell.
    pub fn is_step_valid(&self, terrain: &dyn TerrainSampler, from: GCoord, dir: Direction) -> bool {
        let d = dir.offset();
        if d == IVec3::ZERO {
            return false;
        }
        let to = from.offset(d);
        if !self.is_valid(terrain, to) {
            return false;
        }
        if d.x != 0 && d.z != 0 {
            let foot_y = from.y.max(to.y);
            for side in [IVec3::new(d.x, 0, 0), IVec3::new(0, 0, d.z)] {
                let side_cell = GCoord::new(from.x + side.x, foot_y, from.z + side.z);
                if terrain.classify(side_cell.center()).is_solid() {
                    return false;
                }
            }
        }
        if d.y > 0 {
            let head = from.offset(IVec3::Y * self.height_cells());
            if terrain.classify(head.center()).is_solid() {
                return false;
            }
        }
        true
    }
}
