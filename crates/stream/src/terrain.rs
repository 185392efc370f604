use std::collections::HashSet;

use glam::{IVec3, Vec3};
use mobsim_common::{Direction, GCoord, Material, TerrainSampler};

/// Voxel terrain built from a flat ground plane plus explicit edits.
///
/// Cells below `ground_level` are solid unless carved out. Open cells below `liquid_level`
/// hold liquid. Everything else is air.
#[derive(Debug, Clone, Default)]
pub struct VoxelTerrain {
    ground_level: i32,
    liquid_level: Option<i32>,
    solids: HashSet<GCoord>,
    carved: HashSet<GCoord>,
}

impl VoxelTerrain {
    /// Solid ground for every cell with `y < ground_level`.
    pub fn flat(ground_level: i32) -> Self {
        Self {
            ground_level,
            ..Self::default()
        }
    }

    /// Fill open cells below `level` with liquid.
    pub fn with_liquid(mut self, level: i32) -> Self {
        self.liquid_level = Some(level);
        self
    }

    pub fn ground_level(&self) -> i32 {
        self.ground_level
    }

    pub fn set_solid(&mut self, cell: GCoord) {
        self.carved.remove(&cell);
        self.solids.insert(cell);
    }

    /// Remove a solid cell, leaving air or liquid behind.
    pub fn carve(&mut self, cell: GCoord) {
        self.solids.remove(&cell);
        if cell.y < self.ground_level {
            self.carved.insert(cell);
        }
    }

    /// Stack `height` solid cells on top of the ground at `(x, z)`.
    pub fn pillar(&mut self, x: i32, z: i32, height: i32) {
        for y in self.ground_level..self.ground_level + height {
            self.set_solid(GCoord::new(x, y, z));
        }
    }

    pub fn is_solid_cell(&self, cell: GCoord) -> bool {
        if self.solids.contains(&cell) {
            return true;
        }
        cell.y < self.ground_level && !self.carved.contains(&cell)
    }

    pub fn cell_material(&self, cell: GCoord) -> Material {
        if self.is_solid_cell(cell) {
            Material::Solid(1.0)
        } else if self.liquid_level.is_some_and(|level| cell.y < level) {
            Material::Liquid(1.0)
        } else {
            Material::Gas(0.0)
        }
    }
}

impl TerrainSampler for VoxelTerrain {
    fn classify(&self, position: Vec3) -> Material {
        self.cell_material(GCoord::from_position(position))
    }

    fn ground_normal_near(&self, position: Vec3, reach: f32) -> Option<Vec3> {
        let support = GCoord::from_position(position - Vec3::Y * reach.max(0.0));
        if !self.is_solid_cell(support) {
            return None;
        }
        // Point the normal toward the open neighbors of the supporting cell.
        let open: IVec3 = Direction::neighbors()
            .map(|d| d.offset())
            .filter(|o| !self.is_solid_cell(support.offset(*o)))
            .sum();
        let normal = open.as_vec3().normalize_or_zero();
        if normal == Vec3::ZERO {
            Some(Vec3::Y)
        } else {
            Some(normal)
        }
    }
}
