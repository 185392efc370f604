use std::collections::{HashMap, VecDeque};

use glam::IVec3;
use mobsim_common::{Direction, GCoord, Pathfinder, Profile, TerrainSampler};

/// Breadth-first search over the 26-neighborhood of grid cells.
///
/// Steps are validated with [`Profile::is_step_valid`]. When the goal is not reached within
/// the expansion budget, the path leads to the explored cell closest to the goal instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridPathfinder;

impl GridPathfinder {
    pub fn new() -> Self {
        Self
    }
}

fn distance_sq(a: GCoord, b: GCoord) -> i64 {
    let d = a.as_ivec3() - b.as_ivec3();
    let (x, y, z) = (d.x as i64, d.y as i64, d.z as i64);
    x * x + y * y + z * z
}

impl Pathfinder for GridPathfinder {
    fn find_path(
        &self,
        terrain: &dyn TerrainSampler,
        from: GCoord,
        delta: IVec3,
        max_steps: usize,
        profile: &Profile,
    ) -> Vec<Direction> {
        if delta == IVec3::ZERO {
            return Vec::new();
        }
        let goal = from.offset(delta);
        let mut came_from: HashMap<GCoord, (GCoord, Direction)> = HashMap::new();
        let mut frontier = VecDeque::from([from]);
        let mut best = (distance_sq(from, goal), from);
        let mut expanded = 0usize;

        while let Some(cell) = frontier.pop_front() {
            if cell == goal {
                best = (0, cell);
                break;
            }
            if expanded >= max_steps {
                break;
            }
            expanded += 1;
            for dir in Direction::neighbors() {
                let next = cell.offset(dir.offset());
                if next == from || came_from.contains_key(&next) {
                    continue;
                }
                if !profile.is_step_valid(terrain, cell, dir) {
                    continue;
                }
                came_from.insert(next, (cell, dir));
                let d = distance_sq(next, goal);
                if d < best.0 {
                    best = (d, next);
                }
                frontier.push_back(next);
            }
        }

        let mut steps = Vec::new();
        let mut cursor = best.1;
        while cursor != from {
            let Some(&(prev, dir)) = came_from.get(&cursor) else {
                break;
            };
            steps.push(dir);
            cursor = prev;
        }
        steps.reverse();
        tracing::trace!(%from, %goal, expanded, len = steps.len(), "path search");
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoxelTerrain;

    fn walk(from: GCoord, steps: &[Direction]) -> GCoord {
        steps.iter().fold(from, |c, d| c.offset(d.offset()))
    }

    #[test]
    fn straight_line_on_flat_ground() {
        let terrain = VoxelTerrain::flat(0);
        let from = GCoord::new(0, 0, 0);
        let path = GridPathfinder.find_path(
            &terrain,
            from,
            IVec3::new(4, 0, 0),
            512,
            &Profile::default(),
        );
        assert_eq!(path.len(), 4);
        assert_eq!(walk(from, &path), GCoord::new(4, 0, 0));
    }

    #[test]
    fn routes_around_a_wall() {
        let mut terrain = VoxelTerrain::flat(0);
        for z in -2..=2 {
            terrain.pillar(2, z, 3);
        }
        let from = GCoord::new(0, 0, 0);
        let profile = Profile::default();
        let path = GridPathfinder.find_path(&terrain, from, IVec3::new(4, 0, 0), 4096, &profile);
        assert_eq!(walk(from, &path), GCoord::new(4, 0, 0));
        let mut cell = from;
        for d in &path {
            assert!(profile.is_step_valid(&terrain, cell, *d));
            cell = cell.offset(d.offset());
        }
    }

    #[test]
    fn budget_exhaustion_returns_closest_prefix() {
        let terrain = VoxelTerrain::flat(0);
        let from = GCoord::new(0, 0, 0);
        let path = GridPathfinder.find_path(
            &terrain,
            from,
            IVec3::new(40, 0, 0),
            3,
            &Profile::default(),
        );
        assert!(!path.is_empty());
        let end = walk(from, &path);
        assert!(distance_sq(end, GCoord::new(40, 0, 0)) < distance_sq(from, GCoord::new(40, 0, 0)));
    }

    #[test]
    fn enclosed_start_yields_empty_path() {
        let mut terrain = VoxelTerrain::flat(0);
        for dx in -1..=1 {
            for dz in -1..=1 {
                if dx != 0 || dz != 0 {
                    terrain.pillar(dx, dz, 4);
                }
            }
        }
        terrain.set_solid(GCoord::new(0, 2, 0));
        let path = GridPathfinder.find_path(
            &terrain,
            GCoord::new(0, 0, 0),
            IVec3::new(5, 0, 0),
            256,
            &Profile::default(),
        );
        assert!(path.is_empty());
    }

    #[test]
    fn zero_delta_is_empty() {
        let terrain = VoxelTerrain::flat(0);
        let path = GridPathfinder.find_path(
            &terrain,
            GCoord::new(0, 0, 0),
            IVec3::ZERO,
            16,
            &Profile::default(),
        );
        assert!(path.is_empty());
    }
}
