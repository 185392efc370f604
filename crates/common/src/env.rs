//! Contracts for the collaborators the simulation consumes but does not own:
//! terrain sampling, spatial indexing and path search.

use glam::{IVec3, Vec3};

use crate::{Aabb, Direction, GCoord, Handle, Profile, SpatialId};

/// Classification of a point in the world, with the sampled density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Solid(f32),
    Liquid(f32),
    Gas(f32),
}

impl Material {
    pub fn is_solid(&self) -> bool {
        matches!(self, Material::Solid(_))
    }

    pub fn is_liquid(&self) -> bool {
        matches!(self, Material::Liquid(_))
    }

    pub fn density(&self) -> f32 {
        match *self {
            Material::Solid(d) | Material::Liquid(d) | Material::Gas(d) => d,
        }
    }
}

/// Terrain density and collision sampler.
pub trait TerrainSampler: Send + Sync {
    fn classify(&self, position: Vec3) -> Material;

    /// Surface normal of solid ground within `reach` below `position`, if any.
    fn ground_normal_near(&self, position: Vec3, reach: f32) -> Option<Vec3>;
}

/// Spatial index over entity bounds.
///
/// Queries may run concurrently from many entity updates. Mutation happens only while the
/// scheduler drains deferred work.
pub trait SpatialIndex: Send + Sync {
    /// Visit every registered entity whose bounds intersect `bounds`, in a stable order.
    fn query_range(&self, bounds: &Aabb, visitor: &mut dyn FnMut(Handle, &Aabb));

    /// First entity hit by the segment `start → end`, skipping `exclude`.
    fn nearest_along_ray(&self, start: Vec3, end: Vec3, exclude: &[Handle]) -> Option<Handle>;

    fn insert(&mut self, handle: Handle, bounds: Aabb) -> SpatialId;

    fn remove(&mut self, id: SpatialId) -> bool;

    fn relocate(&mut self, id: SpatialId, bounds: Aabb);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grid path search.
pub trait Pathfinder: Send + Sync {
    /// Search from `from` toward `from + delta`, expanding at most `max_steps` cells.
    /// Returns the waypoint steps; an empty path means nothing reachable.
    fn find_path(
        &self,
        terrain: &dyn TerrainSampler,
        from: GCoord,
        delta: IVec3,
        max_steps: usize,
        profile: &Profile,
    ) -> Vec<Direction>;
}
