use glam::{IVec3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

slotmap::new_key_type! {
    /// Process-local reference to a live entity slot. Never persisted.
    pub struct Handle;

    /// Registration key handed out by a spatial index.
    pub struct SpatialId;
}

/// Persistent identifier for an entity, stable across save/load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Fold the id into 64 bits, used to salt per-entity random streams.
    pub fn salt(&self) -> u64 {
        let (hi, lo) = self.0.as_u64_pair();
        hi ^ lo.rotate_left(17)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Discrete grid coordinate of a voxel cell.
///
/// Cell `(x, y, z)` spans `[x, x + 1)` on each axis; its center is at `+0.5`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell containing a world position.
    pub fn from_position(p: Vec3) -> Self {
        let f = p.floor();
        Self::new(f.x as i32, f.y as i32, f.z as i32)
    }

    /// Cell center at floor level, where a walking entity stands.
    pub fn foot(&self) -> Vec3 {
        Vec3::new(self.x as f32 + 0.5, self.y as f32, self.z as f32 + 0.5)
    }

    pub fn center(&self) -> Vec3 {
        self.as_ivec3().as_vec3() + Vec3::splat(0.5)
    }

    pub fn as_ivec3(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    pub fn offset(&self, d: IVec3) -> Self {
        Self::new(self.x + d.x, self.y + d.y, self.z + d.z)
    }

    /// Chebyshev distance in cells.
    pub fn chebyshev(&self, other: GCoord) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl From<IVec3> for GCoord {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl std::fmt::Display for GCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Box standing on `foot`, `half_extents.y` is half the height.
    pub fn standing(foot: Vec3, half_extents: Vec3) -> Self {
        Self::new(
            foot - Vec3::new(half_extents.x, 0.0, half_extents.z),
            foot + Vec3::new(half_extents.x, half_extents.y * 2.0, half_extents.z),
        )
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn expand(&self, margin: f32) -> Self {
        Self::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Slab test for the segment `start → end`. Returns the entry parameter in `[0, 1]`.
    pub fn segment_hit(&self, start: Vec3, end: Vec3) -> Option<f32> {
        let dir = end - start;
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;
        for axis in 0..3 {
            let (s, d, lo, hi) = (start[axis], dir[axis], self.min[axis], self.max[axis]);
            if d.abs() < f32::EPSILON {
                if s < lo || s > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (lo - s) * inv;
            let mut t1 = (hi - s) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_ne!(a.salt(), b.salt());
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn gcoord_floors_negative_positions() {
        assert_eq!(GCoord::from_position(Vec3::new(0.9, 1.0, -0.1)), GCoord::new(0, 1, -1));
        assert_eq!(GCoord::new(2, 0, 3).foot(), Vec3::new(2.5, 0.0, 3.5));
    }

    #[test]
    fn aabb_intersection() {
        let a = Aabb::from_center(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_center(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE);
        let c = Aabb::from_center(Vec3::new(5.0, 0.0, 0.0), Vec3::ONE);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn segment_hit_reports_entry() {
        let b = Aabb::from_center(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(0.5));
        let t = b
            .segment_hit(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0))
            .unwrap();
        assert!((t - 0.45).abs() < 1e-5);
        assert!(b.segment_hit(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0)).is_none());
        assert!(b.segment_hit(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)).is_none());
    }
}
