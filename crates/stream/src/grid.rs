use std::collections::{BTreeSet, HashMap, HashSet};

use glam::Vec3;
use mobsim_common::{Aabb, Handle, SpatialId, SpatialIndex};
use slotmap::SlotMap;

/// Errors from spatial index construction.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// A 3D cell coordinate in the index grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: Handle,
    bounds: Aabb,
    lo: CellCoord,
    hi: CellCoord,
}

/// Fixed-size grid bucketing of entity bounds.
///
/// An entry is registered in every cell its bounds overlap. Queries gather candidates from
/// the overlapped cells, deduplicate them in id order and test exact bounds.
pub struct GridIndex {
    cell_size: f32,
    entries: SlotMap<SpatialId, Entry>,
    cells: HashMap<CellCoord, HashSet<SpatialId>>,
}

impl GridIndex {
    /// Create a new index with the given cell edge length.
    pub fn new(cell_size: f32) -> Result<Self, IndexError> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(IndexError::InvalidConfig("cell_size must be positive"));
        }
        Ok(Self {
            cell_size,
            entries: SlotMap::with_key(),
            cells: HashMap::new(),
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Convert a world position to a cell coordinate.
    pub fn position_to_cell(&self, pos: Vec3) -> CellCoord {
        let c = (pos / self.cell_size).floor();
        CellCoord::new(c.x as i32, c.y as i32, c.z as i32)
    }

    /// Handles registered in a specific cell.
    pub fn handles_in_cell(&self, coord: CellCoord) -> Vec<Handle> {
        self.cells
            .get(&coord)
            .map(|ids| {
                let ordered: BTreeSet<_> = ids.iter().copied().collect();
                ordered
                    .into_iter()
                    .filter_map(|id| self.entries.get(id).map(|e| e.handle))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total number of entry placements across all cells.
    pub fn total_placements(&self) -> usize {
        self.cells.values().map(|s| s.len()).sum()
    }

    fn cell_range(&self, bounds: &Aabb) -> (CellCoord, CellCoord) {
        (
            self.position_to_cell(bounds.min),
            self.position_to_cell(bounds.max),
        )
    }

    fn place(&mut self, id: SpatialId, lo: CellCoord, hi: CellCoord) {
        for_each_cell(lo, hi, |c| {
            self.cells.entry(c).or_default().insert(id);
        });
    }

    fn unplace(&mut self, id: SpatialId, lo: CellCoord, hi: CellCoord) {
        for_each_cell(lo, hi, |c| {
            if let Some(set) = self.cells.get_mut(&c) {
                set.remove(&id);
                if set.is_empty() {
                    self.cells.remove(&c);
                }
            }
        });
    }

    /// Candidate ids from every cell overlapped by `bounds`, in id order.
    fn candidates(&self, bounds: &Aabb) -> BTreeSet<SpatialId> {
        let (lo, hi) = self.cell_range(bounds);
        let mut out = BTreeSet::new();
        for_each_cell(lo, hi, |c| {
            if let Some(set) = self.cells.get(&c) {
                out.extend(set.iter().copied());
            }
        });
        out
    }
}

fn for_each_cell(lo: CellCoord, hi: CellCoord, mut f: impl FnMut(CellCoord)) {
    for x in lo.x..=hi.x {
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                f(CellCoord::new(x, y, z));
            }
        }
    }
}

impl SpatialIndex for GridIndex {
    fn query_range(&self, bounds: &Aabb, visitor: &mut dyn FnMut(Handle, &Aabb)) {
        for id in self.candidates(bounds) {
            if let Some(entry) = self.entries.get(id) {
                if entry.bounds.intersects(bounds) {
                    visitor(entry.handle, &entry.bounds);
                }
            }
        }
    }

    fn nearest_along_ray(&self, start: Vec3, end: Vec3, exclude: &[Handle]) -> Option<Handle> {
        let mut best: Option<(f32, Handle)> = None;
        for id in self.candidates(&Aabb::new(start, end)) {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            if exclude.contains(&entry.handle) {
                continue;
            }
            if let Some(t) = entry.bounds.segment_hit(start, end) {
                if best.is_none_or(|(bt, _)| t < bt) {
                    best = Some((t, entry.handle));
                }
            }
        }
        best.map(|(_, h)| h)
    }

    fn insert(&mut self, handle: Handle, bounds: Aabb) -> SpatialId {
        let (lo, hi) = self.cell_range(&bounds);
        let id = self.entries.insert(Entry {
            handle,
            bounds,
            lo,
            hi,
        });
        self.place(id, lo, hi);
        id
    }

    fn remove(&mut self, id: SpatialId) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                self.unplace(id, entry.lo, entry.hi);
                true
            }
            None => false,
        }
    }

    fn relocate(&mut self, id: SpatialId, bounds: Aabb) {
        let (lo, hi) = self.cell_range(&bounds);
        let Some(entry) = self.entries.get_mut(id) else {
            tracing::warn!(?id, "relocate of unregistered spatial id");
            return;
        };
        entry.bounds = bounds;
        let (old_lo, old_hi) = (entry.lo, entry.hi);
        if (old_lo, old_hi) == (lo, hi) {
            return;
        }
        entry.lo = lo;
        entry.hi = hi;
        self.unplace(id, old_lo, old_hi);
        self.place(id, lo, hi);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn handles(n: usize) -> Vec<Handle> {
        let mut map: SlotMap<Handle, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::from_center(center, Vec3::splat(half))
    }

    fn collect(index: &GridIndex, bounds: Aabb) -> Vec<Handle> {
        let mut out = Vec::new();
        index.query_range(&bounds, &mut |h, _| out.push(h));
        out
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        assert!(GridIndex::new(0.0).is_err());
        assert!(GridIndex::new(-1.0).is_err());
        assert!(GridIndex::new(f32::NAN).is_err());
    }

    #[test]
    fn position_to_cell_basic() {
        let grid = GridIndex::new(16.0).unwrap();
        assert_eq!(
            grid.position_to_cell(Vec3::new(10.0, 3.0, 10.0)),
            CellCoord::new(0, 0, 0)
        );
        assert_eq!(
            grid.position_to_cell(Vec3::new(20.0, -1.0, -5.0)),
            CellCoord::new(1, -1, -1)
        );
    }

    #[test]
    fn straddling_bounds_occupy_every_overlapped_cell() {
        let h = handles(1);
        let mut grid = GridIndex::new(4.0).unwrap();
        grid.insert(h[0], cube(Vec3::new(4.0, 2.0, 2.0), 0.5));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.cell_count(), 2);
        assert_eq!(grid.total_placements(), 2);
        assert_eq!(grid.handles_in_cell(CellCoord::new(0, 0, 0)), vec![h[0]]);
        assert_eq!(grid.handles_in_cell(CellCoord::new(1, 0, 0)), vec![h[0]]);
    }

    #[test]
    fn query_reports_each_overlap_once() {
        let h = handles(3);
        let mut grid = GridIndex::new(4.0).unwrap();
        grid.insert(h[0], cube(Vec3::new(4.0, 2.0, 2.0), 0.5));
        grid.insert(h[1], cube(Vec3::new(1.0, 1.0, 1.0), 0.5));
        grid.insert(h[2], cube(Vec3::new(30.0, 1.0, 1.0), 0.5));

        let found = collect(&grid, Aabb::new(Vec3::ZERO, Vec3::splat(8.0)));
        assert_eq!(found, vec![h[0], h[1]]);
        assert!(collect(&grid, cube(Vec3::new(-20.0, 0.0, 0.0), 1.0)).is_empty());
    }

    #[test]
    fn relocate_moves_between_cells() {
        let h = handles(1);
        let mut grid = GridIndex::new(4.0).unwrap();
        let id = grid.insert(h[0], cube(Vec3::new(1.0, 1.0, 1.0), 0.25));
        grid.relocate(id, cube(Vec3::new(13.0, 1.0, 1.0), 0.25));

        assert!(grid.handles_in_cell(CellCoord::new(0, 0, 0)).is_empty());
        assert_eq!(grid.handles_in_cell(CellCoord::new(3, 0, 0)), vec![h[0]]);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn remove_clears_cells_and_is_idempotent() {
        let h = handles(1);
        let mut grid = GridIndex::new(4.0).unwrap();
        let id = grid.insert(h[0], cube(Vec3::new(4.0, 4.0, 4.0), 0.5));
        assert!(grid.remove(id));
        assert!(!grid.remove(id));
        assert!(grid.is_empty());
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn ray_picks_nearest_unexcluded_hit() {
        let h = handles(3);
        let mut grid = GridIndex::new(4.0).unwrap();
        grid.insert(h[0], cube(Vec3::new(0.0, 1.0, 0.0), 0.5));
        grid.insert(h[1], cube(Vec3::new(3.0, 1.0, 0.0), 0.5));
        grid.insert(h[2], cube(Vec3::new(6.0, 1.0, 0.0), 0.5));

        let start = Vec3::new(0.0, 1.0, 0.0);
        let end = Vec3::new(10.0, 1.0, 0.0);
        assert_eq!(grid.nearest_along_ray(start, end, &[h[0]]), Some(h[1]));
        assert_eq!(grid.nearest_along_ray(start, end, &[h[0], h[1]]), Some(h[2]));
        assert_eq!(
            grid.nearest_along_ray(Vec3::new(0.0, 5.0, 0.0), Vec3::new(10.0, 5.0, 0.0), &[]),
            None
        );
    }
}
