use mobsim_common::{Direction, GCoord};
use serde::{Deserialize, Serialize};

/// A path handed out by the pathfinder and consumed one waypoint at a time.
///
/// `current_position` is the last waypoint the owner reached; the next target is that cell
/// offset by `waypoints[current_index]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathState {
    pub waypoints: Vec<Direction>,
    pub current_index: usize,
    pub current_position: GCoord,
    pub has_path: bool,
}

impl PathState {
    pub fn set(&mut self, start: GCoord, waypoints: Vec<Direction>) {
        self.waypoints = waypoints;
        self.current_index = 0;
        self.current_position = start;
        self.has_path = true;
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.current_index = 0;
        self.has_path = false;
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.has_path || self.current_index >= self.waypoints.len()
    }

    pub fn next_step(&self) -> Option<Direction> {
        if !self.has_path {
            return None;
        }
        self.waypoints.get(self.current_index).copied()
    }

    pub fn next_target(&self) -> Option<GCoord> {
        self.next_step()
            .map(|d| self.current_position.offset(d.offset()))
    }

    /// Mark the next waypoint as reached and return it.
    pub fn advance(&mut self) -> Option<GCoord> {
        let target = self.next_target()?;
        self.current_position = target;
        self.current_index += 1;
        Some(target)
    }

    pub fn remaining(&self) -> &[Direction] {
        self.waypoints.get(self.current_index..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    fn dir(x: i32, y: i32, z: i32) -> Direction {
        Direction::from_offset(IVec3::new(x, y, z)).unwrap()
    }

    #[test]
    fn advances_through_waypoints() {
        let mut path = PathState::default();
        path.set(GCoord::new(0, 0, 0), vec![dir(1, 0, 0), dir(1, 0, 1), dir(0, 1, 0)]);
        assert_eq!(path.next_target(), Some(GCoord::new(1, 0, 0)));
        assert_eq!(path.advance(), Some(GCoord::new(1, 0, 0)));
        assert_eq!(path.advance(), Some(GCoord::new(2, 0, 1)));
        assert_eq!(path.remaining(), &[dir(0, 1, 0)]);
        assert_eq!(path.advance(), Some(GCoord::new(2, 1, 1)));
        assert!(path.is_complete());
        assert_eq!(path.advance(), None);
        assert!(path.remaining().is_empty());
    }

    #[test]
    fn cleared_path_is_complete() {
        let mut path = PathState::default();
        assert!(path.is_complete());
        path.set(GCoord::new(3, 0, 3), vec![dir(0, 0, 1)]);
        assert!(!path.is_complete());
        path.clear();
        assert!(path.is_complete());
        assert_eq!(path.next_step(), None);
    }
}
