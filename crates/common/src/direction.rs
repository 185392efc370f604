use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Compact waypoint step: one of the 26 neighbor offsets, or none.
///
/// Encoded as `(dx + 1) * 9 + (dy + 1) * 3 + (dz + 1)`, so code 13 is the zero offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Direction(u8);

impl Direction {
    pub const NONE: Self = Self(13);

    /// Every non-zero neighbor direction, in code order.
    pub fn neighbors() -> impl Iterator<Item = Direction> {
        (0u8..27).filter(|c| *c != 13).map(Direction)
    }

    /// Direction for a unit neighbor offset. Components must be in `-1..=1`.
    pub fn from_offset(d: IVec3) -> Option<Self> {
        if d.abs().max_element() > 1 {
            return None;
        }
        Some(Self(((d.x + 1) * 9 + (d.y + 1) * 3 + (d.z + 1)) as u8))
    }

    pub fn offset(self) -> IVec3 {
        let c = self.0 as i32;
        IVec3::new(c / 9 - 1, (c / 3) % 3 - 1, c % 3 - 1)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        if code < 27 {
            Ok(Self(code))
        } else {
            Err(format!("direction code {code} out of range"))
        }
    }
}

impl From<Direction> for u8 {
    fn from(d: Direction) -> u8 {
        d.0
    }
}
