use std::fmt;

use mobsim_kernel::{DispatchTable, TypeTag};
use serde::{Deserialize, Serialize};

use crate::payload::Payload;
use crate::{creature, item, projectile, vehicle};

/// The closed set of entity kinds. The tag is what gets persisted; dispatch is rebound
/// from it on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Creature,
    Item,
    Projectile,
    Vehicle,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Creature,
        EntityKind::Item,
        EntityKind::Projectile,
        EntityKind::Vehicle,
    ];

    pub const fn type_tag(self) -> TypeTag {
        TypeTag(match self {
            EntityKind::Creature => 1,
            EntityKind::Item => 2,
            EntityKind::Projectile => 3,
            EntityKind::Vehicle => 4,
        })
    }

    pub fn from_tag(tag: TypeTag) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_tag() == tag)
    }

    /// Behavior table for this kind. The same kind always yields the same table.
    pub const fn bind(self) -> DispatchTable<Payload> {
        match self {
            EntityKind::Creature => creature::DISPATCH,
            EntityKind::Item => item::DISPATCH,
            EntityKind::Projectile => projectile::DISPATCH,
            EntityKind::Vehicle => vehicle::DISPATCH,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            EntityKind::Creature => "creature",
            EntityKind::Item => "item",
            EntityKind::Projectile => "projectile",
            EntityKind::Vehicle => "vehicle",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
