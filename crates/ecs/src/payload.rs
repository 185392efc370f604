use mobsim_common::{Aabb, Handle};
use mobsim_kernel::{RenderState, Simulated, Status};

use crate::creature::Creature;
use crate::item::DroppedItem;
use crate::kind::EntityKind;
use crate::projectile::Projectile;
use crate::vehicle::Vehicle;

/// Arena payload: one variant per entity kind.
#[derive(Debug, Clone)]
pub enum Payload {
    Creature(Creature),
    Item(DroppedItem),
    Projectile(Projectile),
    Vehicle(Vehicle),
}

impl Payload {
    pub fn kind(&self) -> EntityKind {
        match self {
            Payload::Creature(_) => EntityKind::Creature,
            Payload::Item(_) => EntityKind::Item,
            Payload::Projectile(_) => EntityKind::Projectile,
            Payload::Vehicle(_) => EntityKind::Vehicle,
        }
    }

    pub fn as_creature(&self) -> Option<&Creature> {
        match self {
            Payload::Creature(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_creature_mut(&mut self) -> Option<&mut Creature> {
        match self {
            Payload::Creature(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&DroppedItem> {
        match self {
            Payload::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut DroppedItem> {
        match self {
            Payload::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_projectile_mut(&mut self) -> Option<&mut Projectile> {
        match self {
            Payload::Projectile(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_vehicle(&self) -> Option<&Vehicle> {
        match self {
            Payload::Vehicle(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vehicle_mut(&mut self) -> Option<&mut Vehicle> {
        match self {
            Payload::Vehicle(v) => Some(v),
            _ => None,
        }
    }
}

impl Simulated for Payload {
    fn bounds(&self) -> Aabb {
        match self {
            Payload::Creature(c) => c.settings.profile.bounds_at(c.body.position),
            Payload::Item(i) => i.settings.profile.bounds_at(i.body.position),
            Payload::Projectile(p) => p.bounds(),
            Payload::Vehicle(v) => v.settings.profile.bounds_at(v.body.position),
        }
    }

    fn render_state(&self) -> RenderState {
        match self {
            Payload::Creature(c) => c.render_state(),
            Payload::Item(i) => i.render_state(),
            Payload::Projectile(p) => p.render_state(),
            Payload::Vehicle(v) => v.render_state(),
        }
    }
}

/// A dispatch table was bound to the wrong payload variant. The entity is retired.
pub(crate) fn mismatched(handle: Handle, expected: &'static str, found: &Payload) -> Status {
    tracing::error!(
        ?handle,
        expected,
        found = found.kind().name(),
        "dispatch bound to a payload of another kind"
    );
    Status::Expired
}
