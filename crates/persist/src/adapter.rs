//! Per-entity save/load.
//!
//! A saved blob carries the persistent id, the type tag and the kind's saved state. Loading
//! re-resolves the dispatch table from the tag, reattaches the current settings, clamps
//! timers against them, and hands back the cell the entity now occupies.

use std::sync::Arc;

use mobsim_common::{EntityId, GCoord, Handle};
use mobsim_ecs::creature::SavedCreature;
use mobsim_ecs::item::SavedItem;
use mobsim_ecs::projectile::SavedProjectile;
use mobsim_ecs::vehicle::SavedVehicle;
use mobsim_ecs::{
    Creature, DroppedItem, EntityKind, EntityWorld, Payload, Projectile, Settings, Vehicle,
    entity_rng,
};
use mobsim_kernel::TypeTag;
use serde::{Deserialize, Serialize};

use crate::codec::{cbor_deserialize, cbor_serialize};
use crate::error::PersistError;

/// One entity as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEntity {
    pub uid: EntityId,
    pub type_tag: TypeTag,
    pub coord: GCoord,
    pub state: SavedState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SavedState {
    Creature(SavedCreature),
    Item(SavedItem),
    Projectile(SavedProjectile),
    Vehicle(SavedVehicle),
}

impl SavedState {
    fn of(payload: &Payload) -> Self {
        match payload {
            Payload::Creature(c) => SavedState::Creature(c.to_saved()),
            Payload::Item(i) => SavedState::Item(i.to_saved()),
            Payload::Projectile(p) => SavedState::Projectile(p.to_saved()),
            Payload::Vehicle(v) => SavedState::Vehicle(v.to_saved()),
        }
    }

    fn kind(&self) -> EntityKind {
        match self {
            SavedState::Creature(_) => EntityKind::Creature,
            SavedState::Item(_) => EntityKind::Item,
            SavedState::Projectile(_) => EntityKind::Projectile,
            SavedState::Vehicle(_) => EntityKind::Vehicle,
        }
    }

    fn into_payload(self, settings: &Settings) -> Result<Payload, PersistError> {
        Ok(match self {
            SavedState::Creature(s) => {
                Payload::Creature(Creature::restore(s, Arc::clone(settings.creature()?)))
            }
            SavedState::Item(s) => {
                Payload::Item(DroppedItem::restore(s, Arc::clone(settings.item()?)))
            }
            SavedState::Projectile(s) => {
                Payload::Projectile(Projectile::restore(s, Arc::clone(settings.projectile()?)))
            }
            SavedState::Vehicle(s) => {
                Payload::Vehicle(Vehicle::restore(s, Arc::clone(settings.vehicle()?)))
            }
        })
    }
}

/// Spawn a fresh entity of `kind` standing on `coord`.
pub fn initialize(
    world: &mut EntityWorld,
    settings: &Settings,
    kind: EntityKind,
    coord: GCoord,
) -> Result<Handle, PersistError> {
    let uid = EntityId::new();
    let payload = Payload::fresh(kind, settings, coord, entity_rng(world.seed(), uid))?;
    let handle = world.spawn(uid, kind.type_tag(), kind.bind(), payload)?;
    Ok(handle)
}

/// Capture an active entity as a saved record.
pub fn save(world: &EntityWorld, handle: Handle) -> Result<SavedEntity, PersistError> {
    let (Some(envelope), Some(payload)) = (world.envelope(handle), world.payload(handle)) else {
        return Err(PersistError::StaleHandle(handle));
    };
    Ok(SavedEntity {
        uid: envelope.uid(),
        type_tag: envelope.type_tag(),
        coord: payload.coord(),
        state: SavedState::of(payload),
    })
}

/// Encode an active entity as a CBOR blob.
pub fn serialize_entity(world: &EntityWorld, handle: Handle) -> Result<Vec<u8>, PersistError> {
    cbor_serialize(&save(world, handle)?)
}

/// Spawn an entity from a saved record.
///
/// Returns the new handle and the cell the entity occupies, which is where it has been
/// registered in the world's spatial index.
pub fn load(
    world: &mut EntityWorld,
    settings: &Settings,
    saved: SavedEntity,
) -> Result<(Handle, GCoord), PersistError> {
    let kind = EntityKind::from_tag(saved.type_tag).ok_or(PersistError::UnknownTag(saved.type_tag))?;
    let found = saved.state.kind();
    if found != kind {
        return Err(PersistError::KindMismatch {
            tag: saved.type_tag,
            found: found.name(),
        });
    }
    let payload = saved.state.into_payload(settings)?;
    let coord = payload.coord();
    if coord != saved.coord {
        tracing::debug!(saved = %saved.coord, actual = %coord, "saved cell disagrees with body");
    }
    let handle = world.spawn(saved.uid, kind.type_tag(), kind.bind(), payload)?;
    Ok((handle, coord))
}

/// Decode a CBOR blob written by [`serialize_entity`] and spawn it.
pub fn deserialize(
    world: &mut EntityWorld,
    settings: &Settings,
    bytes: &[u8],
) -> Result<(Handle, GCoord), PersistError> {
    let saved: SavedEntity = cbor_deserialize(bytes)?;
    load(world, settings, saved)
}
