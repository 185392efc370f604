//! Concrete entity kinds for the simulation kernel.
//!
//! Every kind is a variant of [`Payload`] with its own dispatch table, bound once per
//! entity from its [`EntityKind`]. Kinds touch only their own payload during an update;
//! anything that reaches another entity goes through [`commands`] as deferred work.
//!
//! # Kinds
//! - creature: idle → plan → follow patrol loop, health, rides vehicles.
//! - item: dropped stack that settles, decays and merges with equal neighbors.
//! - projectile: ballistic shot that damages the first entity on its path.
//! - vehicle: single-seat mount steered by a throttle.

pub mod commands;
pub mod creature;
pub mod item;
pub mod kind;
pub mod locomotion;
pub mod path;
pub mod payload;
pub mod projectile;
pub mod settings;
pub mod vehicle;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use glam::Vec3;
use mobsim_common::{EntityId, GCoord};
use mobsim_kernel::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use creature::{Creature, Mount};
pub use item::{DroppedItem, HeldItem, ItemStack};
pub use kind::EntityKind;
pub use locomotion::Body;
pub use path::PathState;
pub use payload::Payload;
pub use projectile::Projectile;
pub use settings::{
    CreatureSettings, ItemSettings, Motion, ProjectileSettings, SecondsRange, Settings,
    SettingsError, VehicleSettings,
};
pub use vehicle::Vehicle;

/// World specialised to the entity kinds of this crate.
pub type EntityWorld = World<Payload>;

/// Random stream for one entity, derived from the world seed and its persistent id so it
/// does not depend on spawn order or thread scheduling.
pub fn entity_rng(world_seed: u64, uid: EntityId) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(world_seed ^ uid.salt())
}

impl Payload {
    /// Default payload of `kind` standing on `coord`.
    ///
    /// Fails when `settings` leaves the kind unconfigured.
    pub fn fresh(
        kind: EntityKind,
        settings: &Settings,
        coord: GCoord,
        rng: ChaCha8Rng,
    ) -> Result<Self, SettingsError> {
        let foot = coord.foot();
        Ok(match kind {
            EntityKind::Creature => {
                Payload::Creature(Creature::new(Arc::clone(settings.creature()?), foot, rng))
            }
            EntityKind::Item => {
                let s = Arc::clone(settings.item()?);
                let stack = ItemStack::new(HeldItem::Block { id: 1 }, 1, s.max_stack);
                Payload::Item(DroppedItem::new(s, foot, stack))
            }
            EntityKind::Projectile => Payload::Projectile(Projectile::new(
                Arc::clone(settings.projectile()?),
                coord.center(),
            )),
            EntityKind::Vehicle => {
                Payload::Vehicle(Vehicle::new(Arc::clone(settings.vehicle()?), foot))
            }
        })
    }

    pub fn position(&self) -> Vec3 {
        match self {
            Payload::Creature(c) => c.body.position,
            Payload::Item(i) => i.body.position,
            Payload::Projectile(p) => p.position,
            Payload::Vehicle(v) => v.body.position,
        }
    }

    /// Grid cell the entity occupies; what a loader re-registers it at.
    pub fn coord(&self) -> GCoord {
        GCoord::from_position(self.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_depends_on_seed_and_id() {
        use rand::RngCore;
        let uid = EntityId::new();
        let mut a = entity_rng(1, uid);
        let mut b = entity_rng(1, uid);
        let mut c = entity_rng(2, uid);
        let (x, y, z) = (a.next_u64(), b.next_u64(), c.next_u64());
        assert_eq!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn fresh_requires_configured_kind() {
        let settings = Settings {
            vehicle: None,
            ..Settings::default()
        };
        let rng = entity_rng(0, EntityId::new());
        assert!(Payload::fresh(EntityKind::Creature, &settings, GCoord::new(0, 0, 0), rng.clone()).is_ok());
        assert!(matches!(
            Payload::fresh(EntityKind::Vehicle, &settings, GCoord::new(0, 0, 0), rng),
            Err(SettingsError::Missing("vehicle"))
        ));
    }

    #[test]
    fn fresh_payload_reports_its_cell() {
        let rng = entity_rng(0, EntityId::new());
        for kind in EntityKind::ALL {
            let p = Payload::fresh(kind, &Settings::default(), GCoord::new(4, 2, -3), rng.clone()).unwrap();
            assert_eq!(p.kind(), kind);
            assert_eq!(p.coord(), GCoord::new(4, 2, -3));
        }
    }
}
