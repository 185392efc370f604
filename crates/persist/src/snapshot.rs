use mobsim_ecs::{EntityWorld, Settings};
use mobsim_kernel::{Environment, SimConfig};
use serde::{Deserialize, Serialize};

use crate::adapter;
use crate::codec::{cbor_serialize, sha256_hex};
use crate::error::PersistError;

/// A content-addressed capture of the whole population at a tick boundary.
///
/// Entities are kept as the same CBOR blobs [`adapter::serialize_entity`] writes, in slot
/// order, so a restore hands out handles in the same relative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    /// World seed at capture time, for deterministic continuation.
    pub seed: u64,
    pub config: SimConfig,
    pub entities: Vec<Vec<u8>>,
    /// SHA-256 over the fields above.
    pub hash: String,
}

impl WorldSnapshot {
    pub fn capture(world: &EntityWorld) -> Result<Self, PersistError> {
        let entities = world
            .iter()
            .map(|(handle, _, _)| adapter::serialize_entity(world, handle))
            .collect::<Result<Vec<_>, _>>()?;
        let tick = world.tick();
        let seed = world.seed();
        let config = world.config().clone();
        let hash = content_hash(tick, seed, &config, &entities)?;
        tracing::debug!(tick, entities = entities.len(), "snapshot captured");
        Ok(Self {
            tick,
            seed,
            config,
            entities,
            hash,
        })
    }

    /// Recompute the hash and compare.
    pub fn verify(&self) -> Result<(), PersistError> {
        let actual = content_hash(self.tick, self.seed, &self.config, &self.entities)?;
        if actual != self.hash {
            return Err(PersistError::HashMismatch {
                expected: self.hash.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Rebuild a world at the captured tick. Refuses snapshots that fail verification.
    pub fn restore(&self, settings: &Settings, env: Environment) -> Result<EntityWorld, PersistError> {
        self.verify()?;
        let mut world = EntityWorld::new(self.config.clone(), env);
        world.set_clock(self.tick, self.seed);
        for blob in &self.entities {
            adapter::deserialize(&mut world, settings, blob)?;
        }
        // Loading is not a lifecycle change.
        world.drain_events();
        Ok(world)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn content_hash(
    tick: u64,
    seed: u64,
    config: &SimConfig,
    entities: &[Vec<u8>],
) -> Result<String, PersistError> {
    let bytes = cbor_serialize(&(tick, seed, config, entities))?;
    Ok(sha256_hex(&bytes))
}
