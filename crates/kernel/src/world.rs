use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use glam::Vec3;
use mobsim_common::{
    Aabb, EntityId, Handle, Pathfinder, SpatialIndex, TerrainSampler, Transform,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::arena::Arena;
use crate::command::{CommandQueue, Commands};
use crate::context::{SimConfig, TickContext};
use crate::dispatch::{DispatchTable, Envelope, Status, TypeTag};
use crate::error::KernelError;

/// What the scheduler needs from any payload type, independent of its concrete kind.
pub trait Simulated: Send + 'static {
    /// Current collision bounds, used to keep the spatial index in sync.
    fn bounds(&self) -> Aabb;

    /// Copy of the state a renderer mirrors.
    fn render_state(&self) -> RenderState;
}

/// Coarse animation pose for the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pose {
    Idle,
    Moving,
    Swimming,
    Airborne,
    Riding,
}

/// Render-facing copy of a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub transform: Transform,
    pub velocity: Vec3,
    pub pose: Pose,
}

/// Read-only snapshot of one entity for the rendering layer.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    pub handle: Handle,
    pub uid: EntityId,
    pub type_tag: TypeTag,
    pub state: RenderState,
}

/// The external collaborators a world samples and maintains.
pub struct Environment {
    pub terrain: Arc<dyn TerrainSampler>,
    pub spatial: Box<dyn SpatialIndex>,
    pub pathfinder: Arc<dyn Pathfinder>,
}

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Between ticks. Spawns, despawns and host commands are legal.
    Idle,
    /// Updates fan out; each touches only its own payload.
    Running,
    /// Deferred commands apply serially; cross-entity mutation is legal.
    Draining,
}

/// A record of every lifecycle change in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    Spawned { uid: EntityId, type_tag: TypeTag },
    Despawned { uid: EntityId, type_tag: TypeTag },
    /// An update panicked; the entity was isolated and marked inactive.
    Faulted { uid: EntityId, type_tag: TypeTag },
    Stepped { tick: u64, seed: u64 },
}

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick count after this tick completed.
    pub tick: u64,
    pub updated: usize,
    pub commands_applied: usize,
    pub expired: usize,
    pub faulted: usize,
    pub reaped: usize,
}

struct Outcome<P> {
    handle: Handle,
    status: Status,
    faulted: bool,
    commands: Commands<P>,
}

/// The authoritative entity population and its two-phase tick scheduler.
///
/// Each tick runs every active update (in parallel when configured), then drains the
/// deferred command queue on the calling thread in enqueue order. Outboxes are merged in
/// slot order, so the drain order never depends on how the running phase was scheduled.
pub struct World<P> {
    config: SimConfig,
    arena: Arena<P>,
    envelopes: SecondaryMap<Handle, Envelope<P>>,
    queue: CommandQueue<P>,
    terrain: Arc<dyn TerrainSampler>,
    spatial: Box<dyn SpatialIndex>,
    pathfinder: Arc<dyn Pathfinder>,
    tick: u64,
    seed: u64,
    phase: Phase,
    event_log: Vec<WorldEvent>,
}

impl<P: Simulated> World<P> {
    pub fn new(config: SimConfig, env: Environment) -> Self {
        Self {
            arena: Arena::with_capacity(config.arena_capacity),
            envelopes: SecondaryMap::new(),
            queue: CommandQueue::new(),
            terrain: env.terrain,
            spatial: env.spatial,
            pathfinder: env.pathfinder,
            tick: 0,
            seed: config.seed,
            phase: Phase::Idle,
            event_log: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current world seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Restore the clock (used when loading a snapshot).
    pub fn set_clock(&mut self, tick: u64, seed: u64) {
        self.tick = tick;
        self.seed = seed;
    }

    /// Number of active entities.
    pub fn entity_count(&self) -> usize {
        self.envelopes.values().filter(|e| e.active).count()
    }

    pub fn terrain(&self) -> &dyn TerrainSampler {
        self.terrain.as_ref()
    }

    pub fn spatial(&self) -> &dyn SpatialIndex {
        self.spatial.as_ref()
    }

    /// Commands waiting for the next drain.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Create an entity: move the payload into the arena, bind its dispatch table and
    /// register it with the spatial index.
    pub fn spawn(
        &mut self,
        uid: EntityId,
        type_tag: TypeTag,
        dispatch: DispatchTable<P>,
        payload: P,
    ) -> Result<Handle, KernelError> {
        let bounds = payload.bounds();
        let handle = self.arena.allocate(payload)?;
        let spatial_id = self.spatial.insert(handle, bounds);
        self.envelopes.insert(
            handle,
            Envelope::new(uid, type_tag, dispatch, handle, Some(spatial_id)),
        );
        self.event_log.push(WorldEvent::Spawned { uid, type_tag });
        tracing::debug!(?handle, %type_tag, kind = dispatch.name, "spawned");
        Ok(handle)
    }

    /// Mark an entity inactive. It stops updating and is reaped at the end of the next
    /// drain (or by [`World::reap_inactive`]). Returns false for stale handles.
    pub fn despawn(&mut self, handle: Handle) -> bool {
        match self.envelopes.get_mut(handle) {
            Some(env) if env.active => {
                env.active = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.envelopes.get(handle).is_some_and(|e| e.active)
    }

    pub fn envelope(&self, handle: Handle) -> Option<&Envelope<P>> {
        self.envelopes.get(handle)
    }

    /// Payload of an active entity.
    pub fn payload(&self, handle: Handle) -> Option<&P> {
        if !self.is_active(handle) {
            return None;
        }
        self.arena.get(handle)
    }

    /// Mutable payload of an active entity. Only reachable outside the running phase.
    pub fn payload_mut(&mut self, handle: Handle) -> Option<&mut P> {
        if !self.is_active(handle) {
            return None;
        }
        self.arena.get_mut(handle)
    }

    /// Mutable access to two distinct active payloads at once.
    pub fn payload_pair_mut(&mut self, a: Handle, b: Handle) -> Option<[&mut P; 2]> {
        if a == b || !self.is_active(a) || !self.is_active(b) {
            return None;
        }
        let [pa, pb] = self.arena.get_disjoint_mut([a, b])?;
        Some([pa, pb])
    }

    /// Active entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Envelope<P>, &P)> {
        self.arena.iter().filter_map(move |(handle, payload)| {
            self.envelopes
                .get(handle)
                .filter(|e| e.active)
                .map(|e| (handle, e, payload))
        })
    }

    /// Read-only copies of every active entity for the rendering layer.
    pub fn render_views(&self) -> Vec<RenderView> {
        self.iter()
            .map(|(handle, env, payload)| RenderView {
                handle,
                uid: env.uid(),
                type_tag: env.type_tag(),
                state: payload.render_state(),
            })
            .collect()
    }

    /// Queue a command from outside the tick; it runs during the next drain.
    pub fn defer(&mut self, command: impl FnOnce(&mut World<P>) + Send + 'static) {
        self.queue.push(Box::new(command));
    }

    /// Advance the world by one tick: run every active update, then drain deferred work.
    pub fn step(&mut self) -> TickReport {
        let span = tracing::info_span!("tick", tick = self.tick);
        let _enter = span.enter();

        let outcomes = self.run_updates();
        let mut report = self.drain(outcomes);

        self.tick += 1;
        self.seed = splitmix64(self.seed);
        self.event_log.push(WorldEvent::Stepped {
            tick: self.tick,
            seed: self.seed,
        });
        self.phase = Phase::Idle;
        report.tick = self.tick;
        tracing::trace!(?report, "tick complete");
        report
    }

    fn run_updates(&mut self) -> Vec<Outcome<P>> {
        let _span = tracing::debug_span!("running").entered();
        self.phase = Phase::Running;

        let ctx = TickContext {
            tick: self.tick,
            seed: self.seed,
            delta_time: self.config.delta_time,
            gravity: self.config.gravity,
            terrain: self.terrain.as_ref(),
            spatial: self.spatial.as_ref(),
            pathfinder: self.pathfinder.as_ref(),
        };
        let envelopes = &self.envelopes;
        let work: Vec<(Handle, &Envelope<P>, &mut P)> = self
            .arena
            .iter_mut()
            .filter_map(|(handle, payload)| {
                envelopes
                    .get(handle)
                    .filter(|e| e.active)
                    .map(|e| (handle, e, payload))
            })
            .collect();

        if self.config.parallel {
            work.into_par_iter()
                .map(|(handle, env, payload)| run_update(handle, env, payload, &ctx))
                .collect()
        } else {
            work.into_iter()
                .map(|(handle, env, payload)| run_update(handle, env, payload, &ctx))
                .collect()
        }
    }

    fn drain(&mut self, outcomes: Vec<Outcome<P>>) -> TickReport {
        let _span = tracing::debug_span!("draining").entered();
        self.phase = Phase::Draining;

        let mut report = TickReport {
            updated: outcomes.len(),
            ..TickReport::default()
        };
        for outcome in outcomes {
            if let Some(env) = self.envelopes.get_mut(outcome.handle) {
                if outcome.faulted {
                    report.faulted += 1;
                    self.event_log.push(WorldEvent::Faulted {
                        uid: env.uid(),
                        type_tag: env.type_tag(),
                    });
                }
                if outcome.status == Status::Expired {
                    env.active = false;
                    report.expired += 1;
                }
            }
            self.queue.extend(outcome.commands);
        }

        for command in self.queue.take() {
            command(self);
            report.commands_applied += 1;
        }

        self.sync_spatial();
        report.reaped = self.reap_inactive();
        report
    }

    fn sync_spatial(&mut self) {
        for (handle, env) in self.envelopes.iter() {
            if !env.active {
                continue;
            }
            if let (Some(id), Some(payload)) = (env.spatial_id, self.arena.get(handle)) {
                self.spatial.relocate(id, payload.bounds());
            }
        }
    }

    /// Run `disable` on every inactive entity, free its slot and drop it from the spatial
    /// index. Returns how many were reaped.
    pub fn reap_inactive(&mut self) -> usize {
        let dead: Vec<Handle> = self
            .envelopes
            .iter()
            .filter(|(_, e)| !e.active)
            .map(|(h, _)| h)
            .collect();

        for &handle in &dead {
            let Some(env) = self.envelopes.remove(handle) else {
                continue;
            };
            if let Some(payload) = self.arena.get_mut(handle) {
                (env.dispatch().disable)(handle, payload);
            }
            self.arena.free(handle);
            if let Some(id) = env.spatial_id {
                self.spatial.remove(id);
            }
            self.event_log.push(WorldEvent::Despawned {
                uid: env.uid(),
                type_tag: env.type_tag(),
            });
            tracing::debug!(?handle, kind = env.dispatch().name, "reaped");
        }
        dead.len()
    }
}

fn run_update<P>(
    handle: Handle,
    env: &Envelope<P>,
    payload: &mut P,
    ctx: &TickContext<'_>,
) -> Outcome<P> {
    let mut commands = Commands::new();
    let update = env.dispatch().update;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        update(handle, payload, ctx, &mut commands)
    }));
    match result {
        Ok(status) => Outcome {
            handle,
            status,
            faulted: false,
            commands,
        },
        Err(_) => {
            tracing::error!(
                ?handle,
                uid = %env.uid().0,
                kind = env.dispatch().name,
                "update panicked; entity isolated"
            );
            Outcome {
                handle,
                status: Status::Expired,
                faulted: true,
                commands: Commands::new(),
            }
        }
    }
}

/// Splitmix64 step used to advance the world seed each tick.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
