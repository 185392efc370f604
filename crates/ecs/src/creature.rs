//! Patrol creature: a three-task state machine that idles, plans a short walk and follows
//! the planned path.

use std::sync::Arc;

use glam::{IVec3, Vec3};
use mobsim_common::Handle;
use mobsim_kernel::{Commands, DispatchTable, Pose, RenderState, Status, TickContext};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::locomotion::{Body, integrate};
use crate::path::PathState;
use crate::payload::{Payload, mismatched};
use crate::settings::CreatureSettings;

pub const IDLE: u8 = 0;
pub const PLAN: u8 = 1;
pub const FOLLOW: u8 = 2;

/// Horizontal distance at which a waypoint counts as reached.
const ARRIVE_RADIUS: f32 = 0.5;

/// A task runs once per tick and returns the index of the task to run next tick.
pub type Task = fn(&mut Creature, &TickContext<'_>) -> u8;

/// Ordered task table, indexed by [`Creature::task`].
pub const TASKS: [(&str, Task); 3] = [("idle", idle), ("plan", plan), ("follow", follow)];

pub const DISPATCH: DispatchTable<Payload> = DispatchTable {
    name: "creature",
    update,
    disable,
};

/// Seat claimed on a vehicle. `last_carried` is the last tick the vehicle moved the rider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mount {
    pub vehicle: Handle,
    pub last_carried: u64,
}

#[derive(Debug, Clone)]
pub struct Creature {
    pub settings: Arc<CreatureSettings>,
    pub body: Body,
    pub task: u8,
    pub idle_timer: f32,
    pub path: PathState,
    pub aim: Vec3,
    pub health: f32,
    pub mount: Option<Mount>,
    pub rng: ChaCha8Rng,
}

impl Creature {
    pub fn new(settings: Arc<CreatureSettings>, foot: Vec3, mut rng: ChaCha8Rng) -> Self {
        let idle_timer = settings.idle.sample(&mut rng);
        Self {
            health: settings.max_health,
            settings,
            body: Body::at(foot),
            task: IDLE,
            idle_timer,
            path: PathState::default(),
            aim: Vec3::ZERO,
            mount: None,
            rng,
        }
    }

    pub fn task_name(&self) -> &'static str {
        TASKS.get(self.task as usize).map_or("invalid", |(name, _)| name)
    }

    pub fn render_state(&self) -> RenderState {
        RenderState {
            transform: self.body.transform(),
            velocity: self.body.velocity,
            pose: if self.mount.is_some() {
                Pose::Riding
            } else {
                self.body.pose()
            },
        }
    }

    /// Drop the path and wait a fresh randomized duration.
    fn rest(&mut self) -> u8 {
        self.path.clear();
        self.aim = Vec3::ZERO;
        self.idle_timer = self.settings.idle.sample(&mut self.rng);
        IDLE
    }

    /// Run the current task and record the transition.
    pub fn think(&mut self, ctx: &TickContext<'_>) {
        let Some(&(name, task)) = TASKS.get(self.task as usize) else {
            tracing::warn!(task = self.task, "unknown task index; resetting to idle");
            self.task = self.rest();
            return;
        };
        let next = task(self, ctx);
        if next != self.task {
            tracing::trace!(from = name, to = TASKS[next as usize].0, tick = ctx.tick, "task transition");
        }
        self.task = next;
    }

    fn step(&mut self, handle: Handle, ctx: &TickContext<'_>) -> Status {
        if self.health <= 0.0 {
            return Status::Expired;
        }
        if let Some(mount) = self.mount {
            if ctx.tick <= mount.last_carried + 1 {
                return Status::Alive;
            }
            tracing::debug!(?handle, vehicle = ?mount.vehicle, "no longer carried; dismounting");
            self.mount = None;
        }
        self.think(ctx);
        integrate(
            &mut self.body,
            self.aim,
            &self.settings.motion,
            &self.settings.profile,
            ctx,
        );
        Status::Alive
    }

    pub fn to_saved(&self) -> SavedCreature {
        SavedCreature {
            body: self.body,
            task: self.task,
            idle_timer: self.idle_timer,
            path: self.path.clone(),
            health: self.health,
            rng: self.rng.clone(),
        }
    }

    /// Rebuild a creature from saved state, clamping it to `settings`.
    pub fn restore(saved: SavedCreature, settings: Arc<CreatureSettings>) -> Self {
        let mut creature = Self {
            body: saved.body,
            task: saved.task,
            idle_timer: saved.idle_timer.clamp(0.0, settings.idle.max),
            path: saved.path,
            aim: Vec3::ZERO,
            health: saved.health.min(settings.max_health),
            mount: None,
            rng: saved.rng,
            settings,
        };
        if creature.task as usize >= TASKS.len() {
            creature.task = creature.rest();
        }
        creature
    }
}

/// Persisted creature state. Settings, steering and mounts are rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCreature {
    pub body: Body,
    pub task: u8,
    pub idle_timer: f32,
    pub path: PathState,
    pub health: f32,
    pub rng: ChaCha8Rng,
}

fn idle(c: &mut Creature, ctx: &TickContext<'_>) -> u8 {
    c.aim = Vec3::ZERO;
    c.idle_timer -= ctx.delta_time;
    if c.idle_timer <= 0.0 { PLAN } else { IDLE }
}

fn plan(c: &mut Creature, ctx: &TickContext<'_>) -> u8 {
    c.aim = Vec3::ZERO;
    let r = c.settings.wander_radius;
    let delta = IVec3::new(
        c.rng.gen_range(-r..=r),
        c.rng.gen_range(-1..=1),
        c.rng.gen_range(-r..=r),
    );
    if delta.x == 0 && delta.z == 0 {
        return PLAN;
    }
    let from = c.body.coord();
    let profile = &c.settings.profile;
    if !profile.is_valid(ctx.terrain, from.offset(delta)) {
        return PLAN;
    }
    let steps = ctx
        .pathfinder
        .find_path(ctx.terrain, from, delta, c.settings.path_budget, profile);
    if steps.is_empty() {
        return PLAN;
    }
    c.path.set(from, steps);
    FOLLOW
}

fn follow(c: &mut Creature, ctx: &TickContext<'_>) -> u8 {
    let (Some(step), Some(target)) = (c.path.next_step(), c.path.next_target()) else {
        return c.rest();
    };
    let profile = c.settings.profile;
    if c.body.position.distance(c.path.current_position.foot()) > profile.max_drift {
        return c.rest();
    }
    if !profile.is_step_valid(ctx.terrain, c.path.current_position, step) {
        return c.rest();
    }
    let to_target = target.foot() - c.body.position;
    let flat = Vec3::new(to_target.x, 0.0, to_target.z);
    if flat.length() < ARRIVE_RADIUS {
        c.path.advance();
        c.aim = match c.path.next_target() {
            Some(next) => {
                let d = next.foot() - c.body.position;
                Vec3::new(d.x, 0.0, d.z).normalize_or_zero()
            }
            None => Vec3::ZERO,
        };
    } else {
        c.aim = flat.normalize_or_zero();
    }
    FOLLOW
}

fn update(
    handle: Handle,
    payload: &mut Payload,
    ctx: &TickContext<'_>,
    _out: &mut Commands<Payload>,
) -> Status {
    match payload {
        Payload::Creature(c) => c.step(handle, ctx),
        other => mismatched(handle, DISPATCH.name, other),
    }
}

fn disable(handle: Handle, payload: &mut Payload) {
    if let Payload::Creature(c) = payload {
        c.path.clear();
        c.mount = None;
        c.aim = Vec3::ZERO;
        tracing::trace!(?handle, health = c.health, "creature disabled");
    }
}
