//! Simulation kernel: arena-owned entity payloads, behavior bound once per entity,
//! and a two-phase tick scheduler.
//!
//! # Invariants
//! - During the running phase an update touches only its own payload.
//! - Cross-entity effects, spawns and despawns happen only while draining, in enqueue
//!   order.
//! - `disable` runs exactly once per entity, after its last update.

pub mod arena;
pub mod command;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod world;

pub use arena::Arena;
pub use command::{Command, Commands};
pub use context::{SimConfig, TickContext};
pub use dispatch::{DisableFn, DispatchTable, Envelope, Status, TypeTag, UpdateFn};
pub use error::{ArenaError, KernelError};
pub use world::{
    Environment, Phase, Pose, RenderState, RenderView, Simulated, TickReport, World, WorldEvent,
};
