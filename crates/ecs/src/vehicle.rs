use std::sync::Arc;

use glam::Vec3;
use mobsim_common::Handle;
use mobsim_kernel::{Commands, DispatchTable, RenderState, Status, TickContext};
use serde::{Deserialize, Serialize};

use crate::commands;
use crate::locomotion::{Body, integrate};
use crate::payload::{Payload, mismatched};
use crate::settings::VehicleSettings;

pub const DISPATCH: DispatchTable<Payload> = DispatchTable {
    name: "vehicle",
    update,
    disable,
};

/// Rideable vehicle with a single seat.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub settings: Arc<VehicleSettings>,
    pub body: Body,
    /// Steering input; its horizontal part is the aim, clamped to unit length.
    pub throttle: Vec3,
    pub rider: Option<Handle>,
    pub health: f32,
}

impl Vehicle {
    pub fn new(settings: Arc<VehicleSettings>, foot: Vec3) -> Self {
        Self {
            body: Body::at(foot),
            throttle: Vec3::ZERO,
            rider: None,
            health: settings.max_health,
            settings,
        }
    }

    /// Where a rider's foot point goes.
    pub fn seat(&self) -> Vec3 {
        self.body.position + Vec3::Y * self.settings.seat_height
    }

    pub fn render_state(&self) -> RenderState {
        RenderState {
            transform: self.body.transform(),
            velocity: self.body.velocity,
            pose: self.body.pose(),
        }
    }

    fn step(&mut self, handle: Handle, ctx: &TickContext<'_>, out: &mut Commands<Payload>) -> Status {
        if self.health <= 0.0 {
            return Status::Expired;
        }
        integrate(
            &mut self.body,
            self.throttle,
            &self.settings.motion,
            &self.settings.profile,
            ctx,
        );
        if let Some(rider) = self.rider {
            out.push(move |world| {
                commands::carry_rider(world, handle, rider);
            });
        }
        Status::Alive
    }

    pub fn to_saved(&self) -> SavedVehicle {
        SavedVehicle {
            body: self.body,
            throttle: self.throttle,
            health: self.health,
        }
    }

    /// Rebuild a vehicle from saved state. The seat is always empty after a load.
    pub fn restore(saved: SavedVehicle, settings: Arc<VehicleSettings>) -> Self {
        Self {
            body: saved.body,
            throttle: saved.throttle.clamp_length_max(1.0),
            rider: None,
            health: saved.health.min(settings.max_health),
            settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedVehicle {
    pub body: Body,
    pub throttle: Vec3,
    pub health: f32,
}

fn update(
    handle: Handle,
    payload: &mut Payload,
    ctx: &TickContext<'_>,
    out: &mut Commands<Payload>,
) -> Status {
    match payload {
        Payload::Vehicle(v) => v.step(handle, ctx, out),
        other => mismatched(handle, DISPATCH.name, other),
    }
}

fn disable(handle: Handle, payload: &mut Payload) {
    if let Payload::Vehicle(v) = payload {
        if let Some(rider) = v.rider.take() {
            tracing::debug!(?handle, ?rider, "vehicle disabled with rider aboard");
        }
        v.throttle = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn throttle_drives_the_vehicle() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(0.05);
        let mut v = Vehicle::new(Arc::new(VehicleSettings::default()), Vec3::new(0.5, 0.0, 0.5));
        v.throttle = Vec3::Z;
        let mut out = Commands::new();
        for _ in 0..40 {
            assert_eq!(v.step(Handle::default(), &ctx, &mut out), Status::Alive);
        }
        assert!(v.body.position.z > 3.0);
        assert!(out.is_empty());
    }

    #[test]
    fn rider_is_carried_every_tick() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(0.05);
        let mut v = Vehicle::new(Arc::new(VehicleSettings::default()), Vec3::new(0.5, 0.0, 0.5));
        v.rider = Some(Handle::default());
        let mut out = Commands::new();
        v.step(Handle::default(), &ctx, &mut out);
        v.step(Handle::default(), &ctx, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn wrecked_vehicle_expires() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(0.05);
        let mut v = Vehicle::new(Arc::new(VehicleSettings::default()), Vec3::new(0.5, 0.0, 0.5));
        v.health = -1.0;
        let mut out = Commands::new();
        assert_eq!(v.step(Handle::default(), &ctx, &mut out), Status::Expired);
    }
}
