use std::sync::Arc;

use glam::Vec3;
use mobsim_common::{Aabb, Handle, Transform};
use mobsim_kernel::{Commands, DispatchTable, Pose, RenderState, Status, TickContext};
use serde::{Deserialize, Serialize};

use crate::commands;
use crate::payload::{Payload, mismatched};
use crate::settings::ProjectileSettings;

pub const DISPATCH: DispatchTable<Payload> = DispatchTable {
    name: "projectile",
    update,
    disable,
};

/// Ballistic projectile. Unlike walking kinds, `position` is the center of its bounds.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub settings: Arc<ProjectileSettings>,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Entity that fired it; never hit by its own shot.
    pub shooter: Option<Handle>,
    /// Seconds of flight left.
    pub remaining: f32,
    pub damage: f32,
}

impl Projectile {
    pub fn new(settings: Arc<ProjectileSettings>, position: Vec3) -> Self {
        Self {
            remaining: settings.lifetime,
            damage: settings.damage,
            position,
            velocity: Vec3::ZERO,
            shooter: None,
            settings,
        }
    }

    /// A projectile already in flight.
    pub fn launched(
        settings: Arc<ProjectileSettings>,
        position: Vec3,
        velocity: Vec3,
        shooter: Option<Handle>,
    ) -> Self {
        Self {
            velocity,
            shooter,
            ..Self::new(settings, position)
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, Vec3::splat(self.settings.radius))
    }

    pub fn render_state(&self) -> RenderState {
        let mut transform = Transform::at(self.position);
        if self.velocity.length_squared() > 1e-6 {
            transform.rotation = glam::Quat::from_rotation_arc(Vec3::Z, self.velocity.normalize());
        }
        RenderState {
            transform,
            velocity: self.velocity,
            pose: Pose::Airborne,
        }
    }

    fn step(&mut self, handle: Handle, ctx: &TickContext<'_>, out: &mut Commands<Payload>) -> Status {
        let dt = ctx.delta_time;
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            return Status::Expired;
        }
        self.velocity.y -= ctx.gravity * dt;
        self.velocity *= (1.0 - self.settings.drag * dt).max(0.0);

        let start = self.position;
        let end = start + self.velocity * dt;
        let mut exclude = vec![handle];
        exclude.extend(self.shooter);
        if let Some(target) = ctx.spatial.nearest_along_ray(start, end, &exclude) {
            let amount = self.damage;
            out.push(move |world| {
                commands::apply_damage(world, target, amount);
            });
            tracing::trace!(?handle, ?target, amount, "projectile hit");
            return Status::Expired;
        }
        if ctx.terrain.classify(end).is_solid() {
            return Status::Expired;
        }
        self.position = end;
        Status::Alive
    }

    pub fn to_saved(&self) -> SavedProjectile {
        SavedProjectile {
            position: self.position,
            velocity: self.velocity,
            remaining: self.remaining,
            damage: self.damage,
        }
    }

    /// Rebuild a projectile from saved state. The shooter handle is process-local and is
    /// not restored.
    pub fn restore(saved: SavedProjectile, settings: Arc<ProjectileSettings>) -> Self {
        Self {
            position: saved.position,
            velocity: saved.velocity,
            shooter: None,
            remaining: saved.remaining.min(settings.lifetime),
            damage: saved.damage,
            settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProjectile {
    pub position: Vec3,
    pub velocity: Vec3,
    pub remaining: f32,
    pub damage: f32,
}

fn update(
    handle: Handle,
    payload: &mut Payload,
    ctx: &TickContext<'_>,
    out: &mut Commands<Payload>,
) -> Status {
    match payload {
        Payload::Projectile(p) => p.step(handle, ctx, out),
        other => mismatched(handle, DISPATCH.name, other),
    }
}

fn disable(_handle: Handle, payload: &mut Payload) {
    if let Payload::Projectile(p) = payload {
        p.velocity = Vec3::ZERO;
        p.shooter = None;
    }
}
