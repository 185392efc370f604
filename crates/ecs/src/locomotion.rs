use glam::{Quat, Vec3};
use mobsim_common::{Aabb, GCoord, Profile, TerrainSampler, Transform};
use mobsim_kernel::{Pose, TickContext};
use serde::{Deserialize, Serialize};

use crate::settings::Motion;

/// How far below the foot ground is looked for to count as standing.
const GROUND_REACH: f32 = 0.05;
/// Height above the foot sampled to decide whether the body is submerged.
const SUBMERGE_DEPTH: f32 = 0.1;
/// Horizontal speed under which a body counts as standing still.
const REST_SPEED: f32 = 0.1;

/// Kinematic state of a movable payload. `position` is the foot point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub tilt: Quat,
    pub grounded: bool,
    pub submerged: bool,
}

impl Body {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            tilt: Quat::IDENTITY,
            grounded: false,
            submerged: false,
        }
    }

    pub fn coord(&self) -> GCoord {
        GCoord::from_position(self.position)
    }

    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.tilt * Quat::from_rotation_y(self.yaw),
            scale: Vec3::ONE,
        }
    }

    pub fn pose(&self) -> Pose {
        if self.submerged {
            Pose::Swimming
        } else if !self.grounded {
            Pose::Airborne
        } else if horizontal(self.velocity).length() > REST_SPEED {
            Pose::Moving
        } else {
            Pose::Idle
        }
    }
}

fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Whether any cell overlapped by `bounds` is solid.
pub fn overlaps_solid(terrain: &dyn TerrainSampler, bounds: &Aabb) -> bool {
    const EPS: f32 = 1e-4;
    let lo = GCoord::from_position(bounds.min + Vec3::splat(EPS));
    let hi = GCoord::from_position(bounds.max - Vec3::splat(EPS));
    for x in lo.x..=hi.x {
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                if terrain.classify(GCoord::new(x, y, z).center()).is_solid() {
                    return true;
                }
            }
        }
    }
    false
}

/// Rotate `from` toward `to` by at most `max_delta` radians along the shorter arc.
pub fn turn_toward(from: f32, to: f32, max_delta: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let diff = (to - from + PI).rem_euclid(TAU) - PI;
    from + diff.clamp(-max_delta, max_delta)
}

/// Advance a body by one tick: gravity (none while submerged), steering toward `aim`, friction, collision
/// against the terrain, ground stick and yaw.
pub fn integrate(body: &mut Body, aim: Vec3, motion: &Motion, profile: &Profile, ctx: &TickContext<'_>) {
    let dt = ctx.delta_time;
    let terrain = ctx.terrain;

    body.submerged = terrain
        .classify(body.position + Vec3::Y * SUBMERGE_DEPTH)
        .is_liquid();
    body.grounded =
        body.velocity.y <= 0.0 && terrain.ground_normal_near(body.position, GROUND_REACH).is_some();

    if body.submerged {
        body.velocity /= 1.0 + motion.liquid_drag * dt;
    } else if body.grounded {
        body.velocity.y = body.velocity.y.max(0.0);
    } else {
        body.velocity.y -= ctx.gravity * dt;
    }

    let max_speed = if body.submerged {
        motion.liquid_speed
    } else {
        motion.land_speed
    };
    let steer = horizontal(aim).clamp_length_max(1.0);
    let mut flat = horizontal(body.velocity);
    if steer.length_squared() > 1e-6 && max_speed > 0.0 {
        let change = (steer * max_speed - flat).clamp_length_max(motion.acceleration * dt);
        flat += change;
    } else if body.grounded {
        let speed = flat.length();
        let drop = motion.friction * dt;
        flat = if speed <= drop {
            Vec3::ZERO
        } else {
            flat * ((speed - drop) / speed)
        };
    }
    body.velocity.x = flat.x;
    body.velocity.z = flat.z;

    let delta = body.velocity * dt;
    move_axis(body, Vec3::new(0.0, delta.y, 0.0), motion, profile, terrain);
    move_axis(body, Vec3::new(delta.x, 0.0, 0.0), motion, profile, terrain);
    move_axis(body, Vec3::new(0.0, 0.0, delta.z), motion, profile, terrain);

    body.tilt = match terrain.ground_normal_near(body.position, motion.ground_stick) {
        Some(normal) if motion.ground_stick > 0.0 => Quat::from_rotation_arc(Vec3::Y, normal),
        _ => Quat::IDENTITY,
    };

    let flat = horizontal(body.velocity);
    if flat.length() > REST_SPEED {
        let target = flat.x.atan2(flat.z);
        body.yaw = turn_toward(body.yaw, target, motion.turn_rate * dt);
    }
}

fn move_axis(body: &mut Body, delta: Vec3, motion: &Motion, profile: &Profile, terrain: &dyn TerrainSampler) {
    if delta == Vec3::ZERO {
        return;
    }
    let candidate = body.position + delta;
    if !overlaps_solid(terrain, &profile.bounds_at(candidate)) {
        body.position = candidate;
        return;
    }
    if delta.y != 0.0 {
        if delta.y < 0.0 {
            // Land on the top face of the blocking cell.
            let floor = Vec3::new(body.position.x, body.position.y.floor(), body.position.z);
            if !overlaps_solid(terrain, &profile.bounds_at(floor)) {
                body.position = floor;
            }
            body.grounded = true;
        }
        body.velocity.y = 0.0;
        return;
    }
    if motion.step_up && body.grounded {
        let raised = Vec3::new(candidate.x, candidate.y.floor() + 1.0, candidate.z);
        if !overlaps_solid(terrain, &profile.bounds_at(raised)) {
            body.position = raised;
            return;
        }
    }
    if delta.x != 0.0 {
        body.velocity.x = 0.0;
    }
    if delta.z != 0.0 {
        body.velocity.z = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn falls_then_rests_on_ground() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(0.05);
        let profile = Profile::default();
        let motion = Motion::default();
        let mut body = Body::at(Vec3::new(0.5, 3.0, 0.5));
        for _ in 0..200 {
            integrate(&mut body, Vec3::ZERO, &motion, &profile, &ctx);
        }
        assert_eq!(body.position.y, 0.0);
        assert!(body.grounded);
        assert_eq!(body.velocity, Vec3::ZERO);
        assert_eq!(body.pose(), Pose::Idle);
    }

    #[test]
    fn steering_is_capped_at_land_speed() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(0.05);
        let motion = Motion::default();
        let mut body = Body::at(Vec3::new(0.5, 0.0, 0.5));
        for _ in 0..100 {
            integrate(&mut body, Vec3::X, &motion, &Profile::default(), &ctx);
        }
        let speed = horizontal(body.velocity).length();
        assert!((speed - motion.land_speed).abs() < 1e-3);
        assert!(body.position.x > 10.0);
        assert_eq!(body.pose(), Pose::Moving);
    }

    #[test]
    fn friction_stops_a_grounded_body() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(0.05);
        let mut body = Body::at(Vec3::new(0.5, 0.0, 0.5));
        body.velocity = Vec3::new(2.0, 0.0, 0.0);
        for _ in 0..20 {
            integrate(&mut body, Vec3::ZERO, &Motion::default(), &Profile::default(), &ctx);
        }
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn walls_block_without_step_up() {
        let mut fx = Fixture::flat();
        fx.terrain_mut().pillar(2, 0, 3);
        let ctx = fx.ctx(0.05);
        let motion = Motion {
            step_up: false,
            ..Motion::default()
        };
        let mut body = Body::at(Vec3::new(0.5, 0.0, 0.5));
        for _ in 0..60 {
            integrate(&mut body, Vec3::X, &motion, &Profile::default(), &ctx);
        }
        assert!(body.position.x < 2.0 - 0.3 + 1e-3);
        assert_eq!(body.position.y, 0.0);
    }

    #[test]
    fn ledges_are_climbed_with_step_up() {
        let mut fx = Fixture::flat();
        for x in 2..=8 {
            fx.terrain_mut().pillar(x, 0, 1);
        }
        let ctx = fx.ctx(0.05);
        let mut body = Body::at(Vec3::new(0.5, 0.0, 0.5));
        for _ in 0..30 {
            integrate(&mut body, Vec3::X, &Motion::default(), &Profile::default(), &ctx);
        }
        assert!(body.position.x > 2.0);
        assert!(body.position.y >= 1.0);
    }

    #[test]
    fn liquid_slows_and_floats() {
        let fx = Fixture::pond();
        let ctx = fx.ctx(0.05);
        let motion = Motion::default();
        let mut body = Body::at(Vec3::new(0.5, 1.0, 0.5));
        for _ in 0..100 {
            integrate(&mut body, Vec3::X, &motion, &Profile::default(), &ctx);
        }
        assert!(body.submerged);
        assert_eq!(body.pose(), Pose::Swimming);
        assert!(horizontal(body.velocity).length() <= motion.liquid_speed + 1e-3);
    }

    #[test]
    fn submerged_body_at_rest_does_not_sink() {
        let fx = Fixture::pond();
        let ctx = fx.ctx(0.05);
        let motion = Motion::default();
        let start = Vec3::new(0.5, 2.0, 0.5);
        let mut body = Body::at(start);
        for _ in 0..60 {
            integrate(&mut body, Vec3::ZERO, &motion, &Profile::default(), &ctx);
            assert!(body.submerged);
            assert!(body.velocity.y >= 0.0);
        }
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.position, start);
    }

    #[test]
    fn yaw_turns_at_bounded_rate() {
        let a = turn_toward(0.0, 3.0, 0.5);
        assert!((a - 0.5).abs() < 1e-6);
        // Shorter arc across the wrap point.
        let b = turn_toward(3.0, -3.0, 1.0);
        assert!(b > 3.0);
    }
}
