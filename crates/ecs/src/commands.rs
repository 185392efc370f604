//! Cross-entity effects. These run only while the world drains deferred work, or between
//! ticks from the host. A handle that no longer resolves makes the command a no-op.

use glam::Vec3;
use mobsim_common::Handle;

use crate::EntityWorld;
use crate::creature::Mount;
use crate::payload::Payload;

/// Subtract health from a creature or vehicle. Returns false when the target has no health
/// or is gone. A target at zero health expires on its next update.
pub fn apply_damage(world: &mut EntityWorld, target: Handle, amount: f32) -> bool {
    match world.payload_mut(target) {
        Some(Payload::Creature(c)) => {
            c.health -= amount;
            true
        }
        Some(Payload::Vehicle(v)) => {
            v.health -= amount;
            true
        }
        _ => false,
    }
}

/// Move as much of `from`'s stack into `into` as fits and despawn `from` once empty.
///
/// Only merges from the higher handle into the lower, so two stacks scanning each other
/// never move items in both directions. Returns the amount moved; a source already drained
/// by an earlier merge moves nothing.
pub fn merge_stacks(world: &mut EntityWorld, into: Handle, from: Handle) -> u32 {
    if into >= from {
        return 0;
    }
    let Some([a, b]) = world.payload_pair_mut(into, from) else {
        return 0;
    };
    let (Payload::Item(a), Payload::Item(b)) = (a, b) else {
        return 0;
    };
    let moved = a.stack.transfer_from(&mut b.stack);
    if moved > 0 {
        a.decay = a.decay.max(b.decay);
    }
    let drained = b.stack.is_empty();
    if drained {
        world.despawn(from);
    }
    if moved > 0 {
        tracing::trace!(?into, ?from, moved, drained, "stacks merged");
    }
    moved
}

/// Seat `rider` on `vehicle`. The first mount to run wins; later claims on an occupied seat,
/// or by a rider already mounted, are rejected.
pub fn mount(world: &mut EntityWorld, rider: Handle, vehicle: Handle) -> bool {
    let tick = world.tick();
    let Some([r, v]) = world.payload_pair_mut(rider, vehicle) else {
        return false;
    };
    let (Payload::Creature(c), Payload::Vehicle(v)) = (r, v) else {
        return false;
    };
    if c.mount.is_some() || v.rider.is_some() {
        return false;
    }
    v.rider = Some(rider);
    c.mount = Some(Mount {
        vehicle,
        last_carried: tick,
    });
    c.path.clear();
    c.aim = Vec3::ZERO;
    c.body.position = v.seat();
    c.body.velocity = v.body.velocity;
    true
}

/// Release `rider` from its seat.
pub fn dismount(world: &mut EntityWorld, rider: Handle) -> bool {
    let Some(Payload::Creature(c)) = world.payload_mut(rider) else {
        return false;
    };
    let Some(mount) = c.mount.take() else {
        return false;
    };
    if let Some(Payload::Vehicle(v)) = world.payload_mut(mount.vehicle) {
        if v.rider == Some(rider) {
            v.rider = None;
        }
    }
    true
}

/// Place the rider on the vehicle's seat. Frees the seat when the rider is gone or no longer
/// mounted on this vehicle.
pub fn carry_rider(world: &mut EntityWorld, vehicle: Handle, rider: Handle) -> bool {
    let tick = world.tick();
    let carried = match world.payload_pair_mut(vehicle, rider) {
        Some([Payload::Vehicle(v), Payload::Creature(c)])
            if c.mount.is_some_and(|m| m.vehicle == vehicle) =>
        {
            c.body.position = v.seat();
            c.body.velocity = v.body.velocity;
            c.body.yaw = v.body.yaw;
            c.body.tilt = v.body.tilt;
            if let Some(m) = c.mount.as_mut() {
                m.last_carried = tick;
            }
            true
        }
        _ => false,
    };
    if !carried {
        if let Some(Payload::Vehicle(v)) = world.payload_mut(vehicle) {
            if v.rider == Some(rider) {
                v.rider = None;
                tracing::debug!(?vehicle, ?rider, "seat released");
            }
        }
    }
    carried
}

/// Set a vehicle's throttle. The horizontal part is clamped to unit length.
pub fn steer(world: &mut EntityWorld, vehicle: Handle, throttle: Vec3) -> bool {
    match world.payload_mut(vehicle) {
        Some(Payload::Vehicle(v)) => {
            v.throttle = throttle.clamp_length_max(1.0);
            true
        }
        _ => false,
    }
}

/// Mark an entity inactive; it is reaped at the end of the drain.
pub fn despawn(world: &mut EntityWorld, target: Handle) -> bool {
    world.despawn(target)
}
