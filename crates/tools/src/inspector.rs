use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;
use mobsim_common::{EntityId, Handle};
use mobsim_ecs::{EntityKind, EntityWorld, Payload};
use mobsim_kernel::{Pose, RenderView};

/// Read-only queries against a world for debugging and development UI.
pub struct Inspector;

impl Inspector {
    pub fn summary(world: &EntityWorld) -> WorldSummary {
        let mut per_kind = BTreeMap::new();
        for (_, _, payload) in world.iter() {
            *per_kind.entry(payload.kind()).or_insert(0) += 1;
        }
        WorldSummary {
            tick: world.tick(),
            seed: world.seed(),
            entity_count: world.entity_count(),
            per_kind,
            pending_events: world.events().len(),
            pending_commands: world.pending_commands(),
        }
    }

    /// The same copies the rendering layer receives.
    pub fn views(world: &EntityWorld) -> Vec<RenderView> {
        world.render_views()
    }

    pub fn inspect(world: &EntityWorld, handle: Handle) -> Option<EntityInfo> {
        let envelope = world.envelope(handle)?;
        let payload = world.payload(handle)?;
        let state = mobsim_kernel::Simulated::render_state(payload);
        Some(EntityInfo {
            handle,
            uid: envelope.uid(),
            kind: payload.kind(),
            position: state.transform.position,
            velocity: state.velocity,
            pose: state.pose,
            detail: detail(payload),
        })
    }

    pub fn find(world: &EntityWorld, uid: EntityId) -> Option<Handle> {
        world
            .iter()
            .find(|(_, envelope, _)| envelope.uid() == uid)
            .map(|(handle, _, _)| handle)
    }

    /// Active handles and their persistent ids, in slot order.
    pub fn list_entities(world: &EntityWorld) -> Vec<(Handle, EntityId)> {
        world.iter().map(|(h, e, _)| (h, e.uid())).collect()
    }
}

fn detail(payload: &Payload) -> String {
    match payload {
        Payload::Creature(c) => format!(
            "task={} health={:.1} path={}/{}{}",
            c.task_name(),
            c.health,
            c.path.current_index,
            c.path.len(),
            if c.mount.is_some() { " mounted" } else { "" }
        ),
        Payload::Item(i) => format!(
            "{:?} x{}/{} decay={:.1}s",
            i.stack.item, i.stack.amount, i.stack.capacity, i.decay
        ),
        Payload::Projectile(p) => format!("remaining={:.2}s damage={:.1}", p.remaining, p.damage),
        Payload::Vehicle(v) => format!(
            "health={:.1} rider={}",
            v.health,
            if v.rider.is_some() { "yes" } else { "none" }
        ),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldSummary {
    pub tick: u64,
    pub seed: u64,
    pub entity_count: usize,
    pub per_kind: BTreeMap<EntityKind, usize>,
    pub pending_events: usize,
    pub pending_commands: usize,
}

impl WorldSummary {
    pub fn count(&self, kind: EntityKind) -> usize {
        self.per_kind.get(&kind).copied().unwrap_or(0)
    }
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "World: tick={} seed={:#018x} entities={}",
            self.tick, self.seed, self.entity_count
        )?;
        for kind in EntityKind::ALL {
            write!(f, " {}={}", kind, self.count(kind))?;
        }
        write!(
            f,
            " pending_events={} pending_commands={}",
            self.pending_events, self.pending_commands
        )
    }
}

#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub handle: Handle,
    pub uid: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub pose: Pose,
    pub detail: String,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:.8}] pos=({:.2}, {:.2}, {:.2}) speed={:.2} {:?} {}",
            self.kind,
            self.uid.0.simple().to_string(),
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.length(),
            self.pose,
            self.detail,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use mobsim_common::GCoord;
    use mobsim_ecs::{Settings, entity_rng};
    use mobsim_kernel::{Environment, SimConfig};
    use mobsim_stream::{GridIndex, GridPathfinder, VoxelTerrain};

    fn world() -> EntityWorld {
        EntityWorld::new(
            SimConfig::default(),
            Environment {
                terrain: Arc::new(VoxelTerrain::flat(0)),
                spatial: Box::new(GridIndex::new(4.0).unwrap()),
                pathfinder: Arc::new(GridPathfinder),
            },
        )
    }

    fn spawn(world: &mut EntityWorld, kind: EntityKind, coord: GCoord) -> Handle {
        let uid = EntityId::new();
        let payload =
            Payload::fresh(kind, &Settings::default(), coord, entity_rng(world.seed(), uid)).unwrap();
        world.spawn(uid, kind.type_tag(), kind.bind(), payload).unwrap()
    }

    #[test]
    fn summary_empty_world() {
        let summary = Inspector::summary(&world());
        assert_eq!(summary.tick, 0);
        assert_eq!(summary.entity_count, 0);
        assert!(summary.per_kind.is_empty());
    }

    #[test]
    fn summary_counts_each_kind() {
        let mut w = world();
        spawn(&mut w, EntityKind::Creature, GCoord::new(0, 0, 0));
        spawn(&mut w, EntityKind::Creature, GCoord::new(4, 0, 0));
        spawn(&mut w, EntityKind::Item, GCoord::new(0, 0, 4));
        w.step();

        let summary = Inspector::summary(&w);
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.entity_count, 3);
        assert_eq!(summary.count(EntityKind::Creature), 2);
        assert_eq!(summary.count(EntityKind::Item), 1);
        assert_eq!(summary.count(EntityKind::Vehicle), 0);
        // three spawns and one step
        assert_eq!(summary.pending_events, 4);
    }

    #[test]
    fn views_mirror_active_entities() {
        let mut w = world();
        let a = spawn(&mut w, EntityKind::Vehicle, GCoord::new(1, 0, 1));
        let b = spawn(&mut w, EntityKind::Creature, GCoord::new(5, 0, 1));
        w.despawn(b);

        let views = Inspector::views(&w);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].handle, a);
        assert_eq!(views[0].type_tag, EntityKind::Vehicle.type_tag());
    }

    #[test]
    fn inspect_and_find() {
        let mut w = world();
        let h = spawn(&mut w, EntityKind::Item, GCoord::new(2, 0, 3));
        let info = Inspector::inspect(&w, h).unwrap();
        assert_eq!(info.kind, EntityKind::Item);
        assert_eq!(info.position, GCoord::new(2, 0, 3).foot());
        assert!(info.detail.contains("x1/64"));
        assert_eq!(Inspector::find(&w, info.uid), Some(h));
        assert_eq!(Inspector::find(&w, EntityId::new()), None);

        w.despawn(h);
        assert!(Inspector::inspect(&w, h).is_none());
    }

    #[test]
    fn list_in_slot_order() {
        let mut w = world();
        let a = spawn(&mut w, EntityKind::Creature, GCoord::new(0, 0, 0));
        let b = spawn(&mut w, EntityKind::Projectile, GCoord::new(0, 5, 0));
        let listed: Vec<Handle> = Inspector::list_entities(&w).into_iter().map(|(h, _)| h).collect();
        assert_eq!(listed, vec![a, b]);
    }

    #[test]
    fn summary_display() {
        let s = Inspector::summary(&world()).to_string();
        assert!(s.contains("tick=0"));
        assert!(s.contains("creature=0"));
    }
}
