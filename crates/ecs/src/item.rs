//! Dropped item stacks: settle under gravity, decay, and merge with nearby equal stacks.

use std::sync::Arc;

use glam::Vec3;
use mobsim_common::Handle;
use mobsim_kernel::{Commands, DispatchTable, RenderState, Status, TickContext};
use serde::{Deserialize, Serialize};

use crate::commands;
use crate::locomotion::{Body, integrate};
use crate::payload::{Payload, mismatched};
use crate::settings::ItemSettings;

pub const DISPATCH: DispatchTable<Payload> = DispatchTable {
    name: "item",
    update,
    disable,
};

/// What a dropped stack holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeldItem {
    Block { id: u16 },
    Material { id: u16, quality: u8 },
    Tool { id: u16, durability: u16 },
}

impl HeldItem {
    /// Tools carry per-instance wear and never stack.
    pub fn is_stackable(&self) -> bool {
        !matches!(self, HeldItem::Tool { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: HeldItem,
    pub amount: u32,
    pub capacity: u32,
}

impl ItemStack {
    /// A stack of `amount` items. Unstackable items get capacity 1.
    pub fn new(item: HeldItem, amount: u32, capacity: u32) -> Self {
        let capacity = if item.is_stackable() { capacity.max(1) } else { 1 };
        Self {
            item,
            amount: amount.min(capacity),
            capacity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    pub fn space(&self) -> u32 {
        self.capacity.saturating_sub(self.amount)
    }

    pub fn can_merge(&self, other: &ItemStack) -> bool {
        self.item == other.item && self.item.is_stackable() && !other.is_empty() && self.space() > 0
    }

    /// Move as much of `other` into `self` as fits. Returns the amount moved; the total of the
    /// two stacks is unchanged.
    pub fn transfer_from(&mut self, other: &mut ItemStack) -> u32 {
        if !self.can_merge(other) {
            return 0;
        }
        let moved = self.space().min(other.amount);
        self.amount += moved;
        other.amount -= moved;
        moved
    }
}

#[derive(Debug, Clone)]
pub struct DroppedItem {
    pub settings: Arc<ItemSettings>,
    pub body: Body,
    pub stack: ItemStack,
    /// Seconds left before the stack despawns.
    pub decay: f32,
    /// Seconds until the next merge scan.
    pub merge_timer: f32,
}

impl DroppedItem {
    pub fn new(settings: Arc<ItemSettings>, foot: Vec3, stack: ItemStack) -> Self {
        Self {
            body: Body::at(foot),
            stack,
            decay: settings.decay_seconds,
            merge_timer: settings.merge_interval,
            settings,
        }
    }

    pub fn render_state(&self) -> RenderState {
        RenderState {
            transform: self.body.transform(),
            velocity: self.body.velocity,
            pose: self.body.pose(),
        }
    }

    fn step(&mut self, handle: Handle, ctx: &TickContext<'_>, out: &mut Commands<Payload>) -> Status {
        if self.stack.is_empty() {
            return Status::Expired;
        }
        self.decay -= ctx.delta_time;
        if self.decay <= 0.0 {
            return Status::Expired;
        }
        integrate(
            &mut self.body,
            Vec3::ZERO,
            &self.settings.motion,
            &self.settings.profile,
            ctx,
        );

        self.merge_timer -= ctx.delta_time;
        if self.merge_timer <= 0.0 {
            self.merge_timer = self.settings.merge_interval;
            if self.stack.item.is_stackable() && self.stack.space() < self.stack.capacity {
                self.scan_for_merges(handle, ctx, out);
            }
        }
        Status::Alive
    }

    /// Queue merges of this stack into every lower-handled neighbor. Compatibility is checked
    /// when the merge runs, since neighbors may change before then.
    fn scan_for_merges(&self, handle: Handle, ctx: &TickContext<'_>, out: &mut Commands<Payload>) {
        let area = self
            .settings
            .profile
            .bounds_at(self.body.position)
            .expand(self.settings.merge_radius);
        let mut partners = Vec::new();
        ctx.spatial.query_range(&area, &mut |other, _| {
            if other < handle {
                partners.push(other);
            }
        });
        partners.sort();
        for into in partners {
            out.push(move |world| {
                commands::merge_stacks(world, into, handle);
            });
        }
    }

    pub fn to_saved(&self) -> SavedItem {
        SavedItem {
            body: self.body,
            stack: self.stack,
            decay: self.decay,
            merge_timer: self.merge_timer,
        }
    }

    /// Rebuild an item from saved state. Timers are capped to the configured maxima.
    pub fn restore(saved: SavedItem, settings: Arc<ItemSettings>) -> Self {
        let mut stack = saved.stack;
        stack.amount = stack.amount.min(stack.capacity);
        Self {
            body: saved.body,
            stack,
            decay: saved.decay.min(settings.decay_seconds),
            merge_timer: saved.merge_timer.clamp(0.0, settings.merge_interval),
            settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    pub body: Body,
    pub stack: ItemStack,
    pub decay: f32,
    pub merge_timer: f32,
}

fn update(
    handle: Handle,
    payload: &mut Payload,
    ctx: &TickContext<'_>,
    out: &mut Commands<Payload>,
) -> Status {
    match payload {
        Payload::Item(item) => item.step(handle, ctx, out),
        other => mismatched(handle, DISPATCH.name, other),
    }
}

fn disable(handle: Handle, payload: &mut Payload) {
    if let Payload::Item(item) = payload {
        tracing::trace!(?handle, amount = item.stack.amount, "item disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    const STONE: HeldItem = HeldItem::Block { id: 1 };

    #[test]
    fn transfer_conserves_total() {
        let mut a = ItemStack::new(STONE, 5, 10);
        let mut b = ItemStack::new(STONE, 8, 10);
        assert_eq!(a.transfer_from(&mut b), 5);
        assert_eq!((a.amount, b.amount), (10, 3));
        assert_eq!(a.transfer_from(&mut b), 0);
        assert_eq!((a.amount, b.amount), (10, 3));
    }

    #[test]
    fn depleted_source_is_a_noop() {
        let mut a = ItemStack::new(STONE, 5, 10);
        let mut b = ItemStack::new(STONE, 0, 10);
        assert_eq!(a.transfer_from(&mut b), 0);
        assert_eq!(a.amount, 5);
    }

    #[test]
    fn mismatched_or_unstackable_items_do_not_merge() {
        let mut a = ItemStack::new(STONE, 1, 10);
        let mut b = ItemStack::new(HeldItem::Block { id: 2 }, 1, 10);
        assert_eq!(a.transfer_from(&mut b), 0);

        let pick = HeldItem::Tool { id: 3, durability: 50 };
        let mut t1 = ItemStack::new(pick, 1, 10);
        let mut t2 = ItemStack::new(pick, 1, 10);
        assert_eq!(t1.capacity, 1);
        assert_eq!(t1.transfer_from(&mut t2), 0);
    }

    #[test]
    fn decays_to_expiry() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(1.0);
        let settings = Arc::new(ItemSettings {
            decay_seconds: 3.0,
            ..ItemSettings::default()
        });
        let mut item = DroppedItem::new(settings, Vec3::new(0.5, 0.0, 0.5), ItemStack::new(STONE, 1, 64));
        let mut out = Commands::new();
        assert_eq!(item.step(Handle::default(), &ctx, &mut out), Status::Alive);
        assert_eq!(item.step(Handle::default(), &ctx, &mut out), Status::Alive);
        assert_eq!(item.step(Handle::default(), &ctx, &mut out), Status::Expired);
    }

    #[test]
    fn empty_stack_expires() {
        let fx = Fixture::flat();
        let ctx = fx.ctx(0.05);
        let mut item = DroppedItem::new(
            Arc::new(ItemSettings::default()),
            Vec3::new(0.5, 0.0, 0.5),
            ItemStack::new(STONE, 0, 64),
        );
        let mut out = Commands::new();
        assert_eq!(item.step(Handle::default(), &ctx, &mut out), Status::Expired);
    }

    #[test]
    fn restore_caps_timers() {
        let settings = Arc::new(ItemSettings::default());
        let mut item = DroppedItem::new(
            Arc::clone(&settings),
            Vec3::new(0.5, 0.0, 0.5),
            ItemStack::new(STONE, 4, 64),
        );
        item.decay = settings.decay_seconds * 10.0;
        item.merge_timer = -2.0;
        let restored = DroppedItem::restore(item.to_saved(), settings);
        assert_eq!(restored.decay, restored.settings.decay_seconds);
        assert_eq!(restored.merge_timer, 0.0);
        assert_eq!(restored.stack.amount, 4);
    }
}
