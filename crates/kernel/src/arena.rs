use mobsim_common::Handle;
use slotmap::SlotMap;

use crate::error::ArenaError;

/// Bounded slot storage for entity payloads.
///
/// The arena is the only place payloads are allocated or freed. Handles are generational:
/// freeing a slot invalidates its handle, and a reused slot hands out a different one, so a
/// stale handle resolves to nothing instead of another entity.
#[derive(Debug)]
pub struct Arena<P> {
    slots: SlotMap<Handle, P>,
    capacity: usize,
}

impl<P> Arena<P> {
    /// Reserve storage for `capacity` payloads up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Move a payload into the arena.
    pub fn allocate(&mut self, payload: P) -> Result<Handle, ArenaError> {
        if self.slots.len() >= self.capacity {
            return Err(ArenaError::Exhausted {
                capacity: self.capacity,
            });
        }
        Ok(self.slots.insert(payload))
    }

    /// Release a slot and hand the payload back.
    ///
    /// Freeing a handle twice is a programmer error: it trips a debug assertion and is a
    /// no-op in release builds.
    pub fn free(&mut self, handle: Handle) -> Option<P> {
        let removed = self.slots.remove(handle);
        debug_assert!(removed.is_some(), "double free of {handle:?}");
        removed
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slots.contains_key(handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&P> {
        self.slots.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut P> {
        self.slots.get_mut(handle)
    }

    /// Mutable access to several distinct slots at once.
    pub fn get_disjoint_mut<const N: usize>(&mut self, handles: [Handle; N]) -> Option<[&mut P; N]> {
        self.slots.get_disjoint_mut(handles)
    }

    /// All live slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &P)> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut P)> {
        self.slots.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_read_back() {
        let mut arena = Arena::with_capacity(4);
        let a = arena.allocate(10u32).unwrap();
        let b = arena.allocate(20u32).unwrap();
        assert_eq!(arena.get(a), Some(&10));
        assert_eq!(arena.get(b), Some(&20));
        *arena.get_mut(a).unwrap() += 1;
        assert_eq!(arena.get(a), Some(&11));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn free_does_not_disturb_other_handles() {
        let mut arena = Arena::with_capacity(4);
        let a = arena.allocate("a").unwrap();
        let b = arena.allocate("b").unwrap();
        assert_eq!(arena.free(a), Some("a"));
        let c = arena.allocate("c").unwrap();
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.get(c), Some(&"c"));
    }

    #[test]
    fn stale_handle_never_aliases_reused_slot() {
        let mut arena = Arena::with_capacity(1);
        let a = arena.allocate(1).unwrap();
        arena.free(a);
        let b = arena.allocate(2).unwrap();
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b), Some(&2));
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut arena = Arena::with_capacity(2);
        arena.allocate(()).unwrap();
        arena.allocate(()).unwrap();
        assert_eq!(
            arena.allocate(()),
            Err(ArenaError::Exhausted { capacity: 2 })
        );
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "double free")]
    fn double_free_trips_debug_assertion() {
        let mut arena = Arena::with_capacity(1);
        let a = arena.allocate(()).unwrap();
        arena.free(a);
        arena.free(a);
    }
}
