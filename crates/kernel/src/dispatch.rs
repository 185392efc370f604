use mobsim_common::{EntityId, Handle, SpatialId};
use serde::{Deserialize, Serialize};

use crate::command::Commands;
use crate::context::TickContext;

/// Stable per-type tag. The tag is what gets persisted; dispatch is re-resolved from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag(pub u16);

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an update reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Alive,
    /// The entity is done (died, decayed, hit something). It is reaped during draining.
    Expired,
}

/// Advance one entity by one tick. May only touch its own payload; everything else goes
/// through `Commands`.
pub type UpdateFn<P> = fn(Handle, &mut P, &TickContext<'_>, &mut Commands<P>) -> Status;

/// Release per-entity resources. Runs exactly once, after the last update.
pub type DisableFn<P> = fn(Handle, &mut P);

/// The two behaviors of an entity type, bound once when the entity is created.
pub struct DispatchTable<P> {
    pub name: &'static str,
    pub update: UpdateFn<P>,
    pub disable: DisableFn<P>,
}

impl<P> Clone for DispatchTable<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for DispatchTable<P> {}

impl<P> std::fmt::Debug for DispatchTable<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The uniform record the scheduler iterates.
///
/// An active envelope always refers to a live arena slot and carries a bound table; the
/// table is never reassigned after creation.
#[derive(Debug)]
pub struct Envelope<P> {
    uid: EntityId,
    type_tag: TypeTag,
    pub(crate) active: bool,
    pub(crate) spatial_id: Option<SpatialId>,
    dispatch: DispatchTable<P>,
    payload: Handle,
}

impl<P> Envelope<P> {
    pub(crate) fn new(
        uid: EntityId,
        type_tag: TypeTag,
        dispatch: DispatchTable<P>,
        payload: Handle,
        spatial_id: Option<SpatialId>,
    ) -> Self {
        Self {
            uid,
            type_tag,
            active: true,
            spatial_id,
            dispatch,
            payload,
        }
    }

    pub fn uid(&self) -> EntityId {
        self.uid
    }

    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn spatial_id(&self) -> Option<SpatialId> {
        self.spatial_id
    }

    pub fn dispatch(&self) -> &DispatchTable<P> {
        &self.dispatch
    }

    pub fn payload(&self) -> Handle {
        self.payload
    }
}
