use mobsim_common::Handle;

/// Errors from arena storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("arena exhausted: all {capacity} slots are in use")]
    Exhausted { capacity: usize },
}

/// Errors from world-level operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error("handle {0:?} does not refer to a live entity")]
    StaleHandle(Handle),
}
