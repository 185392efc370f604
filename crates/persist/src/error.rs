use mobsim_common::Handle;
use mobsim_ecs::SettingsError;
use mobsim_kernel::{KernelError, TypeTag};

/// Errors from saving or loading entities and snapshots.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("unknown type tag {0}")]
    UnknownTag(TypeTag),
    #[error("type tag {tag} does not match saved {found} state")]
    KindMismatch { tag: TypeTag, found: &'static str },
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("handle {0:?} does not refer to a live entity")]
    StaleHandle(Handle),
    #[error("snapshot hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}
