//! Crate-wide error type.
//!
//! Most operations in this crate follow the "local recovery" policy spelled
//! out for the storage core: a stale entity, an unregistered type, or an
//! out-of-range index is reported via `Option`/`bool`, never an `Err`. An
//! upstream allocation failure is the one condition spec §7 carves out as
//! *not* locally recoverable -- it propagates as a platform failure (an
//! abort via `std::alloc::handle_alloc_error` in `chunk.rs`, the same way
//! `Vec`/`Box` do), so it never appears as a variant here. This type exists
//! for the one condition that needs a value to log, not an abort: a
//! duplicate type-hash registration.

use crate::type_registry::NameHash;

/// Errors surfaced by the storage core.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// Two distinct types hashed to the same `name_hash` and produced a
    /// different `content_hash`. The incumbent registration wins; this is
    /// reported for diagnostics, not as a blocking failure.
    #[error("type hash collision on {hash:?}: incumbent '{incumbent}' kept, '{incoming}' discarded")]
    DuplicateTypeHash {
        hash: NameHash,
        incumbent: String,
        incoming: String,
    },
}
