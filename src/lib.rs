//! Archetype-based ECS storage core: a data-oriented engine that groups
//! entities by the set of components attached to them, lays out component
//! values as columnar arrays inside fixed-size memory chunks, and exposes
//! fast structural mutation and lookup.
//!
//! Four subsystems, built bottom-up on a shared [`hive`] container:
//!
//! - [`type_registry`] interns per-type descriptors derived from a
//!   compile-time [`reflect::Reflect`] oracle.
//! - [`archetype_registry`] interns immutable [`archetype::Archetype`]
//!   descriptors and supports `include`/`exclude` set algebra over them.
//! - [`entity`] issues versioned 64-bit entity identifiers with O(1)
//!   allocate/free/liveness checks.
//! - [`data_store`] maps live entities to archetype instances and owns the
//!   chunk-linked lists ([`chunk`], [`instance`]) holding component data.
//!
//! There is no `World`/query/scheduler layer here -- this crate is the
//! storage substrate such a layer would be built on top of.
//!
//! # Quick start
//!
//! ```
//! use archetype_ecs_core::prelude::*;
//! use std::sync::Arc;
//!
//! struct Position;
//! impl Reflect for Position {
//!     const TYPE_NAME: &'static str = "demo::Position";
//!     const COMPONENT_TAG: ComponentTag = ComponentTag::Data;
//!     fn vtable() -> archetype_ecs_core::vtable::ComponentVtable {
//!         archetype_ecs_core::vtable::ComponentVtable::trivial()
//!     }
//! }
//!
//! let types = TypeRegistry::new();
//! let archetypes = Arc::new(ArchetypeRegistry::new());
//! let entities = Arc::new(EntityPool::new());
//! let mut store = DataStore::new(archetypes.clone(), entities.clone());
//!
//! let position = types.get_or_create_type_info::<Position>();
//! let archetype = archetypes.get_or_create_archetype(vec![position]).unwrap();
//! let instance = store.attach_archetype(&archetype);
//!
//! let entity = entities.allocate_entity();
//! store.set_entity_instance(entity, instance);
//! assert_eq!(store.get_archetype_instance(entity), Some(instance));
//! ```

/// Size, in bytes, of one chunk's backing allocation. Overridable only by
/// editing this constant and rebuilding (spec §6: no env/CLI surface for a
/// library's layout invariants).
pub const CHUNK_BYTES: usize = 16384;

/// Capacity of one [`hive::Hive`] group. Must stay under `2^16` so a local
/// slot index fits in `u16`.
pub const GROUP_CAP: u32 = 128;

#[allow(unsafe_code)]
pub mod archetype;
pub mod archetype_registry;
#[cfg(feature = "cooperative")]
pub mod async_lock;
#[allow(unsafe_code)]
pub mod chunk;
pub mod entity;
pub mod error;
#[allow(unsafe_code)]
pub mod hive;
pub mod instance;
pub mod reflect;
pub mod type_registry;
#[allow(unsafe_code)]
pub mod vtable;

pub mod data_store;

/// Re-exports the public surface most callers need.
pub mod prelude {
    pub use crate::archetype::{Archetype, ComponentInfo};
    pub use crate::archetype_registry::{ArchetypeRegistry, ORDER_SENTINEL};
    pub use crate::chunk::{Chunk, ChunkList, ChunkNode};
    pub use crate::data_store::DataStore;
    pub use crate::entity::{Entity, EntityPool, EntityVersionRecord, INVALID_HANDLE};
    pub use crate::error::EcsError;
    pub use crate::hive::Hive;
    pub use crate::instance::{ArchetypeInstance, ArchetypeInstanceRegistry, NON_ARCHETYPE_INDEX};
    pub use crate::reflect::{ComponentTag, FieldInfo, Reflect};
    pub use crate::type_registry::{FieldDescriptor, NameHash, TypeDescriptor, TypeRegistry};
    pub use crate::vtable::ComponentVtable;

    #[cfg(feature = "cooperative")]
    pub use crate::async_lock::AsyncLock;
}
