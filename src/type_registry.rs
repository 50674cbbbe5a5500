//! Runtime Type Registry: interns one [`TypeDescriptor`] per Rust type,
//! keyed by a 32-bit hash of its canonical name (spec §4.2).
//!
//! Construction is bottom-up -- a descriptor's fields must already be
//! registered before the descriptor itself is installed -- so
//! `get_or_create_type_info` recurses into each field's type before it
//! finishes building its own descriptor, exactly as the original's
//! `get_or_create_type_info<T>` walks `type_info_traits<T>`'s field list.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::EcsError;
use crate::reflect::{ComponentTag, Reflect};
use crate::vtable::ComponentVtable;

#[cfg(feature = "cooperative")]
use crate::async_lock::AsyncLock;

/// 32-bit hash of a type's canonical name; the registry's primary key.
pub type NameHash = u32;

/// FNV-1a over the UTF-8 bytes of `s`. Cheap and allocation-free, matching
/// the original's plain byte-hash used for `name_hash`/`archetype_hash`.
pub(crate) fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// One field of a [`TypeDescriptor`]: the already-registered descriptor of
/// the field's own type, plus its byte offset within the owner.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub ty: Arc<TypeDescriptor>,
    pub offset: u32,
}

/// Runtime witness of a type's layout, field structure, and component
/// classification (spec §3). Immutable once interned; holders keep an
/// `Arc` rather than a raw reference since the registry may outlive or be
/// outlived by any particular caller.
pub struct TypeDescriptor {
    pub name: &'static str,
    pub name_hash: NameHash,
    pub content_hash: u64,
    pub size: usize,
    pub alignment: usize,
    pub classification: ComponentTag,
    pub fields: Vec<FieldDescriptor>,
    pub vtable: ComponentVtable,
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("name_hash", &self.name_hash)
            .field("content_hash", &self.content_hash)
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .field("classification", &self.classification)
            .field("fields", &self.fields.len())
            .finish()
    }
}

fn content_hash(name_hash: NameHash, fields: &[FieldDescriptor]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&name_hash.to_le_bytes());
    for f in fields {
        hasher.update(&f.ty.name_hash.to_le_bytes());
        hasher.update(&f.offset.to_le_bytes());
    }
    let digest = hasher.finalize();
    u64::from_le_bytes(digest.as_bytes()[..8].try_into().unwrap())
}

struct Inner {
    by_hash: HashMap<NameHash, Arc<TypeDescriptor>>,
}

impl Inner {
    fn new() -> Self {
        Inner {
            by_hash: HashMap::new(),
        }
    }

    /// Two-phase commit: if `name_hash` is already present, the incoming
    /// descriptor is discarded and the incumbent returned (logging a
    /// warning if the content hashes disagree); otherwise the incoming
    /// descriptor is installed.
    fn register(&mut self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        if let Some(existing) = self.by_hash.get(&descriptor.name_hash) {
            if existing.content_hash != descriptor.content_hash {
                let err = EcsError::DuplicateTypeHash {
                    hash: descriptor.name_hash,
                    incumbent: existing.name.to_string(),
                    incoming: descriptor.name.to_string(),
                };
                warn!(%err, "incumbent wins");
            }
            return Arc::clone(existing);
        }
        debug!(name = descriptor.name, hash = descriptor.name_hash, "registered type");
        let arc = Arc::new(descriptor);
        self.by_hash.insert(arc.name_hash, Arc::clone(&arc));
        arc
    }
}

/// Interns [`TypeDescriptor`]s keyed by `name_hash`. The critical section
/// guarded by the lock is just the map probe/emplace; descriptor
/// construction (including recursive field resolution) happens outside it.
pub struct TypeRegistry {
    inner: Mutex<Inner>,
    #[cfg(feature = "cooperative")]
    async_inner: AsyncLock<()>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            inner: Mutex::new(Inner::new()),
            #[cfg(feature = "cooperative")]
            async_inner: AsyncLock::new(()),
        }
    }

    /// Lookup-only, thread-safe.
    pub fn get_type_info(&self, name_hash: NameHash) -> Option<Arc<TypeDescriptor>> {
        self.inner.lock().by_hash.get(&name_hash).cloned()
    }

    pub fn get_type_info_by_name(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.get_type_info(fnv1a32(name.as_bytes()))
    }

    /// Two-phase commit: installs `descriptor` if its `name_hash` is new,
    /// otherwise discards it and returns the incumbent.
    pub fn register_type_info(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        self.inner.lock().register(descriptor)
    }

    /// Probe by hash; on miss, synthesize a descriptor from `T`'s [`Reflect`]
    /// impl, recursively resolving each field's own descriptor first, then
    /// register it.
    pub fn get_or_create_type_info<T: Reflect>(&self) -> Arc<TypeDescriptor> {
        let name_hash = fnv1a32(T::TYPE_NAME.as_bytes());
        if let Some(existing) = self.get_type_info(name_hash) {
            return existing;
        }

        let mut fields = Vec::with_capacity(T::field_count());
        for i in 0..T::field_count() {
            let info = T::field_info(i);
            let field_hash = T::field_type_hash(i, self);
            let field_ty = self
                .get_type_info(field_hash)
                .expect("field_type_hash must leave the field registered");
            fields.push(FieldDescriptor {
                ty: field_ty,
                offset: info.offset as u32,
            });
        }

        let hash = content_hash(name_hash, &fields);
        let draft = TypeDescriptor {
            name: T::TYPE_NAME,
            name_hash,
            content_hash: hash,
            size: std::mem::size_of::<T>(),
            alignment: std::mem::align_of::<T>(),
            classification: T::COMPONENT_TAG,
            fields,
            vtable: T::vtable(),
        };
        self.register_type_info(draft)
    }

    #[cfg(feature = "cooperative")]
    pub async fn get_or_create_type_info_async<T: Reflect>(&self) -> Arc<TypeDescriptor> {
        // The suspension point is lock acquisition; the map mutation itself
        // is identical to the sync path once the guard is held.
        let _permit = self.async_inner.lock().await;
        self.get_or_create_type_info::<T>()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
