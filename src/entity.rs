//! Entity identifiers and the Entity Pool that issues them (spec §4.4).
//!
//! An [`Entity`] is a packed 64-bit `{handle, version}` pair: the handle
//! names a slot in the pool, the version disambiguates reuse of that slot
//! after its previous occupant was deallocated. The representation is not
//! a stable wire format -- callers only ever go through the accessors.

use parking_lot::Mutex;
use tracing::debug;

use crate::hive::Hive;

#[cfg(feature = "cooperative")]
use crate::async_lock::AsyncLock;

/// Handle value reserved to mean "no entity".
pub const INVALID_HANDLE: u32 = u32::MAX;

/// A versioned 64-bit entity identifier: `{handle: u32, version: u32}`
/// packed into one `u64`. Two entities compare equal iff both fields
/// match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u64);

impl Entity {
    pub fn new(handle: u32, version: u32) -> Self {
        Entity(((handle as u64) << 32) | version as u64)
    }

    /// The canonical invalid entity: handle `0xFFFFFFFF`, version `0`.
    pub const fn invalid() -> Self {
        Entity((INVALID_HANDLE as u64) << 32)
    }

    pub fn handle(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn version(self) -> u32 {
        self.0 as u32
    }

    pub fn is_valid(self) -> bool {
        self.handle() != INVALID_HANDLE
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::invalid()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.handle(), self.version())
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.handle(), self.version())
    }
}

/// The record stored per handle in the pool: the version currently live at
/// that slot. Kept minimal -- the spec reserves a second `u32` for future
/// generation/tag fields, which this crate leaves unused.
#[derive(Clone, Copy, Debug)]
pub struct EntityVersionRecord {
    pub version: u32,
}

struct Inner {
    pool: Hive<EntityVersionRecord>,
    // Persists across deallocate/reallocate cycles so a freed handle's
    // next occupant always gets a strictly greater version, even though
    // the hive slot itself is fully destructed in between.
    next_version: Vec<u32>,
}

impl Inner {
    fn new() -> Self {
        Inner {
            pool: Hive::new(),
            next_version: Vec::new(),
        }
    }

    fn next_version_at(&mut self, handle: u32) -> &mut u32 {
        let idx = handle as usize;
        if self.next_version.len() <= idx {
            self.next_version.resize(idx + 1, 0);
        }
        &mut self.next_version[idx]
    }

    fn allocate(&mut self) -> Entity {
        let next_version = &mut self.next_version;
        let (handle, ptr) = self.pool.construct_with(|h| {
            let idx = h as usize;
            if next_version.len() <= idx {
                next_version.resize(idx + 1, 0);
            }
            let version = next_version[idx];
            next_version[idx] = version.wrapping_add(1);
            EntityVersionRecord { version }
        });
        let version = unsafe { (*ptr).version };
        debug!(handle, version, "allocated entity");
        Entity::new(handle, version)
    }

    fn deallocate(&mut self, entity: Entity) -> bool {
        let handle = entity.handle();
        let matches = self
            .pool
            .get(handle)
            .is_some_and(|r| r.version == entity.version());
        if matches {
            self.pool.destruct(handle);
            debug!(handle, version = entity.version(), "deallocated entity");
        }
        matches
    }

    fn is_alive(&self, entity: Entity) -> bool {
        self.pool
            .get(entity.handle())
            .is_some_and(|r| r.version == entity.version())
    }

    fn restore(&mut self, handle: u32) -> Entity {
        let version = *self.next_version_at(handle);
        let (ptr, created) = self
            .pool
            .construct_at_with(handle, false, || EntityVersionRecord { version });
        if created {
            // Mirrors `allocate`'s post-increment: a freshly-constructed
            // record must not hand out this version again on reuse.
            *self.next_version_at(handle) = version.wrapping_add(1);
        }
        let version = unsafe { (*ptr).version };
        Entity::new(handle, version)
    }
}

/// Issues versioned entity identifiers with O(1) allocate/free/liveness
/// checks, backed by a [`Hive`] of [`EntityVersionRecord`]s. All four
/// operations take a single pool-wide lock; the critical section is just
/// the underlying slot mutation.
pub struct EntityPool {
    inner: Mutex<Inner>,
    #[cfg(feature = "cooperative")]
    async_inner: AsyncLock<()>,
}

impl Default for EntityPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityPool {
    pub fn new() -> Self {
        EntityPool {
            inner: Mutex::new(Inner::new()),
            #[cfg(feature = "cooperative")]
            async_inner: AsyncLock::new(()),
        }
    }

    /// Claims a vacant slot and returns a fresh `Entity` whose version is
    /// strictly greater than any previously issued for that handle.
    pub fn allocate_entity(&self) -> Entity {
        self.inner.lock().allocate()
    }

    /// No-ops (returns `false`) if `entity` is stale -- i.e. some other
    /// entity currently occupies its handle.
    pub fn deallocate_entity(&self, entity: Entity) -> bool {
        self.inner.lock().deallocate(entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.inner.lock().is_alive(entity)
    }

    /// Deterministically reconstructs the entity living at `handle`: if the
    /// slot is already live, returns it unchanged (no version consumed);
    /// otherwise constructs a fresh record, advancing the handle's version
    /// counter exactly as `allocate_entity` would, so a later
    /// deallocate/allocate cycle on this handle can never reissue the
    /// version just handed back here.
    pub fn restore_entity(&self, handle: u32) -> Entity {
        self.inner.lock().restore(handle)
    }

    #[cfg(feature = "cooperative")]
    pub async fn allocate_entity_async(&self) -> Entity {
        let _permit = self.async_inner.lock().await;
        self.inner.lock().allocate()
    }

    #[cfg(feature = "cooperative")]
    pub async fn deallocate_entity_async(&self, entity: Entity) -> bool {
        let _permit = self.async_inner.lock().await;
        self.inner.lock().deallocate(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_alive_then_dead_after_deallocate() {
        let pool = EntityPool::new();
        let e = pool.allocate_entity();
        assert!(pool.is_alive(e));
        assert!(pool.deallocate_entity(e));
        assert!(!pool.is_alive(e));
    }

    #[test]
    fn stale_deallocate_is_noop() {
        let pool = EntityPool::new();
        let e = pool.allocate_entity();
        pool.deallocate_entity(e);
        let e2 = pool.allocate_entity();
        assert_eq!(e2.handle(), e.handle());
        assert!(!pool.deallocate_entity(e));
        assert!(pool.is_alive(e2));
    }

    #[test]
    fn reuse_strictly_increases_version() {
        let pool = EntityPool::new();
        let e = pool.allocate_entity();
        pool.deallocate_entity(e);
        let e2 = pool.allocate_entity();
        assert_eq!(e2.handle(), e.handle());
        assert!(e2.version() > e.version());
    }

    #[test]
    fn entity_versioning_scenario() {
        // Scenario (c): allocate ten, deallocate #4 (index), allocate once
        // more -- the new entity reuses handle 4 with version+1.
        let pool = EntityPool::new();
        let entities: Vec<Entity> = (0..10).map(|_| pool.allocate_entity()).collect();
        let freed = entities[4];
        assert!(pool.deallocate_entity(freed));
        let reused = pool.allocate_entity();
        assert_eq!(reused.handle(), freed.handle());
        assert_eq!(reused.version(), freed.version() + 1);
    }

    #[test]
    fn restore_entity_recreates_on_vacant_handle() {
        let pool = EntityPool::new();
        let e = pool.allocate_entity();
        pool.deallocate_entity(e);
        let restored = pool.restore_entity(e.handle());
        assert_eq!(restored.handle(), e.handle());
        assert!(pool.is_alive(restored));
    }

    #[test]
    fn restore_entity_on_live_handle_is_idempotent() {
        let pool = EntityPool::new();
        let e = pool.allocate_entity();
        let restored = pool.restore_entity(e.handle());
        assert_eq!(restored, e);
    }

    #[test]
    fn restore_then_reallocate_never_reissues_a_dead_version() {
        // A restored-then-deallocated entity must never compare equal to
        // (or pass is_alive for) whatever later occupies its handle.
        let pool = EntityPool::new();
        let e = pool.allocate_entity();
        pool.deallocate_entity(e);

        let restored = pool.restore_entity(e.handle());
        pool.deallocate_entity(restored);

        let reallocated = pool.allocate_entity();
        assert_eq!(reallocated.handle(), restored.handle());
        assert!(reallocated.version() > restored.version());
        assert!(!pool.is_alive(restored));
        assert_ne!(reallocated, restored);
    }

    #[test]
    fn invalid_entity_is_never_alive() {
        let pool = EntityPool::new();
        assert!(!pool.is_alive(Entity::invalid()));
        assert!(!Entity::invalid().is_valid());
    }
}
