//! Archetype descriptor and the chunk-layout solver (spec §3, §4.3).
//!
//! An [`Archetype`] is an immutable, interned, sorted set of component
//! types plus the per-component chunk offsets and capacity computed for
//! them. It never owns component data itself -- that lives in the chunks
//! an `ArchetypeInstance` allocates against this layout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::type_registry::{NameHash, TypeDescriptor};
use crate::CHUNK_BYTES;

/// Bytes reserved at the front of every chunk before the first component
/// column. Kept as a plain constant rather than `size_of::<SomeHeader>()`
/// since this crate does not define a chunk header type of its own -- the
/// embedding engine's is opaque to the storage core.
pub const CHUNK_HEADER_SIZE: usize = 64;

/// Per-component placement inside an archetype's chunks.
#[derive(Debug, Clone, Copy)]
pub struct ComponentInfo {
    pub index_in_archetype: u32,
    pub offset_in_chunk: u32,
}

fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Computes `(total_bytes, per_component_offsets)` for `capacity` entities
/// laid out back to back, each column aligned to its component's
/// alignment, per spec §4.3's recurrence.
fn compute_offsets(components: &[Arc<TypeDescriptor>], capacity: usize) -> (usize, Vec<u32>) {
    let mut offsets = Vec::with_capacity(components.len());
    let mut offset = align_up(CHUNK_HEADER_SIZE, components[0].alignment);
    offsets.push(offset as u32);
    for i in 1..components.len() {
        offset = align_up(offset + components[i - 1].size * capacity, components[i].alignment);
        offsets.push(offset as u32);
    }
    let total = offset + components[components.len() - 1].size * capacity;
    (total, offsets)
}

/// Solves for the largest `capacity` such that the laid-out chunk fits in
/// `CHUNK_BYTES`, returning `(capacity, offsets)`. Returns `None` if even
/// `capacity = 1` does not fit (`ArchetypeTooLarge`).
pub fn solve_layout(components: &[Arc<TypeDescriptor>]) -> Option<(u32, Vec<u32>)> {
    let total_size: usize = components.iter().map(|c| c.size).sum();
    if total_size == 0 || CHUNK_BYTES <= CHUNK_HEADER_SIZE {
        return None;
    }
    let mut capacity = (CHUNK_BYTES - CHUNK_HEADER_SIZE) / total_size + 1;
    loop {
        if capacity == 0 {
            return None;
        }
        let (total, offsets) = compute_offsets(components, capacity);
        if total <= CHUNK_BYTES {
            return Some((capacity as u32, offsets));
        }
        capacity -= 1;
    }
}

/// An immutable, interned set of component types plus their computed
/// chunk layout. `components` is always sorted ascending by `name_hash`
/// and deduplicated.
pub struct Archetype {
    pub hash: NameHash,
    pub components: Vec<Arc<TypeDescriptor>>,
    pub component_infos: Vec<ComponentInfo>,
    pub capacity_in_chunk: u32,
    registered: AtomicBool,
    // Weak link back to the owning registry's table, so `Drop` can
    // unregister itself without the registry holding a strong reference
    // that would keep this archetype alive forever.
    pub(crate) registry_table: Weak<Mutex<std::collections::HashMap<NameHash, Weak<Archetype>>>>,
}

impl Archetype {
    pub(crate) fn new(
        hash: NameHash,
        components: Vec<Arc<TypeDescriptor>>,
        registry_table: Weak<Mutex<std::collections::HashMap<NameHash, Weak<Archetype>>>>,
    ) -> Option<Self> {
        let (capacity, offsets) = solve_layout(&components)?;
        let component_infos = offsets
            .into_iter()
            .enumerate()
            .map(|(i, offset)| ComponentInfo {
                index_in_archetype: i as u32,
                offset_in_chunk: offset,
            })
            .collect();
        Some(Archetype {
            hash,
            components,
            component_infos,
            capacity_in_chunk: capacity,
            registered: AtomicBool::new(false),
            registry_table,
        })
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub(crate) fn mark_registered(&self) {
        self.registered.store(true, Ordering::Release);
    }

    /// Position of `name_hash` in `components`, if present.
    pub fn column_index(&self, name_hash: NameHash) -> Option<usize> {
        self.components
            .binary_search_by_key(&name_hash, |c| c.name_hash)
            .ok()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Drop for Archetype {
    fn drop(&mut self) {
        if let Some(table) = self.registry_table.upgrade() {
            let mut map = table.lock();
            if let Some(weak) = map.get(&self.hash) {
                if weak.strong_count() == 0 {
                    map.remove(&self.hash);
                }
            }
        }
    }
}
