//! Pool-of-Slots ("hive"): a slab arena of fixed-capacity groups, each
//! threading its vacant slots into a free list, giving O(1) allocate/free
//! and addresses stable for the value's whole lifetime (spec §4.1).
//!
//! This underlies the entity-version table and the archetype-instance
//! table. Grouping bounds the cost of growth (append a group, never
//! reallocate an existing one) the same way the original's `hive_group`
//! array-of-groups does, just expressed with an enum slot instead of a
//! raw byte union plus a separate occupancy bitset.

use crate::GROUP_CAP;

const SENTINEL: u16 = u16::MAX;

const _: () = assert!(GROUP_CAP < 65536, "GROUP_CAP must fit in 16 bits");
const _: () = assert!(GROUP_CAP > 0, "GROUP_CAP must be nonzero");

enum Slot<T> {
    Occupied(T),
    Vacant { next: u16, prev: u16 },
}

/// One fixed-capacity slab. Allocated once at `GROUP_CAP` length and never
/// resized, so a `&T`/`*mut T` handed out by `construct`/`construct_at`
/// stays valid until the slot is destructed, even as sibling groups are
/// appended to the owning [`Hive`].
struct HiveGroup<T> {
    slots: Box<[Slot<T>]>,
    first_available: u16,
    available_count: u16,
}

impl<T> HiveGroup<T> {
    fn new() -> Self {
        let cap = GROUP_CAP as usize;
        let mut slots = Vec::with_capacity(cap);
        for i in 0..cap {
            let prev = if i == 0 { SENTINEL } else { (i - 1) as u16 };
            let next = if i + 1 == cap { SENTINEL } else { (i + 1) as u16 };
            slots.push(Slot::Vacant { next, prev });
        }
        HiveGroup {
            slots: slots.into_boxed_slice(),
            first_available: 0,
            available_count: GROUP_CAP as u16,
        }
    }

    /// Remove `index` from wherever it sits in the free list. `index` must
    /// currently be `Slot::Vacant`.
    fn unlink(&mut self, index: u16) -> (u16, u16) {
        let (next, prev) = match self.slots[index as usize] {
            Slot::Vacant { next, prev } => (next, prev),
            Slot::Occupied(_) => unreachable!("unlink called on an occupied slot"),
        };
        if prev != SENTINEL {
            if let Slot::Vacant { next: n, .. } = &mut self.slots[prev as usize] {
                *n = next;
            }
        } else {
            self.first_available = next;
        }
        if next != SENTINEL {
            if let Slot::Vacant { prev: p, .. } = &mut self.slots[next as usize] {
                *p = prev;
            }
        }
        self.available_count -= 1;
        (next, prev)
    }

    fn push_free(&mut self, index: u16) {
        let old_head = self.first_available;
        if old_head != SENTINEL {
            if let Slot::Vacant { prev, .. } = &mut self.slots[old_head as usize] {
                *prev = index;
            }
        }
        self.slots[index as usize] = Slot::Vacant {
            next: old_head,
            prev: SENTINEL,
        };
        self.first_available = index;
        self.available_count += 1;
    }

    fn construct(&mut self, value: T) -> Option<(u16, *mut T)> {
        if self.available_count == 0 {
            return None;
        }
        let index = self.first_available;
        self.unlink(index);
        self.slots[index as usize] = Slot::Occupied(value);
        Some((index, self.ptr_at(index)))
    }

    /// Returns `(ptr, true)` if this call actually constructed a value,
    /// `(existing_ptr, false)` if `overwrite` was false and the slot was
    /// already live.
    fn construct_at(&mut self, index: u16, overwrite: bool, value: T) -> (*mut T, bool) {
        match &self.slots[index as usize] {
            Slot::Occupied(_) if !overwrite => (self.ptr_at(index), false),
            Slot::Occupied(_) => {
                self.slots[index as usize] = Slot::Occupied(value);
                (self.ptr_at(index), true)
            }
            Slot::Vacant { .. } => {
                self.unlink(index);
                self.slots[index as usize] = Slot::Occupied(value);
                (self.ptr_at(index), true)
            }
        }
    }

    fn destruct(&mut self, index: u16) -> bool {
        match &self.slots[index as usize] {
            Slot::Occupied(_) => {
                self.push_free(index);
                true
            }
            Slot::Vacant { .. } => false,
        }
    }

    fn ptr_at(&mut self, index: u16) -> *mut T {
        match &mut self.slots[index as usize] {
            Slot::Occupied(v) => v as *mut T,
            Slot::Vacant { .. } => unreachable!("ptr_at called on a vacant slot"),
        }
    }

    fn get(&self, index: u16) -> Option<&T> {
        match &self.slots[index as usize] {
            Slot::Occupied(v) => Some(v),
            Slot::Vacant { .. } => None,
        }
    }

    fn get_mut(&mut self, index: u16) -> Option<&mut T> {
        match &mut self.slots[index as usize] {
            Slot::Occupied(v) => Some(v),
            Slot::Vacant { .. } => None,
        }
    }
}

/// A growable chain of [`HiveGroup`]s. `global_index = group_idx * GROUP_CAP
/// + local_idx` identifies a slot for the lifetime of its occupant.
pub struct Hive<T> {
    groups: Vec<HiveGroup<T>>,
}

impl<T> Default for Hive<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Hive<T> {
    pub fn new() -> Self {
        Hive { groups: Vec::new() }
    }

    fn split(index: u32) -> (usize, u16) {
        (
            (index / GROUP_CAP) as usize,
            (index % GROUP_CAP) as u16,
        )
    }

    /// Finds the first group with a free slot (appending one if none has
    /// room), constructs `value` there, and returns its stable global
    /// index plus a pointer to the constructed value.
    pub fn construct(&mut self, value: T) -> (u32, *mut T) {
        self.construct_with(|_| value)
    }

    /// Like [`Hive::construct`], but builds the value from a closure that
    /// learns the slot's global index before constructing -- needed when
    /// the value embeds its own index (entity version counters,
    /// `ArchetypeInstance::index`).
    pub fn construct_with(&mut self, f: impl FnOnce(u32) -> T) -> (u32, *mut T) {
        for (gi, group) in self.groups.iter_mut().enumerate() {
            if group.available_count > 0 {
                let global = gi as u32 * GROUP_CAP + group.first_available as u32;
                let (li, ptr) = group.construct(f(global)).expect("checked available_count");
                debug_assert_eq!(li as u32, global % GROUP_CAP);
                return (global, ptr);
            }
        }
        let gi = self.groups.len();
        let mut group = HiveGroup::new();
        let global = gi as u32 * GROUP_CAP;
        let (li, ptr) = group.construct(f(global)).expect("fresh group always has room");
        self.groups.push(group);
        (gi as u32 * GROUP_CAP + li as u32, ptr)
    }

    /// Construct (or, with `overwrite`, re-construct) directly at
    /// `global_index`, growing the group chain as needed so the index is
    /// always reachable.
    pub fn construct_at(&mut self, global_index: u32, overwrite: bool, value: T) -> (*mut T, bool) {
        self.construct_at_with(global_index, overwrite, || value)
    }

    /// Like [`Hive::construct_at`], but only invokes `f` if a value is
    /// actually going to be constructed (i.e. not when `overwrite=false`
    /// and the slot is already live).
    pub fn construct_at_with(
        &mut self,
        global_index: u32,
        overwrite: bool,
        f: impl FnOnce() -> T,
    ) -> (*mut T, bool) {
        let (gi, li) = Self::split(global_index);
        while self.groups.len() <= gi {
            self.groups.push(HiveGroup::new());
        }
        let group = &mut self.groups[gi];
        if !overwrite {
            if let Some(existing) = group.get_mut(li) {
                return (existing as *mut T, false);
            }
        }
        group.construct_at(li, overwrite, f())
    }

    /// Destroys the value at `global_index` and returns it to the free
    /// list. No-op (returns `false`) if the index is out of range or
    /// already vacant.
    pub fn destruct(&mut self, global_index: u32) -> bool {
        let (gi, li) = Self::split(global_index);
        match self.groups.get_mut(gi) {
            Some(group) => group.destruct(li),
            None => false,
        }
    }

    pub fn get(&self, global_index: u32) -> Option<&T> {
        let (gi, li) = Self::split(global_index);
        self.groups.get(gi).and_then(|g| g.get(li))
    }

    pub fn get_mut(&mut self, global_index: u32) -> Option<&mut T> {
        let (gi, li) = Self::split(global_index);
        self.groups.get_mut(gi).and_then(|g| g.get_mut(li))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_get_destruct_roundtrip() {
        let mut hive: Hive<u64> = Hive::new();
        let (idx, _) = hive.construct(42);
        assert_eq!(*hive.get(idx).unwrap(), 42);
        assert!(hive.destruct(idx));
        assert!(hive.get(idx).is_none());
        assert!(!hive.destruct(idx));
    }

    #[test]
    fn addresses_stable_across_sibling_construct_destruct() {
        let mut hive: Hive<u64> = Hive::new();
        let (idx_a, ptr_a) = hive.construct(1);
        let (idx_b, _) = hive.construct(2);
        assert!(hive.destruct(idx_b));
        let (_, ptr_a2) = (idx_a, hive.get(idx_a).unwrap() as *const u64);
        assert_eq!(ptr_a as *const u64, ptr_a2);
        assert_eq!(*hive.get(idx_a).unwrap(), 1);
    }

    #[test]
    fn grows_across_multiple_groups() {
        let mut hive: Hive<u32> = Hive::new();
        let total = GROUP_CAP * 2 + 5;
        let mut indices = Vec::new();
        for i in 0..total {
            let (idx, _) = hive.construct(i);
            indices.push(idx);
        }
        assert_eq!(hive.group_count(), 3);
        for (i, idx) in indices.iter().enumerate() {
            assert_eq!(*hive.get(*idx).unwrap(), i as u32);
        }
    }

    #[test]
    fn construct_at_grows_groups_to_reach_index() {
        let mut hive: Hive<u32> = Hive::new();
        let target = GROUP_CAP * 2 + 3;
        let (ptr, created) = hive.construct_at(target, false, 99);
        assert!(created);
        assert_eq!(unsafe { *ptr }, 99);
        assert_eq!(*hive.get(target).unwrap(), 99);
    }

    #[test]
    fn construct_at_overwrite_semantics() {
        let mut hive: Hive<u32> = Hive::new();
        let (idx, _) = hive.construct(1);
        let (_, created) = hive.construct_at(idx, false, 2);
        assert!(!created);
        assert_eq!(*hive.get(idx).unwrap(), 1);
        let (_, created) = hive.construct_at(idx, true, 2);
        assert!(created);
        assert_eq!(*hive.get(idx).unwrap(), 2);
    }

    #[test]
    fn pool_address_stability_scenario() {
        // Scenario (d): 200 entries across two groups, free every other
        // even index, allocate 50 more; every surviving pointer still
        // dereferences to its original value.
        let mut hive: Hive<u64> = Hive::new();
        let mut indices = Vec::new();
        for i in 0..200u64 {
            let (idx, _) = hive.construct(i);
            indices.push(idx);
        }
        let mut freed = vec![false; indices.len()];
        for i in (0..indices.len()).step_by(4) {
            assert!(hive.destruct(indices[i]));
            freed[i] = true;
        }
        for i in 0..50u64 {
            hive.construct(10_000 + i);
        }
        for (i, idx) in indices.iter().enumerate() {
            if !freed[i] {
                assert_eq!(*hive.get(*idx).unwrap(), i as u64);
            }
        }
    }
}
