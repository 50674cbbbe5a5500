//! Archetype instances and their registry (spec §3 "ArchetypeInstance",
//! §4.5 "Archetype Instance Registry").
//!
//! An [`ArchetypeInstance`] is the runtime state associated with one
//! archetype inside a particular [`crate::data_store::DataStore`]: its
//! chunk list and a stable `index` assigned when it is first attached.

use std::collections::HashMap;
use std::sync::Arc;

use crate::archetype::Archetype;
use crate::chunk::ChunkList;
use crate::hive::Hive;
use crate::type_registry::NameHash;

/// Sentinel `index` meaning "not attached to any data store".
pub const NON_ARCHETYPE_INDEX: u32 = u32::MAX;

/// Runtime state for one archetype's presence in a data store: its stable
/// index and the chunk list holding its component data.
pub struct ArchetypeInstance {
    index: u32,
    archetype: Arc<Archetype>,
    chunk_list: ChunkList,
}

impl ArchetypeInstance {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn archetype(&self) -> &Arc<Archetype> {
        &self.archetype
    }

    pub fn hash(&self) -> NameHash {
        self.archetype.hash
    }

    pub fn is_non_archetype(&self) -> bool {
        self.index == NON_ARCHETYPE_INDEX
    }

    pub fn chunk_list(&self) -> &ChunkList {
        &self.chunk_list
    }

    pub fn chunk_list_mut(&mut self) -> &mut ChunkList {
        &mut self.chunk_list
    }
}

/// Holds every attached `ArchetypeInstance` in a [`Hive`] (for stable
/// indices/addresses) plus a `hash -> index` map for `attach_archetype`'s
/// idempotent lookup.
#[derive(Default)]
pub struct ArchetypeInstanceRegistry {
    instances: Hive<ArchetypeInstance>,
    by_hash: HashMap<NameHash, u32>,
}

impl ArchetypeInstanceRegistry {
    pub fn new() -> Self {
        ArchetypeInstanceRegistry {
            instances: Hive::new(),
            by_hash: HashMap::new(),
        }
    }

    /// First call for a given archetype creates and indexes the instance;
    /// later calls return the cached handle.
    pub fn attach_archetype(&mut self, archetype: &Arc<Archetype>) -> u32 {
        if let Some(&index) = self.by_hash.get(&archetype.hash) {
            return index;
        }
        let archetype = Arc::clone(archetype);
        let (index, _) = self.instances.construct_with(|idx| ArchetypeInstance {
            index: idx,
            archetype,
            chunk_list: ChunkList::new(),
        });
        self.by_hash.insert(
            self.instances.get(index).expect("just constructed").archetype.hash,
            index,
        );
        index
    }

    pub fn get_by_index(&self, index: u32) -> Option<&ArchetypeInstance> {
        self.instances.get(index)
    }

    pub fn get_by_index_mut(&mut self, index: u32) -> Option<&mut ArchetypeInstance> {
        self.instances.get_mut(index)
    }

    pub fn get_by_hash(&self, hash: NameHash) -> Option<&ArchetypeInstance> {
        let index = *self.by_hash.get(&hash)?;
        self.instances.get(index)
    }

    pub fn get_by_archetype(&self, archetype: &Archetype) -> Option<&ArchetypeInstance> {
        self.get_by_hash(archetype.hash)
    }

    pub fn detach_by_index(&mut self, index: u32) -> bool {
        let Some(instance) = self.instances.get(index) else {
            return false;
        };
        let hash = instance.archetype.hash;
        if self.instances.destruct(index) {
            self.by_hash.remove(&hash);
            true
        } else {
            false
        }
    }

    pub fn detach_by_hash(&mut self, hash: NameHash) -> bool {
        match self.by_hash.get(&hash).copied() {
            Some(index) => self.detach_by_index(index),
            None => false,
        }
    }

    pub fn detach_archetype(&mut self, archetype: &Archetype) -> bool {
        self.detach_by_hash(archetype.hash)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}
