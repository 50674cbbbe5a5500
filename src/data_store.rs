//! Archetype Data Store: maps live entities to archetype instances (spec
//! §4.5).

use std::sync::Arc;

use crate::archetype::Archetype;
use crate::archetype_registry::ArchetypeRegistry;
use crate::entity::{Entity, EntityPool};
use crate::hive::Hive;
use crate::instance::{ArchetypeInstance, ArchetypeInstanceRegistry};

/// Maps live entities to the archetype instance holding their component
/// row, and owns the chunk-linked lists (via [`ArchetypeInstanceRegistry`])
/// that back every attached archetype.
///
/// `archetype_registry` and `entity_pool` are held as shared `Arc`s rather
/// than the bare references the spec's state table names -- this crate is
/// meant to be embedded for the storage core's full lifetime, and `Arc`
/// gives the same "outlives every caller" guarantee without threading a
/// lifetime parameter through every type built on top of `DataStore`.
pub struct DataStore {
    archetype_registry: Arc<ArchetypeRegistry>,
    entity_pool: Arc<EntityPool>,
    instances: ArchetypeInstanceRegistry,
    entity_to_instance: Hive<u32>,
}

impl DataStore {
    pub fn new(archetype_registry: Arc<ArchetypeRegistry>, entity_pool: Arc<EntityPool>) -> Self {
        DataStore {
            archetype_registry,
            entity_pool,
            instances: ArchetypeInstanceRegistry::new(),
            entity_to_instance: Hive::new(),
        }
    }

    pub fn archetype_registry(&self) -> &Arc<ArchetypeRegistry> {
        &self.archetype_registry
    }

    pub fn entity_pool(&self) -> &Arc<EntityPool> {
        &self.entity_pool
    }

    pub fn instances(&self) -> &ArchetypeInstanceRegistry {
        &self.instances
    }

    /// Returns the instance index holding `entity`'s components, or `None`
    /// if the entity is dead or has no mapping yet.
    pub fn get_archetype_instance(&self, entity: Entity) -> Option<u32> {
        if !self.entity_pool.is_alive(entity) {
            return None;
        }
        self.entity_to_instance.get(entity.handle()).copied()
    }

    pub fn get_instance(&self, index: u32) -> Option<&ArchetypeInstance> {
        self.instances.get_by_index(index)
    }

    pub fn get_instance_mut(&mut self, index: u32) -> Option<&mut ArchetypeInstance> {
        self.instances.get_by_index_mut(index)
    }

    /// Idempotent: first call creates the instance (assigned a stable
    /// index); later calls return the cached handle.
    pub fn attach_archetype(&mut self, archetype: &Arc<Archetype>) -> u32 {
        self.instances.attach_archetype(archetype)
    }

    pub fn detach_archetype(&mut self, archetype: &Archetype) -> bool {
        self.instances.detach_archetype(archetype)
    }

    /// Records that `entity`'s row now lives in instance `instance`.
    /// Returns `false` without mutating anything if `entity` is dead.
    pub fn set_entity_instance(&mut self, entity: Entity, instance: u32) -> bool {
        if !self.entity_pool.is_alive(entity) {
            return false;
        }
        self.entity_to_instance.construct_at(entity.handle(), true, instance);
        true
    }

    /// Removes `entity`'s instance mapping (e.g. on despawn).
    pub fn clear_entity_instance(&mut self, entity: Entity) -> bool {
        self.entity_to_instance.destruct(entity.handle())
    }
}
