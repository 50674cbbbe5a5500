//! Runtime Archetype Registry: interns [`Archetype`]s by the hash of their
//! sorted component set, and implements the `include`/`exclude`
//! set-algebra operations over them (spec §4.3).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::archetype::Archetype;
use crate::reflect::ComponentTag;
use crate::type_registry::{fnv1a32, NameHash, TypeDescriptor};

#[cfg(feature = "cooperative")]
use crate::async_lock::AsyncLock;

/// Sentinel returned in `include`'s `orders` array for input components
/// already present in the source archetype.
pub const ORDER_SENTINEL: u32 = u32::MAX;

type Table = Mutex<HashMap<NameHash, Weak<Archetype>>>;

fn hash_sorted_components(components: &[Arc<TypeDescriptor>]) -> NameHash {
    let mut bytes = Vec::with_capacity(components.len() * 4);
    for c in components {
        bytes.extend_from_slice(&c.name_hash.to_le_bytes());
    }
    fnv1a32(&bytes)
}

/// Interns archetypes by component-set hash, holding them via weak links
/// so external `Arc<Archetype>` holders control lifetime -- on last strong
/// drop, `Archetype`'s own `Drop` unregisters it from this table.
pub struct ArchetypeRegistry {
    table: Arc<Table>,
    #[cfg(feature = "cooperative")]
    async_inner: AsyncLock<()>,
}

impl Default for ArchetypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchetypeRegistry {
    pub fn new() -> Self {
        ArchetypeRegistry {
            table: Arc::new(Mutex::new(HashMap::new())),
            #[cfg(feature = "cooperative")]
            async_inner: AsyncLock::new(()),
        }
    }

    pub fn get_archetype(&self, hash: NameHash) -> Option<Arc<Archetype>> {
        self.table.lock().get(&hash).and_then(Weak::upgrade)
    }

    /// Normalizes `types` (stable sort + dedup by `name_hash`), rejects an
    /// empty set or one containing a non-component type, and interns the
    /// result.
    pub fn get_or_create_archetype(&self, types: Vec<Arc<TypeDescriptor>>) -> Option<Arc<Archetype>> {
        if types.is_empty() {
            return None;
        }
        if types.iter().any(|t| t.classification == ComponentTag::None) {
            return None;
        }
        let mut sorted = types;
        sorted.sort_by_key(|t| t.name_hash);
        sorted.dedup_by_key(|t| t.name_hash);

        let hash = hash_sorted_components(&sorted);
        if let Some(existing) = self.get_archetype(hash) {
            return Some(existing);
        }

        let draft = Archetype::new(hash, sorted, Arc::downgrade(&self.table))?;
        let arc = Arc::new(draft);
        arc.mark_registered();

        let mut map = self.table.lock();
        if let Some(existing) = map.get(&hash).and_then(Weak::upgrade) {
            // Lost the race: another caller committed first.
            return Some(existing);
        }
        debug!(hash, components = arc.len(), "registered archetype");
        map.insert(hash, Arc::downgrade(&arc));
        Some(arc)
    }

    /// Returns the archetype whose component set is `archetype`'s union
    /// with `types`, plus `orders[i]` giving the destination index of
    /// input `types[i]` in the new archetype (or [`ORDER_SENTINEL`] if it
    /// was already present). Built by an O(n+m) merge of the two
    /// pre-sorted sequences.
    pub fn include(
        &self,
        archetype: &Arc<Archetype>,
        types: Vec<Arc<TypeDescriptor>>,
    ) -> Option<(Arc<Archetype>, Vec<u32>)> {
        let mut indexed: Vec<(usize, Arc<TypeDescriptor>)> = types.into_iter().enumerate().collect();
        indexed.sort_by_key(|(_, t)| t.name_hash);

        let mut orders = vec![ORDER_SENTINEL; indexed.len()];
        let mut merged: Vec<Arc<TypeDescriptor>> =
            Vec::with_capacity(archetype.components.len() + indexed.len());

        let mut ai = 0usize;
        let mut ii = 0usize;
        loop {
            let a = archetype.components.get(ai);
            match (a, indexed.get(ii)) {
                (Some(a), Some((orig_idx, t))) => {
                    if a.name_hash < t.name_hash {
                        merged.push(Arc::clone(a));
                        ai += 1;
                    } else if a.name_hash > t.name_hash {
                        orders[*orig_idx] = merged.len() as u32;
                        merged.push(Arc::clone(t));
                        ii += 1;
                    } else {
                        orders[*orig_idx] = ORDER_SENTINEL;
                        merged.push(Arc::clone(a));
                        ai += 1;
                        ii += 1;
                    }
                }
                (Some(a), None) => {
                    merged.push(Arc::clone(a));
                    ai += 1;
                }
                (None, Some((orig_idx, t))) => {
                    orders[*orig_idx] = merged.len() as u32;
                    merged.push(Arc::clone(t));
                    ii += 1;
                }
                (None, None) => break,
            }
        }

        let new_archetype = self.get_or_create_archetype(merged)?;
        Some((new_archetype, orders))
    }

    /// Returns the archetype of the set difference `archetype - types`,
    /// computed by an O(n+m) sorted `set_difference`.
    pub fn exclude(&self, archetype: &Arc<Archetype>, types: &[Arc<TypeDescriptor>]) -> Option<Arc<Archetype>> {
        let mut exclude_hashes: Vec<NameHash> = types.iter().map(|t| t.name_hash).collect();
        exclude_hashes.sort_unstable();
        exclude_hashes.dedup();

        let mut remaining = Vec::with_capacity(archetype.components.len());
        let mut ei = 0usize;
        for c in &archetype.components {
            while ei < exclude_hashes.len() && exclude_hashes[ei] < c.name_hash {
                ei += 1;
            }
            if ei < exclude_hashes.len() && exclude_hashes[ei] == c.name_hash {
                ei += 1;
                continue;
            }
            remaining.push(Arc::clone(c));
        }
        self.get_or_create_archetype(remaining)
    }

    #[cfg(feature = "cooperative")]
    pub async fn get_or_create_archetype_async(
        &self,
        types: Vec<Arc<TypeDescriptor>>,
    ) -> Option<Arc<Archetype>> {
        let _permit = self.async_inner.lock().await;
        self.get_or_create_archetype(types)
    }
}
