//! Simplex storage shared by [`Triangulation`](crate::core::triangulation::Triangulation)
//! and [`StagingTriangulation`](crate::core::staging::StagingTriangulation).
//!
//! The store owns the arena, the dense index order and the UUID lookup table.
//! Its gluing primitives are raw: they keep gluings symmetric but perform no
//! lock checks and know nothing about caches or notifications.

use uuid::Uuid;

use crate::core::collections::{StorageMap, UuidToSimplexKeyMap, fast_hash_map_with_capacity};
use crate::core::perm::Perm;
use crate::core::simplex::{Simplex, SimplexKey};
use crate::core::triangulation::TriangulationValidationError;

#[derive(Clone, Debug, Default)]
pub(crate) struct SimplexStore<const D: usize> {
    simplices: StorageMap<SimplexKey, Simplex<D>>,
    order: Vec<SimplexKey>,
    uuid_to_key: UuidToSimplexKeyMap,
}

impl<const D: usize> SimplexStore<D> {
    pub(crate) fn new() -> Self {
        Self {
            simplices: StorageMap::with_key(),
            order: Vec::new(),
            uuid_to_key: UuidToSimplexKeyMap::default(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> Option<SimplexKey> {
        self.order.get(index).copied()
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&Simplex<D>> {
        self.key(index).and_then(|key| self.simplices.get(key))
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Simplex<D>> {
        let key = self.key(index)?;
        self.simplices.get_mut(key)
    }

    #[inline]
    pub(crate) fn index_of_key(&self, key: SimplexKey) -> Option<usize> {
        self.simplices.get(key).map(Simplex::index)
    }

    pub(crate) fn index_of_uuid(&self, uuid: &Uuid) -> Option<usize> {
        self.uuid_to_key
            .get(uuid)
            .and_then(|&key| self.index_of_key(key))
    }

    pub(crate) fn iter(&self) -> impl ExactSizeIterator<Item = &Simplex<D>> + '_ {
        self.order.iter().map(|&key| &self.simplices[key])
    }

    /// The neighbour index and gluing across `facet` of simplex `index`.
    pub(crate) fn adjacent(&self, index: usize, facet: usize) -> Option<(usize, Perm)> {
        let (key, perm) = self.get(index)?.adjacent(facet)?;
        Some((self.index_of_key(key)?, perm))
    }

    // -------------------------------------------------------------------------
    // Raw mutation
    // -------------------------------------------------------------------------

    /// Appends a simplex with a fresh UUID and returns its index.
    pub(crate) fn push(&mut self, label: String) -> usize {
        self.push_with_uuid(label, Uuid::new_v4())
    }

    /// Appends a simplex with the given UUID, replacing it if it is already taken.
    pub(crate) fn push_with_uuid(&mut self, label: String, uuid: Uuid) -> usize {
        let uuid = if uuid.is_nil() || self.uuid_to_key.contains_key(&uuid) {
            let fresh = Uuid::new_v4();
            tracing::debug!(%uuid, %fresh, "simplex UUID already in use; assigning a fresh one");
            fresh
        } else {
            uuid
        };
        let index = self.order.len();
        let key = self.simplices.insert(Simplex::new(uuid, label, index));
        self.order.push(key);
        self.uuid_to_key.insert(uuid, key);
        index
    }

    /// Glues facet `facet` of `index` to facet `perm[facet]` of `adjacent`.
    ///
    /// Both facets must be unglued and the indices valid; the caller checks this.
    pub(crate) fn join(&mut self, index: usize, facet: usize, adjacent: usize, perm: Perm) {
        let (Some(key), Some(adjacent_key)) = (self.key(index), self.key(adjacent)) else {
            debug_assert!(false, "raw join on missing simplex {index} or {adjacent}");
            return;
        };
        debug_assert!(self.simplices[key].is_boundary_facet(facet));
        debug_assert!(self.simplices[adjacent_key].is_boundary_facet(perm.apply(facet)));
        self.simplices[key].set_adjacent(facet, Some((adjacent_key, perm)));
        self.simplices[adjacent_key].set_adjacent(perm.apply(facet), Some((key, perm.inverse())));
    }

    /// Removes the gluing on `facet` of `index`, returning the former neighbour's index.
    pub(crate) fn unjoin(&mut self, index: usize, facet: usize) -> Option<usize> {
        let key = self.key(index)?;
        let (adjacent_key, perm) = self.simplices[key].adjacent(facet)?;
        self.simplices[key].set_adjacent(facet, None);
        if let Some(adjacent) = self.simplices.get_mut(adjacent_key) {
            adjacent.set_adjacent(perm.apply(facet), None);
        }
        self.index_of_key(adjacent_key)
    }

    /// Unglues every facet of `index`.
    pub(crate) fn isolate(&mut self, index: usize) {
        for facet in 0..=D {
            self.unjoin(index, facet);
        }
    }

    /// Isolates and deletes the simplex at `index`, shifting later indices down.
    pub(crate) fn remove(&mut self, index: usize) {
        if index >= self.order.len() {
            return;
        }
        self.isolate(index);
        let key = self.order.remove(index);
        if let Some(simplex) = self.simplices.remove(key) {
            self.uuid_to_key.remove(&simplex.uuid());
        }
        self.reindex_from(index);
    }

    /// Deletes every simplex whose index is flagged, reindexing once.
    pub(crate) fn remove_flagged(&mut self, flagged: &[bool]) {
        for (index, _) in flagged.iter().enumerate().filter(|&(_, &f)| f) {
            self.isolate(index);
        }
        let mut kept = Vec::with_capacity(self.order.len());
        for (index, &key) in self.order.iter().enumerate() {
            if flagged.get(index).copied().unwrap_or(false) {
                if let Some(simplex) = self.simplices.remove(key) {
                    self.uuid_to_key.remove(&simplex.uuid());
                }
            } else {
                kept.push(key);
            }
        }
        self.order = kept;
        self.reindex_from(0);
    }

    pub(crate) fn clear(&mut self) {
        self.simplices.clear();
        self.order.clear();
        self.uuid_to_key.clear();
    }

    /// Moves every simplex of `other` to the end of this store, keeping labels,
    /// UUIDs, gluings and locks. Returns the index of the first moved simplex.
    pub(crate) fn append(&mut self, mut other: Self) -> usize {
        let offset = self.len();
        let moved: Vec<Simplex<D>> = other
            .order
            .iter()
            .filter_map(|&key| other.simplices.remove(key))
            .collect();
        let old_keys = other.order;
        for simplex in &moved {
            let index = self.push_with_uuid(simplex.label().to_string(), simplex.uuid());
            if let Some(new) = self.get_mut(index) {
                new.set_locks(simplex.locks());
            }
        }
        let mut key_map = fast_hash_map_with_capacity(old_keys.len());
        for (i, &key) in old_keys.iter().enumerate() {
            key_map.insert(key, offset + i);
        }
        for (i, simplex) in moved.iter().enumerate() {
            for (facet, old_key, perm) in simplex.gluings() {
                let Some(&target) = key_map.get(&old_key) else {
                    continue;
                };
                let Some(target_key) = self.key(target) else {
                    continue;
                };
                if let Some(new) = self.get_mut(offset + i) {
                    new.set_adjacent(facet, Some((target_key, perm)));
                }
            }
        }
        offset
    }

    fn reindex_from(&mut self, start: usize) {
        for (index, &key) in self.order.iter().enumerate().skip(start) {
            self.simplices[key].set_index(index);
        }
    }

    // -------------------------------------------------------------------------
    // Consistency
    // -------------------------------------------------------------------------

    /// Checks index density, UUID bookkeeping and gluing symmetry.
    pub(crate) fn validate(&self) -> Result<(), TriangulationValidationError> {
        if self.order.len() != self.simplices.len() || self.uuid_to_key.len() != self.order.len()
        {
            return Err(TriangulationValidationError::MappingInconsistency {
                message: format!(
                    "{} indexed simplices, {} stored, {} UUID entries",
                    self.order.len(),
                    self.simplices.len(),
                    self.uuid_to_key.len()
                ),
            });
        }
        for (index, &key) in self.order.iter().enumerate() {
            let Some(simplex) = self.simplices.get(key) else {
                return Err(TriangulationValidationError::MappingInconsistency {
                    message: format!("index {index} refers to a missing simplex"),
                });
            };
            if simplex.index() != index {
                return Err(TriangulationValidationError::IndexMismatch {
                    position: index,
                    recorded: simplex.index(),
                });
            }
            if self.uuid_to_key.get(&simplex.uuid()) != Some(&key) {
                return Err(TriangulationValidationError::MappingInconsistency {
                    message: format!("UUID {} of simplex {index} is not mapped back", simplex.uuid()),
                });
            }
            for (facet, adjacent_key, perm) in simplex.gluings() {
                if perm.len() != D + 1 {
                    return Err(TriangulationValidationError::BadPermutationSize {
                        simplex: index,
                        facet,
                        found: perm.len(),
                    });
                }
                let back = self
                    .simplices
                    .get(adjacent_key)
                    .and_then(|adjacent| adjacent.adjacent(perm.apply(facet)));
                if adjacent_key == key && perm.apply(facet) == facet {
                    return Err(TriangulationValidationError::AsymmetricGluing {
                        simplex: index,
                        facet,
                    });
                }
                if back != Some((key, perm.inverse())) {
                    return Err(TriangulationValidationError::AsymmetricGluing {
                        simplex: index,
                        facet,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_symmetric_and_remove_reindexes() {
        let mut store: SimplexStore<2> = SimplexStore::new();
        for _ in 0..3 {
            store.push(String::new());
        }
        let g = Perm::from_images(&[1, 2, 0]).unwrap();
        store.join(0, 1, 2, g);
        assert_eq!(store.adjacent(0, 1), Some((2, g)));
        assert_eq!(store.adjacent(2, g.apply(1)), Some((0, g.inverse())));
        assert!(store.validate().is_ok());

        store.remove(1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.adjacent(0, 1), Some((1, g)));
        assert_eq!(store.get(1).map(Simplex::index), Some(1));
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_remove_flagged_and_append_preserve_uuids() {
        let mut store: SimplexStore<3> = SimplexStore::new();
        for _ in 0..4 {
            store.push(String::new());
        }
        store.join(0, 0, 3, Perm::identity(4));
        let uuid3 = store.get(3).map(Simplex::uuid);
        store.remove_flagged(&[false, true, true, false]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).map(Simplex::uuid), uuid3);
        assert_eq!(store.adjacent(0, 0), Some((1, Perm::identity(4))));

        let mut target: SimplexStore<3> = SimplexStore::new();
        target.push("existing".to_string());
        let offset = target.append(store);
        assert_eq!(offset, 1);
        assert_eq!(target.len(), 3);
        assert_eq!(target.get(2).map(Simplex::uuid), uuid3);
        assert_eq!(target.adjacent(1, 0), Some((2, Perm::identity(4))));
        assert!(target.validate().is_ok());
    }
}
