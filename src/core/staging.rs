//! A scratch triangulation for building results before publishing them.
//!
//! Surgery and decoding assemble their output here. A [`StagingTriangulation`] has no
//! locks, no change notifications and no skeleton cache, and its gluing primitives
//! skip every check that [`Triangulation`](crate::core::triangulation::Triangulation)
//! performs. The type is private to the crate: its contents only become visible through
//! `Triangulation::adopt_staging` or `Triangulation::from_staging`, both of which
//! validate the gluings first, so observers never see an intermediate or inconsistent
//! state.

use std::ops::Range;

use crate::core::perm::Perm;
use crate::core::skeleton::Skeleton;
use crate::core::store::SimplexStore;
use crate::core::triangulation::TriangulationValidationError;

/// An unchecked triangulation under construction.
#[derive(Clone, Debug, Default)]
pub struct StagingTriangulation<const D: usize> {
    store: SimplexStore<D>,
}

impl<const D: usize> StagingTriangulation<D> {
    /// Creates an empty staging triangulation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: SimplexStore::new(),
        }
    }

    pub(crate) fn into_store(self) -> SimplexStore<D> {
        self.store
    }

    /// Number of simplices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// Appends `count` unglued simplices and returns their index range.
    pub fn new_simplices(&mut self, count: usize) -> Range<usize> {
        let start = self.size();
        for _ in 0..count {
            self.store.push(String::new());
        }
        start..start + count
    }

    /// The neighbour index and gluing across `facet` of `simplex`.
    #[must_use]
    pub fn adjacent(&self, simplex: usize, facet: usize) -> Option<(usize, Perm)> {
        self.store.adjacent(simplex, facet)
    }

    /// Glues facet `facet` of `simplex` to facet `perm[facet]` of `adjacent`.
    ///
    /// Both facets must currently be unglued and the permutation must have size `D + 1`;
    /// this is only checked in debug builds.
    pub fn join(&mut self, simplex: usize, facet: usize, adjacent: usize, perm: Perm) {
        debug_assert_eq!(perm.len(), D + 1);
        self.store.join(simplex, facet, adjacent, perm);
    }

    /// Deletes every simplex whose entry in `flagged` is `true`, preserving the order of
    /// the rest.
    pub fn remove_flagged(&mut self, flagged: &[bool]) {
        self.store.remove_flagged(flagged);
    }

    /// Computes the skeleton of the current contents. Nothing is cached.
    #[must_use]
    pub fn skeleton(&self) -> Skeleton<D> {
        Skeleton::compute(&self.store)
    }

    /// Checks gluing symmetry, permutation sizes and index density.
    ///
    /// # Errors
    ///
    /// The first inconsistency found.
    pub fn validate(&self) -> Result<(), TriangulationValidationError> {
        self.store.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::skeleton::LinkKind;
    use crate::core::triangulation::{Triangulation, TriangulationError};

    #[test]
    fn test_staging_builds_and_hands_over() {
        let mut staging = StagingTriangulation::<3>::new();
        let range = staging.new_simplices(3);
        assert_eq!(range, 0..3);
        for facet in 0..4 {
            staging.join(0, facet, 1, Perm::identity(4));
        }
        assert_eq!(staging.skeleton().count_faces(0), 4 + 4);

        staging.remove_flagged(&[false, false, true]);
        let skeleton = staging.skeleton();
        assert!(skeleton.vertex_links().iter().all(|link| link.kind() == LinkKind::Sphere));

        let tri = Triangulation::from_staging(staging).unwrap();
        assert_eq!(tri.size(), 2);
        assert!(tri.is_closed());
        assert!(tri.validate_structure().is_ok());
    }

    #[test]
    fn test_adopt_staging_respects_locks() {
        let mut tri = Triangulation::<2>::new();
        tri.new_simplex();
        tri.lock_simplex(0).unwrap();

        let mut staging = StagingTriangulation::<2>::new();
        staging.new_simplices(2);
        assert!(tri.adopt_staging(staging.clone()).unwrap_err().is_lock_violation());
        assert_eq!(tri.size(), 1);

        tri.unlock_all();
        tri.adopt_staging(staging).unwrap();
        assert_eq!(tri.size(), 2);
    }

    /// One-sided gluing: facet 0 of simplex 0 points at simplex 1, which does not point back.
    fn one_sided() -> StagingTriangulation<2> {
        let mut staging = StagingTriangulation::<2>::new();
        staging.new_simplices(3);
        staging.join(0, 0, 1, Perm::identity(3));
        let key = staging.store.key(2).unwrap();
        staging.store.get_mut(0).unwrap().set_adjacent(0, Some((key, Perm::identity(3))));
        staging
    }

    #[test]
    fn test_handover_rejects_asymmetric_gluings() {
        let staging = one_sided();
        assert!(matches!(
            staging.validate(),
            Err(TriangulationValidationError::AsymmetricGluing { .. })
        ));
        let err = Triangulation::from_staging(staging.clone()).unwrap_err();
        assert!(matches!(err, TriangulationError::InvalidStructure(_)));
        assert!(err.is_invalid_argument());

        let mut tri = Triangulation::<2>::new();
        tri.new_simplex();
        let generation = tri.generation();
        let err = tri.adopt_staging(staging).unwrap_err();
        assert!(matches!(err, TriangulationError::InvalidStructure(_)));
        assert_eq!(tri.size(), 1);
        assert_eq!(tri.generation(), generation);
        assert!(tri.validate_structure().is_ok());
    }

    #[test]
    fn test_remove_flagged_keeps_order() {
        let mut staging = StagingTriangulation::<2>::new();
        staging.new_simplices(4);
        staging.join(0, 2, 3, Perm::identity(3));
        staging.join(1, 0, 3, Perm::from_images(&[1, 0, 2]).unwrap());
        staging.remove_flagged(&[false, true, false, false]);
        assert_eq!(staging.size(), 3);
        assert_eq!(staging.adjacent(0, 2), Some((2, Perm::identity(3))));
        assert!(staging.adjacent(2, 1).is_none());
        assert!(staging.validate().is_ok());
    }
}
