//! The triangulation container.
//!
//! A [`Triangulation<D>`] owns a list of `D`-simplices, indexed densely from `0`, whose
//! facets are glued in pairs by permutations. It maintains three invariants at all
//! observable times:
//!
//! - **Gluing symmetry**: if facet `f` of `A` is glued to `B` via `g`, then facet `g[f]` of
//!   `B` is glued to `A` via `g⁻¹`.
//! - **Index density**: simplex indices are exactly `0..size()`.
//! - **Cache coherence**: the [`Skeleton`] returned by [`Triangulation::skeleton`] always
//!   describes the current gluings; it is dropped on every structural change and
//!   recomputed on demand.
//!
//! Structural edits go through checked mutators ([`join`](Triangulation::join),
//! [`unjoin`](Triangulation::unjoin), [`remove_simplex_at`](Triangulation::remove_simplex_at),
//! …) that verify indices and locks before touching anything, so a failed call leaves
//! the triangulation unchanged.
//!
//! # Examples
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let mut tri = Triangulation::<3>::new();
//! let a = tri.new_simplex();
//! let b = tri.new_simplex();
//! let g = Perm::from_images(&[1, 3, 0, 2]).unwrap();
//!
//! tri.join(a, 0, b, g).unwrap();
//! assert_eq!(tri.adjacent_simplex(a, 0), Some(b));
//! assert_eq!(tri.adjacent_facet(a, 0), Some(1));
//! assert_eq!(tri.adjacent_gluing(b, 1), Some(g.inverse()));
//!
//! // Re-gluing a glued facet is rejected and changes nothing.
//! let err = tri.join(a, 0, b, Perm::identity(4)).unwrap_err();
//! assert!(err.is_invalid_argument());
//! assert!(tri.validate_structure().is_ok());
//! ```

use std::fmt::{self, Write as _};
use std::ops::Range;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use uuid::Uuid;

use crate::core::change_span::{ChangeSpan, Listener, ListenerId};
use crate::core::collections::fast_hash_set_with_capacity;
use crate::core::perm::{Perm, PermError};
use crate::core::simplex::{SIMPLEX_LOCK_BIT, Simplex};
use crate::core::skeleton::Skeleton;
use crate::core::staging::StagingTriangulation;
use crate::core::store::SimplexStore;

/// Largest supported dimension.
pub const MAX_DIMENSION: usize = 16;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// An attempted structural edit touched a locked simplex or facet.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LockViolation {
    /// The simplex itself is locked.
    #[error("Simplex {simplex} is locked")]
    SimplexLocked {
        /// Index of the locked simplex.
        simplex: usize,
    },
    /// A facet of the simplex is locked.
    #[error("Facet {facet} of simplex {simplex} is locked")]
    FacetLocked {
        /// Index of the simplex owning the facet.
        simplex: usize,
        /// The locked facet.
        facet: usize,
    },
}

/// Errors returned by triangulation operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TriangulationError {
    /// A lock prevented the operation.
    #[error(transparent)]
    LockViolation(#[from] LockViolation),
    /// A simplex index is not below the triangulation size.
    #[error("Simplex index {index} is out of range for a triangulation of size {size}")]
    SimplexIndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// The triangulation size.
        size: usize,
    },
    /// A facet number exceeds the dimension.
    #[error("Facet {facet} is out of range for a {dimension}-simplex")]
    FacetOutOfRange {
        /// The rejected facet.
        facet: usize,
        /// The simplex dimension.
        dimension: usize,
    },
    /// A gluing permutation has the wrong size.
    #[error("Gluing permutation has size {found}, expected {expected}")]
    PermutationSize {
        /// Required size `D + 1`.
        expected: usize,
        /// Size supplied.
        found: usize,
    },
    /// The facet is already glued.
    #[error("Facet {facet} of simplex {simplex} is already glued")]
    FacetAlreadyGlued {
        /// Index of the simplex.
        simplex: usize,
        /// The glued facet.
        facet: usize,
    },
    /// A facet cannot be glued to itself.
    #[error("Facet {facet} of simplex {simplex} cannot be glued to itself")]
    SelfGluedFacet {
        /// Index of the simplex.
        simplex: usize,
        /// The facet.
        facet: usize,
    },
    /// The UUID does not identify a simplex of this triangulation.
    #[error("Simplex {uuid} does not belong to this triangulation")]
    UnknownSimplex {
        /// The unknown UUID.
        uuid: Uuid,
    },
    /// A permutation could not be constructed.
    #[error("Invalid permutation: {0}")]
    InvalidPermutation(#[from] PermError),
    /// An isomorphism does not match the triangulation it is applied to.
    #[error("Isomorphism on {found} simplices cannot be applied to a triangulation of size {expected}")]
    IsomorphismSize {
        /// The triangulation size.
        expected: usize,
        /// The isomorphism size.
        found: usize,
    },
    /// Explicit gluing data is inconsistent.
    #[error("Invalid construction: {message}")]
    InvalidConstruction {
        /// Description of the inconsistency.
        message: String,
    },
    /// A finished construction failed structural validation.
    #[error("Invalid structure: {0}")]
    InvalidStructure(#[from] TriangulationValidationError),
}

impl TriangulationError {
    /// Whether this error reports a lock violation.
    #[must_use]
    pub const fn is_lock_violation(&self) -> bool {
        matches!(self, Self::LockViolation(_))
    }

    /// Whether this error reports a malformed argument (any non-lock failure).
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        !self.is_lock_violation()
    }
}

/// Errors reported by [`Triangulation::validate_structure`].
///
/// These indicate internal corruption and cannot arise through the public mutators.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TriangulationValidationError {
    /// Facet `facet` of `simplex` is not glued back symmetrically.
    #[error("Gluing on facet {facet} of simplex {simplex} is not symmetric")]
    AsymmetricGluing {
        /// Index of the simplex.
        simplex: usize,
        /// The facet.
        facet: usize,
    },
    /// A gluing permutation has the wrong size.
    #[error("Gluing on facet {facet} of simplex {simplex} has a permutation of size {found}")]
    BadPermutationSize {
        /// Index of the simplex.
        simplex: usize,
        /// The facet.
        facet: usize,
        /// Size found.
        found: usize,
    },
    /// A simplex records an index different from its position.
    #[error("Simplex at position {position} records index {recorded}")]
    IndexMismatch {
        /// Actual position.
        position: usize,
        /// Index stored in the simplex.
        recorded: usize,
    },
    /// Storage, index order and UUID map disagree.
    #[error("Simplex mapping inconsistency: {message}")]
    MappingInconsistency {
        /// Description of the inconsistency.
        message: String,
    },
}

// =============================================================================
// TRIANGULATION
// =============================================================================

/// A `D`-dimensional triangulation: simplices glued along their facets.
///
/// `D` must lie in `2..=16`; other values fail to compile.
pub struct Triangulation<const D: usize> {
    /// Simplices, their gluings and identities.
    store: SimplexStore<D>,

    /// Lazily computed skeleton; reset by every structural change.
    skeleton: OnceLock<Skeleton<D>>,

    /// Incremented on every change, structural or not.
    generation: u64,

    /// Depth of currently open change spans.
    span_depth: usize,

    /// Whether anything changed since the outermost span opened.
    span_changed: bool,

    listeners: Vec<(ListenerId, Listener<D>)>,
    next_listener: u64,
}

impl<const D: usize> Triangulation<D> {
    const DIMENSION_CHECK: () = assert!(
        D >= 2 && D <= MAX_DIMENSION,
        "triangulation dimension must lie in 2..=16"
    );

    /// Creates an empty triangulation.
    #[must_use]
    pub fn new() -> Self {
        Self::from_store(SimplexStore::new())
    }

    /// Builds a triangulation from a finished staging triangulation.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::InvalidStructure`] if the staging gluings are not symmetric.
    pub(crate) fn from_staging(staging: StagingTriangulation<D>) -> Result<Self, TriangulationError> {
        staging.validate()?;
        Ok(Self::from_store(staging.into_store()))
    }

    pub(crate) fn from_store(store: SimplexStore<D>) -> Self {
        let () = Self::DIMENSION_CHECK;
        Self {
            store,
            skeleton: OnceLock::new(),
            generation: 0,
            span_depth: 0,
            span_changed: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Change tracking
    // -------------------------------------------------------------------------

    /// Opens a change span; see [`ChangeSpan`].
    pub fn change_span(&mut self) -> ChangeSpan<'_, D> {
        ChangeSpan::new(self)
    }

    /// Registers a callback fired once after each completed (outermost) change span
    /// in which something changed.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Self) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a callback; returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Counter incremented on every change.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) const fn begin_span(&mut self) {
        self.span_depth += 1;
    }

    pub(crate) fn end_span(&mut self) {
        self.span_depth = self.span_depth.saturating_sub(1);
        if self.span_depth == 0 && self.span_changed {
            self.span_changed = false;
            let mut listeners = std::mem::take(&mut self.listeners);
            for (_, listener) in &mut listeners {
                listener(self);
            }
            listeners.append(&mut self.listeners);
            self.listeners = listeners;
        }
    }

    /// Records a non-structural change.
    const fn mark_changed(&mut self) {
        self.generation += 1;
        self.span_changed = true;
    }

    /// Records a structural change, dropping the cached skeleton.
    fn invalidate(&mut self) {
        self.mark_changed();
        self.skeleton.take();
    }

    /// Mutable access to the store for crate-internal algorithms; counts as a structural change.
    pub(crate) fn store_mut(&mut self) -> &mut SimplexStore<D> {
        self.invalidate();
        &mut self.store
    }

    pub(crate) const fn store(&self) -> &SimplexStore<D> {
        &self.store
    }

    pub(crate) fn into_store(self) -> SimplexStore<D> {
        self.store
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The dimension `D`.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        D
    }

    /// Number of simplices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// Whether there are no simplices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The simplex at `index`.
    #[must_use]
    pub fn simplex(&self, index: usize) -> Option<&Simplex<D>> {
        self.store.get(index)
    }

    /// The simplex with the given UUID.
    #[must_use]
    pub fn simplex_by_uuid(&self, uuid: &Uuid) -> Option<&Simplex<D>> {
        self.index_of(uuid).and_then(|index| self.store.get(index))
    }

    /// The current index of the simplex with the given UUID.
    #[must_use]
    pub fn index_of(&self, uuid: &Uuid) -> Option<usize> {
        self.store.index_of_uuid(uuid)
    }

    /// All simplices in index order.
    pub fn simplices(&self) -> impl ExactSizeIterator<Item = &Simplex<D>> + '_ {
        self.store.iter()
    }

    /// The neighbour index and gluing across facet `facet` of `simplex`.
    #[must_use]
    pub fn adjacent(&self, simplex: usize, facet: usize) -> Option<(usize, Perm)> {
        self.store.adjacent(simplex, facet)
    }

    /// The neighbour across facet `facet` of `simplex`, if glued.
    #[must_use]
    pub fn adjacent_simplex(&self, simplex: usize, facet: usize) -> Option<usize> {
        self.adjacent(simplex, facet).map(|(adjacent, _)| adjacent)
    }

    /// The gluing permutation across facet `facet` of `simplex`, if glued.
    #[must_use]
    pub fn adjacent_gluing(&self, simplex: usize, facet: usize) -> Option<Perm> {
        self.adjacent(simplex, facet).map(|(_, perm)| perm)
    }

    /// The facet of the neighbour that facet `facet` of `simplex` is glued to.
    #[must_use]
    pub fn adjacent_facet(&self, simplex: usize, facet: usize) -> Option<usize> {
        self.adjacent_gluing(simplex, facet).map(|perm| perm.apply(facet))
    }

    /// Whether any facet of any simplex is unglued.
    #[must_use]
    pub fn has_boundary_facets(&self) -> bool {
        self.simplices().any(Simplex::has_boundary)
    }

    /// Number of unglued facets.
    #[must_use]
    pub fn count_boundary_facets(&self) -> usize {
        self.simplices()
            .map(|s| (0..=D).filter(|&f| s.is_boundary_facet(f)).count())
            .sum()
    }

    /// Whether both triangulations have the same size and, index by index and facet by
    /// facet, the same neighbours and gluing permutations. Labels and locks are ignored.
    #[must_use]
    pub fn is_identical_to(&self, other: &Self) -> bool {
        self.size() == other.size()
            && (0..self.size())
                .all(|s| (0..=D).all(|f| self.adjacent(s, f) == other.adjacent(s, f)))
    }

    // -------------------------------------------------------------------------
    // Argument checks
    // -------------------------------------------------------------------------

    pub(crate) fn check_index(&self, index: usize) -> Result<(), TriangulationError> {
        if index < self.size() {
            Ok(())
        } else {
            Err(TriangulationError::SimplexIndexOutOfRange {
                index,
                size: self.size(),
            })
        }
    }

    const fn check_facet(facet: usize) -> Result<(), TriangulationError> {
        if facet <= D {
            Ok(())
        } else {
            Err(TriangulationError::FacetOutOfRange { facet, dimension: D })
        }
    }

    fn check_simplex_unlocked(&self, index: usize) -> Result<(), LockViolation> {
        match self.store.get(index) {
            Some(s) if s.is_locked() => Err(LockViolation::SimplexLocked { simplex: index }),
            _ => Ok(()),
        }
    }

    fn check_facet_unlocked(&self, index: usize, facet: usize) -> Result<(), LockViolation> {
        match self.store.get(index) {
            Some(s) if s.is_facet_locked(facet) => Err(LockViolation::FacetLocked {
                simplex: index,
                facet,
            }),
            _ => Ok(()),
        }
    }

    /// Locks that forbid ungluing facet `facet` of `index` from its neighbour.
    pub(crate) fn check_unjoin_locks(&self, index: usize, facet: usize) -> Result<(), LockViolation> {
        self.check_simplex_unlocked(index)?;
        self.check_facet_unlocked(index, facet)?;
        if let Some((adjacent, perm)) = self.adjacent(index, facet) {
            self.check_simplex_unlocked(adjacent)?;
            self.check_facet_unlocked(adjacent, perm.apply(facet))?;
        }
        Ok(())
    }

    /// The first lock found anywhere, if any.
    pub(crate) fn first_lock(&self) -> Option<LockViolation> {
        self.simplices().find_map(|s| {
            if s.is_locked() {
                Some(LockViolation::SimplexLocked { simplex: s.index() })
            } else {
                (0..=D)
                    .find(|&f| s.is_facet_locked(f))
                    .map(|facet| LockViolation::FacetLocked {
                        simplex: s.index(),
                        facet,
                    })
            }
        })
    }

    // -------------------------------------------------------------------------
    // Simplex creation and gluing
    // -------------------------------------------------------------------------

    /// Appends an unglued simplex with an empty label and returns its index.
    pub fn new_simplex(&mut self) -> usize {
        self.new_simplex_with_label(String::new())
    }

    /// Appends an unglued simplex with the given label and returns its index.
    pub fn new_simplex_with_label(&mut self, label: impl Into<String>) -> usize {
        let mut span = self.change_span();
        span.invalidate();
        span.store.push(label.into())
    }

    /// Appends `count` unglued simplices and returns their index range.
    pub fn new_simplices(&mut self, count: usize) -> Range<usize> {
        let start = self.size();
        if count > 0 {
            let mut span = self.change_span();
            span.invalidate();
            for _ in 0..count {
                span.store.push(String::new());
            }
        }
        start..start + count
    }

    /// Replaces the label of simplex `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::SimplexIndexOutOfRange`] for a bad index.
    pub fn set_label(
        &mut self,
        index: usize,
        label: impl Into<String>,
    ) -> Result<(), TriangulationError> {
        self.check_index(index)?;
        let mut span = self.change_span();
        span.mark_changed();
        if let Some(simplex) = span.store.get_mut(index) {
            simplex.set_label(label.into());
        }
        Ok(())
    }

    /// Glues facet `facet` of `simplex` to facet `perm[facet]` of `adjacent`,
    /// identifying vertex `v` of `simplex` with vertex `perm[v]` of `adjacent`.
    ///
    /// # Errors
    ///
    /// - [`TriangulationError::LockViolation`] if either simplex or either facet is locked.
    /// - [`TriangulationError::SimplexIndexOutOfRange`], [`TriangulationError::FacetOutOfRange`]
    ///   or [`TriangulationError::PermutationSize`] for malformed arguments.
    /// - [`TriangulationError::FacetAlreadyGlued`] if either facet is already glued.
    /// - [`TriangulationError::SelfGluedFacet`] if the facet would be glued to itself.
    pub fn join(
        &mut self,
        simplex: usize,
        facet: usize,
        adjacent: usize,
        perm: Perm,
    ) -> Result<(), TriangulationError> {
        self.check_index(simplex)?;
        self.check_index(adjacent)?;
        Self::check_facet(facet)?;
        if perm.len() != D + 1 {
            return Err(TriangulationError::PermutationSize {
                expected: D + 1,
                found: perm.len(),
            });
        }
        let target = perm.apply(facet);
        self.check_simplex_unlocked(simplex)?;
        self.check_simplex_unlocked(adjacent)?;
        self.check_facet_unlocked(simplex, facet)?;
        self.check_facet_unlocked(adjacent, target)?;

        if self.adjacent(simplex, facet).is_some() {
            return Err(TriangulationError::FacetAlreadyGlued { simplex, facet });
        }
        if simplex == adjacent && target == facet {
            return Err(TriangulationError::SelfGluedFacet { simplex, facet });
        }
        if self.adjacent(adjacent, target).is_some() {
            return Err(TriangulationError::FacetAlreadyGlued {
                simplex: adjacent,
                facet: target,
            });
        }

        let mut span = self.change_span();
        span.invalidate();
        span.store.join(simplex, facet, adjacent, perm);
        Ok(())
    }

    /// Unglues facet `facet` of `simplex`, returning the former neighbour's index.
    ///
    /// Ungluing a boundary facet is a no-op returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - [`TriangulationError::LockViolation`] if either simplex or the facet is locked.
    /// - [`TriangulationError::SimplexIndexOutOfRange`] or
    ///   [`TriangulationError::FacetOutOfRange`] for malformed arguments.
    pub fn unjoin(
        &mut self,
        simplex: usize,
        facet: usize,
    ) -> Result<Option<usize>, TriangulationError> {
        self.check_index(simplex)?;
        Self::check_facet(facet)?;
        if self.adjacent(simplex, facet).is_none() {
            return Ok(None);
        }
        self.check_unjoin_locks(simplex, facet)?;

        let mut span = self.change_span();
        span.invalidate();
        Ok(span.store.unjoin(simplex, facet))
    }

    /// Unglues every facet of `simplex`.
    ///
    /// # Errors
    ///
    /// As for [`unjoin`](Self::unjoin); all locks are checked before anything is unglued.
    pub fn isolate(&mut self, simplex: usize) -> Result<(), TriangulationError> {
        self.check_index(simplex)?;
        let glued: Vec<usize> = (0..=D)
            .filter(|&f| self.adjacent(simplex, f).is_some())
            .collect();
        for &facet in &glued {
            self.check_unjoin_locks(simplex, facet)?;
        }
        if !glued.is_empty() {
            let mut span = self.change_span();
            span.invalidate();
            span.store.isolate(simplex);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Isolates and deletes simplex `index`; later simplices move down by one.
    ///
    /// # Errors
    ///
    /// - [`TriangulationError::LockViolation`] if the simplex or any of its facets is
    ///   locked, or if a neighbour it is glued to is locked.
    /// - [`TriangulationError::SimplexIndexOutOfRange`] for a bad index.
    pub fn remove_simplex_at(&mut self, index: usize) -> Result<(), TriangulationError> {
        self.check_index(index)?;
        self.check_simplex_unlocked(index)?;
        for facet in 0..=D {
            self.check_facet_unlocked(index, facet)?;
            if let Some(adjacent) = self.adjacent_simplex(index, facet) {
                self.check_simplex_unlocked(adjacent)?;
            }
        }
        let mut span = self.change_span();
        span.invalidate();
        span.store.remove(index);
        Ok(())
    }

    /// Removes the simplex with the given UUID.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::UnknownSimplex`] if the UUID is not in this triangulation,
    /// otherwise as for [`remove_simplex_at`](Self::remove_simplex_at).
    pub fn remove_simplex(&mut self, uuid: &Uuid) -> Result<(), TriangulationError> {
        let index = self
            .index_of(uuid)
            .ok_or(TriangulationError::UnknownSimplex { uuid: *uuid })?;
        self.remove_simplex_at(index)
    }

    /// Removes every simplex.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::LockViolation`] if anything is locked.
    pub fn remove_all_simplices(&mut self) -> Result<(), TriangulationError> {
        if let Some(violation) = self.first_lock() {
            return Err(violation.into());
        }
        if !self.is_empty() {
            let mut span = self.change_span();
            span.invalidate();
            span.store.clear();
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bulk operations
    // -------------------------------------------------------------------------

    /// Exchanges all simplices with `other`. Each simplex keeps its UUID, label and locks.
    pub fn swap_contents(&mut self, other: &mut Self) {
        let mut mine = self.change_span();
        let mut theirs = other.change_span();
        std::mem::swap(&mut mine.store, &mut theirs.store);
        mine.invalidate();
        theirs.invalidate();
    }

    /// Moves all simplices to the end of `dest`, leaving this triangulation empty.
    /// Each simplex keeps its UUID, label and locks.
    pub fn move_contents_to(&mut self, dest: &mut Self) {
        if self.is_empty() {
            return;
        }
        let mut source = self.change_span();
        let mut target = dest.change_span();
        let moved = std::mem::take(&mut source.store);
        target.store.append(moved);
        source.invalidate();
        target.invalidate();
    }

    /// Appends a copy of `other` (labels and gluings, not locks) and returns the index
    /// range of the copied simplices.
    pub fn insert_triangulation(&mut self, other: &Self) -> Range<usize> {
        let base = self.size();
        if other.is_empty() {
            return base..base;
        }
        let mut span = self.change_span();
        span.invalidate();
        for simplex in other.simplices() {
            span.store.push(simplex.label().to_string());
        }
        for i in 0..other.size() {
            for f in 0..=D {
                if let Some((j, g)) = other.adjacent(i, f)
                    && (j > i || (j == i && g.apply(f) > f))
                {
                    span.store.join(base + i, f, base + j, g);
                }
            }
        }
        base..base + other.size()
    }

    /// Appends simplices described by explicit gluing tables and returns their index range.
    ///
    /// Row `i` describes new simplex `i`; entry `f` is either `None` (boundary) or the
    /// index of the adjacent new simplex (relative to the first new one) with the gluing
    /// permutation. The data must already be symmetric.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::InvalidConstruction`] if any row is malformed or any gluing is
    /// not matched by its reverse; nothing is inserted in that case.
    pub fn insert_construction(
        &mut self,
        gluings: &[Vec<Option<(usize, Perm)>>],
    ) -> Result<Range<usize>, TriangulationError> {
        validate_construction::<D>(gluings)?;
        let base = self.size();
        if gluings.is_empty() {
            return Ok(base..base);
        }
        let mut span = self.change_span();
        span.invalidate();
        for _ in gluings {
            span.store.push(String::new());
        }
        join_construction(&mut span.store, base, gluings);
        Ok(base..base + gluings.len())
    }

    /// Replaces the entire contents with a finished staging triangulation.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::LockViolation`] if anything in this triangulation is locked,
    /// since every current simplex would be discarded, and
    /// [`TriangulationError::InvalidStructure`] if the staging gluings are not symmetric.
    /// Either way nothing changes.
    pub(crate) fn adopt_staging(&mut self, staging: StagingTriangulation<D>) -> Result<(), TriangulationError> {
        if let Some(violation) = self.first_lock() {
            return Err(violation.into());
        }
        staging.validate()?;
        let mut span = self.change_span();
        span.invalidate();
        span.store = staging.into_store();
        Ok(())
    }

    /// Appends the simplices of a finished staging triangulation after the existing ones
    /// and returns the index of the first appended simplex.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::InvalidStructure`] if the staging gluings are not symmetric,
    /// in which case nothing changes.
    pub(crate) fn append_staging(&mut self, staging: StagingTriangulation<D>) -> Result<usize, TriangulationError> {
        staging.validate()?;
        let mut span = self.change_span();
        span.invalidate();
        Ok(span.store.append(staging.into_store()))
    }

    // -------------------------------------------------------------------------
    // Locks
    // -------------------------------------------------------------------------

    /// Locks simplex `index` against removal and gluing changes.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::SimplexIndexOutOfRange`] for a bad index.
    pub fn lock_simplex(&mut self, index: usize) -> Result<(), TriangulationError> {
        self.update_locks(index, |locks| locks | SIMPLEX_LOCK_BIT)
    }

    /// Removes the simplex lock from `index` (facet locks are unaffected).
    ///
    /// # Errors
    ///
    /// [`TriangulationError::SimplexIndexOutOfRange`] for a bad index.
    pub fn unlock_simplex(&mut self, index: usize) -> Result<(), TriangulationError> {
        self.update_locks(index, |locks| locks & !SIMPLEX_LOCK_BIT)
    }

    /// Locks facet `facet` of `index`, and the matching facet on the other side if glued.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::SimplexIndexOutOfRange`] or [`TriangulationError::FacetOutOfRange`].
    pub fn lock_facet(&mut self, index: usize, facet: usize) -> Result<(), TriangulationError> {
        self.set_facet_lock(index, facet, true)
    }

    /// Unlocks facet `facet` of `index`, and the matching facet on the other side if glued.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::SimplexIndexOutOfRange`] or [`TriangulationError::FacetOutOfRange`].
    pub fn unlock_facet(&mut self, index: usize, facet: usize) -> Result<(), TriangulationError> {
        self.set_facet_lock(index, facet, false)
    }

    /// Removes every simplex and facet lock.
    pub fn unlock_all(&mut self) {
        for index in 0..self.size() {
            if let Some(simplex) = self.store.get_mut(index) {
                simplex.set_locks(0);
            }
        }
    }

    /// Whether any simplex or facet is locked.
    #[must_use]
    pub fn has_locks(&self) -> bool {
        self.simplices().any(Simplex::has_locks)
    }

    fn update_locks(
        &mut self,
        index: usize,
        update: impl FnOnce(u32) -> u32,
    ) -> Result<(), TriangulationError> {
        self.check_index(index)?;
        if let Some(simplex) = self.store.get_mut(index) {
            simplex.set_locks(update(simplex.locks()));
        }
        Ok(())
    }

    fn set_facet_lock(
        &mut self,
        index: usize,
        facet: usize,
        locked: bool,
    ) -> Result<(), TriangulationError> {
        self.check_index(index)?;
        Self::check_facet(facet)?;
        let apply = |locks: u32, f: usize| {
            if locked {
                locks | (1 << f)
            } else {
                locks & !(1 << f)
            }
        };
        self.update_locks(index, |locks| apply(locks, facet))?;
        if let Some((adjacent, perm)) = self.adjacent(index, facet) {
            self.update_locks(adjacent, |locks| apply(locks, perm.apply(facet)))?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Skeleton
    // -------------------------------------------------------------------------

    /// The skeleton, computed on first use after each structural change.
    pub fn skeleton(&self) -> &Skeleton<D> {
        self.skeleton
            .get_or_init(|| Skeleton::compute(&self.store))
    }

    /// Forces the skeleton to be computed now.
    pub fn ensure_skeleton(&self) {
        let _ = self.skeleton();
    }

    /// Number of vertex classes.
    #[must_use]
    pub fn count_vertices(&self) -> usize {
        self.skeleton().count_faces(0)
    }

    /// Number of edge classes.
    #[must_use]
    pub fn count_edges(&self) -> usize {
        self.skeleton().count_faces(1)
    }

    /// Number of `k`-face classes; `k == D` counts simplices.
    #[must_use]
    pub fn count_faces(&self, k: usize) -> usize {
        self.skeleton().count_faces(k)
    }

    /// Number of connected components.
    #[must_use]
    pub fn count_components(&self) -> usize {
        self.skeleton().components().len()
    }

    /// Number of boundary components, real and ideal.
    #[must_use]
    pub fn count_boundary_components(&self) -> usize {
        self.skeleton().boundary_components().len()
    }

    /// Whether the triangulation has at most one component.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.count_components() <= 1
    }

    /// Whether every face is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.skeleton().is_valid()
    }

    /// Whether some vertex is ideal.
    #[must_use]
    pub fn is_ideal(&self) -> bool {
        self.skeleton().is_ideal()
    }

    /// Whether there are no boundary components, real or ideal.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.skeleton().is_closed()
    }

    /// Whether every component is orientable.
    #[must_use]
    pub fn is_orientable(&self) -> bool {
        self.skeleton().is_orientable()
    }

    /// Whether the simplices' vertex orderings already induce a consistent orientation.
    #[must_use]
    pub fn is_oriented(&self) -> bool {
        self.skeleton().is_oriented()
    }

    // -------------------------------------------------------------------------
    // Validation and output
    // -------------------------------------------------------------------------

    /// Checks gluing symmetry, permutation sizes, index density and UUID bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns the first [`TriangulationValidationError`] found.
    pub fn validate_structure(&self) -> Result<(), TriangulationValidationError> {
        self.store.validate()
    }

    /// A multi-line description listing every gluing.
    ///
    /// Each row gives, for every facet (written as its vertex string), either
    /// `boundary` or `adjacent (image vertices)`.
    #[must_use]
    pub fn detail(&self) -> String {
        let facet_vertices = |f: usize, map: Option<Perm>| -> String {
            (0..=D)
                .filter(|&v| v != f)
                .map(|v| {
                    let image = map.map_or(v, |p| p.apply(v));
                    u32::try_from(image)
                        .ok()
                        .and_then(|digit| char::from_digit(digit, 36))
                        .unwrap_or('?')
                })
                .collect()
        };
        let mut out = String::new();
        let _ = writeln!(out, "{self}");
        if self.is_empty() {
            return out;
        }
        let _ = write!(out, "\n  Simplex  |  glued to:");
        for f in (0..=D).rev() {
            let _ = write!(out, "  ({})", facet_vertices(f, None));
        }
        let _ = writeln!(out);
        for simplex in self.simplices() {
            let i = simplex.index();
            let _ = write!(out, "  {i:>7}  |          ");
            for f in (0..=D).rev() {
                match self.adjacent(i, f) {
                    Some((j, g)) => {
                        let _ = write!(out, "  {j} ({})", facet_vertices(f, Some(g)));
                    }
                    None => {
                        let _ = write!(out, "  boundary");
                    }
                }
            }
            if !simplex.label().is_empty() {
                let _ = write!(out, "    # {}", simplex.label());
            }
            let _ = writeln!(out);
        }
        out
    }
}

// =============================================================================
// CONSTRUCTION HELPERS
// =============================================================================

fn validate_construction<const D: usize>(
    gluings: &[Vec<Option<(usize, Perm)>>],
) -> Result<(), TriangulationError> {
    let fail = |message: String| Err(TriangulationError::InvalidConstruction { message });
    let n = gluings.len();
    for (i, row) in gluings.iter().enumerate() {
        if row.len() != D + 1 {
            return fail(format!("row {i} has {} entries, expected {}", row.len(), D + 1));
        }
        for (f, entry) in row.iter().enumerate() {
            let Some((j, g)) = *entry else { continue };
            if j >= n {
                return fail(format!("simplex {i} facet {f} refers to missing simplex {j}"));
            }
            if g.len() != D + 1 {
                return fail(format!("simplex {i} facet {f} has a permutation of size {}", g.len()));
            }
            let target = g.apply(f);
            if j == i && target == f {
                return fail(format!("simplex {i} facet {f} is glued to itself"));
            }
            if gluings[j][target] != Some((i, g.inverse())) {
                return fail(format!("gluing on simplex {i} facet {f} is not matched by its reverse"));
            }
        }
    }
    Ok(())
}

fn join_construction<const D: usize>(
    store: &mut SimplexStore<D>,
    base: usize,
    gluings: &[Vec<Option<(usize, Perm)>>],
) {
    for (i, row) in gluings.iter().enumerate() {
        for (f, entry) in row.iter().enumerate() {
            if let Some((j, g)) = *entry
                && (j > i || (j == i && g.apply(f) > f))
            {
                store.join(base + i, f, base + j, g);
            }
        }
    }
}

// =============================================================================
// STANDARD TRAITS
// =============================================================================

impl<const D: usize> Default for Triangulation<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> Clone for Triangulation<D> {
    /// Copies simplices (with UUIDs, labels and locks) and the cached skeleton;
    /// subscribers are not copied.
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            skeleton: self.skeleton.clone(),
            generation: self.generation,
            span_depth: 0,
            span_changed: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

impl<const D: usize> fmt::Debug for Triangulation<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Triangulation")
            .field("dimension", &D)
            .field("store", &self.store)
            .field("generation", &self.generation)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<const D: usize> fmt::Display for Triangulation<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size() {
            0 => write!(f, "Empty {D}-dimensional triangulation"),
            1 => write!(f, "Triangulation with 1 {D}-simplex"),
            n => write!(f, "Triangulation with {n} {D}-simplices"),
        }
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

#[derive(Serialize, Deserialize)]
struct SimplexData {
    uuid: Uuid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    label: String,
    gluings: Vec<Option<(usize, Perm)>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    locks: u32,
}

#[derive(Serialize, Deserialize)]
struct TriangulationData {
    dimension: usize,
    simplices: Vec<SimplexData>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl<const D: usize> Serialize for Triangulation<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let simplices = self
            .simplices()
            .map(|s| SimplexData {
                uuid: s.uuid(),
                label: s.label().to_string(),
                gluings: (0..=D).map(|f| self.adjacent(s.index(), f)).collect(),
                locks: s.locks(),
            })
            .collect();
        TriangulationData {
            dimension: D,
            simplices,
        }
        .serialize(serializer)
    }
}

impl<'de, const D: usize> Deserialize<'de> for Triangulation<D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let data = TriangulationData::deserialize(deserializer)?;
        if data.dimension != D {
            return Err(de::Error::custom(format!(
                "expected a {D}-dimensional triangulation, found dimension {}",
                data.dimension
            )));
        }
        let mut uuids = fast_hash_set_with_capacity(data.simplices.len());
        if let Some(duplicate) = data.simplices.iter().find(|s| !uuids.insert(s.uuid)) {
            return Err(de::Error::custom(format!(
                "simplex UUID {} appears more than once",
                duplicate.uuid
            )));
        }
        let rows: Vec<Vec<Option<(usize, Perm)>>> =
            data.simplices.iter().map(|s| s.gluings.clone()).collect();
        validate_construction::<D>(&rows).map_err(de::Error::custom)?;

        let mut store = SimplexStore::new();
        for simplex in data.simplices {
            let index = store.push_with_uuid(simplex.label, simplex.uuid);
            if let Some(stored) = store.get_mut(index) {
                stored.set_locks(simplex.locks);
            }
        }
        join_construction(&mut store, 0, &rows);
        Ok(Self::from_store(store))
    }
}

// =============================================================================
// TESTS
// =============================================================================
