//! Top-dimensional building blocks of a [`Triangulation`](crate::core::triangulation::Triangulation).
//!
//! A [`Simplex`] owns, for each of its `D + 1` facets, an optional gluing to a
//! neighbouring simplex, plus a label, a stable [`Uuid`] and lock flags.
//! Simplices are always owned by a triangulation (or a staging triangulation) and are
//! only mutated through it, which keeps every gluing symmetric.
//!
//! # Key Features
//!
//! - **Unique Identification**: Each simplex has a v4 UUID that survives reindexing,
//!   [`swap_contents`](crate::core::triangulation::Triangulation::swap_contents) and
//!   [`move_contents_to`](crate::core::triangulation::Triangulation::move_contents_to)
//! - **Dense Indexing**: [`Simplex::index`] is always the simplex's position in its triangulation
//! - **Locks**: a whole-simplex lock plus one lock per facet
//!
//! # Examples
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let mut tri = Triangulation::<3>::new();
//! let s = tri.new_simplex_with_label("apex");
//! let simplex = tri.simplex(s).unwrap();
//!
//! assert_eq!(simplex.label(), "apex");
//! assert_eq!(simplex.index(), 0);
//! assert_eq!(simplex.dim(), 3);
//! assert!(simplex.is_boundary_facet(2));
//! assert!(!simplex.is_locked());
//! ```

use slotmap::new_key_type;
use uuid::Uuid;

use crate::core::collections::FacetBuffer;
use crate::core::perm::Perm;

new_key_type! {
    /// Key type for accessing simplices in the storage map.
    ///
    /// Keys are stable for the lifetime of a simplex inside one storage map,
    /// independent of the simplex's dense index.
    pub struct SimplexKey;
}

/// Bit of [`Simplex::locks`] that holds the whole-simplex lock.
pub const SIMPLEX_LOCK_BIT: u32 = 1 << 31;

/// A single `D`-simplex with its facet gluings.
#[derive(Clone, Debug)]
pub struct Simplex<const D: usize> {
    /// Stable external identity.
    uuid: Uuid,

    /// Free-form label; empty by default.
    label: String,

    /// Position within the owning triangulation.
    index: usize,

    /// For each facet, the neighbour key and the gluing permutation (or `None` on the boundary).
    adjacency: FacetBuffer<Option<(SimplexKey, Perm)>>,

    /// Bit `f` locks facet `f`; [`SIMPLEX_LOCK_BIT`] locks the simplex itself.
    locks: u32,
}

impl<const D: usize> Simplex<D> {
    pub(crate) fn new(uuid: Uuid, label: String, index: usize) -> Self {
        let mut adjacency = FacetBuffer::with_capacity(D + 1);
        adjacency.resize(D + 1, None);
        Self {
            uuid,
            label,
            index,
            adjacency,
            locks: 0,
        }
    }

    /// The simplex's UUID.
    #[inline]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The simplex's label (possibly empty).
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The simplex's current index in its triangulation.
    ///
    /// Indices shift when lower-indexed simplices are removed.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The dimension `D` of this simplex.
    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        D
    }

    /// Whether facet `facet` is unglued.
    ///
    /// # Panics
    ///
    /// Panics if `facet > D`.
    #[must_use]
    pub fn is_boundary_facet(&self, facet: usize) -> bool {
        self.adjacency[facet].is_none()
    }

    /// Whether any facet of this simplex is unglued.
    #[must_use]
    pub fn has_boundary(&self) -> bool {
        self.adjacency.iter().any(Option::is_none)
    }

    /// Whether the simplex itself is locked.
    #[inline]
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locks & SIMPLEX_LOCK_BIT != 0
    }

    /// Whether facet `facet` is locked.
    #[inline]
    #[must_use]
    pub const fn is_facet_locked(&self, facet: usize) -> bool {
        facet <= D && self.locks & (1 << facet) != 0
    }

    /// The raw lock mask: bit `f` for facet `f` and [`SIMPLEX_LOCK_BIT`] for the simplex.
    #[inline]
    #[must_use]
    pub const fn locks(&self) -> u32 {
        self.locks
    }

    /// Whether the simplex or any of its facets is locked.
    #[inline]
    #[must_use]
    pub const fn has_locks(&self) -> bool {
        self.locks != 0
    }

    // -------------------------------------------------------------------------
    // Crate-internal accessors and mutators
    // -------------------------------------------------------------------------

    pub(crate) fn adjacent(&self, facet: usize) -> Option<(SimplexKey, Perm)> {
        self.adjacency.get(facet).copied().flatten()
    }

    pub(crate) fn gluings(&self) -> impl Iterator<Item = (usize, SimplexKey, Perm)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .filter_map(|(facet, slot)| slot.map(|(key, perm)| (facet, key, perm)))
    }

    pub(crate) fn set_adjacent(&mut self, facet: usize, gluing: Option<(SimplexKey, Perm)>) {
        self.adjacency[facet] = gluing;
    }

    pub(crate) const fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    pub(crate) const fn set_uuid(&mut self, uuid: Uuid) {
        self.uuid = uuid;
    }

    pub(crate) const fn set_locks(&mut self, locks: u32) {
        self.locks = locks;
    }
}

// =============================================================================
// TESTS
// =============================================================================
