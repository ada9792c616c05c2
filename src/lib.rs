//! # simplicial
//!
//! This is a library for building and manipulating **combinatorial triangulations**: collections
//! of abstract `D`-simplices whose facets are glued together in pairs by explicit vertex
//! permutations. No coordinates are involved; a triangulation is pure gluing data, which is
//! exactly what is needed to describe (and compute with) manifolds and pseudo-manifolds in
//! [combinatorial topology](https://en.wikipedia.org/wiki/Simplicial_complex).
//!
//! # Features
//!
//! - `D`-dimensional triangulations for `2 ≤ D ≤ 16`, with the dimension fixed at compile time
//! - Stable simplex identity ([`Uuid`](uuid::Uuid)) alongside dense, always-contiguous indices
//! - Lazily computed skeleton: faces of every dimension, vertex links, components,
//!   boundary components and orientability
//! - Canonical isomorphism signatures (and reconstruction from them)
//! - Topology-preserving surgery on 3-manifold triangulations: ideal-to-finite
//!   subdivision, puncturing and connected sums
//! - Simplex and facet locks that protect parts of a triangulation from modification
//! - Grouped change notification through RAII change spans
//! - Serialization/Deserialization with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! Two tetrahedra glued along all four facets by the identity form the 3-sphere:
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let mut tri = Triangulation::<3>::new();
//! let a = tri.new_simplex();
//! let b = tri.new_simplex();
//! for facet in 0..4 {
//!     tri.join(a, facet, b, Perm::identity(4)).unwrap();
//! }
//!
//! assert_eq!(tri.size(), 2);
//! assert!(tri.is_valid());
//! assert!(tri.is_closed());
//! assert!(tri.is_orientable());
//! assert_eq!(tri.count_vertices(), 4);
//! assert_eq!(tri.iso_sig(), "cPcbbbaaa");
//! ```
//!
//! # Gluing Conventions
//!
//! When facet `f` of simplex `A` is glued to simplex `B` with permutation `g`:
//!
//! - facet `f` of `A` is identified with facet `g[f]` of `B`;
//! - vertex `v ≠ f` of `A` is identified with vertex `g[v]` of `B`;
//! - facet `g[f]` of `B` is automatically glued back to `A` with `g⁻¹`.
//!
//! Permutations compose right to left: `(p * q)[i] = p[q[i]]`.
//!
//! # Isomorphism Signatures
//!
//! [`Triangulation::iso_sig`](core::triangulation::Triangulation::iso_sig) returns a compact
//! printable string that is identical for two triangulations if and only if they are
//! combinatorially isomorphic, and
//! [`Triangulation::from_iso_sig`](core::triangulation::Triangulation::from_iso_sig) rebuilds a
//! triangulation from it:
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! // The figure-eight knot complement.
//! let fig8 = Triangulation::<3>::from_iso_sig("cPcbbbiht").unwrap();
//! assert_eq!(fig8.size(), 2);
//! assert!(fig8.is_ideal());
//! assert_eq!(fig8.iso_sig(), "cPcbbbiht");
//! ```
//!
//! # Locks and Change Spans
//!
//! - A locked simplex cannot be removed and none of its facets can be glued or unglued.
//! - A locked facet cannot be glued or unglued, and locking a glued facet locks both sides.
//! - Every failing operation reports
//!   [`LockViolation`](core::triangulation::LockViolation) (or an invalid-argument error)
//!   *before* modifying anything.
//! - Every public mutator runs inside a [`ChangeSpan`](core::change_span::ChangeSpan);
//!   nested spans coalesce so that subscribers are notified exactly once per outermost span.
//!
//! # Surgery
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let mut fig8 = Triangulation::<3>::from_iso_sig("cPcbbbiht").unwrap();
//! assert!(fig8.ideal_to_finite().unwrap());
//! assert!(!fig8.is_ideal());
//! assert!(fig8.has_boundary_facets());
//! assert!(fig8.is_orientable());
//! ```

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

/// The `core` module contains the triangulation data structure and its algorithms.
///
/// It includes the [`Triangulation`](core::triangulation::Triangulation) container, the
/// [`Perm`](core::perm::Perm) gluing permutations, the lazily computed
/// [`Skeleton`](core::skeleton::Skeleton) and isomorphisms. Surgery and signature decoding
/// assemble their results in a crate-private staging triangulation that is validated when
/// it is handed over.
pub mod core {
    /// Algorithms that operate on whole triangulations
    pub mod algorithms {
        /// Connected sums of 3-manifold triangulations
        pub mod connected_sum;
        /// Canonical isomorphism signatures and reconstruction
        pub mod signature;
        /// Ideal-to-finite subdivision and puncturing
        pub mod subdivision;
    }
    /// Grouped change notification
    pub mod change_span;
    /// Collection types used throughout the crate
    pub mod collections;
    pub mod isomorphism;
    pub mod perm;
    pub mod simplex;
    pub mod skeleton;
    pub(crate) mod staging;
    pub(crate) mod store;
    pub mod triangulation;
    pub mod util;

    // Re-export the `core` modules.
    pub use change_span::*;
    pub use isomorphism::*;
    pub use perm::*;
    pub use simplex::*;
    pub use skeleton::*;
    pub use triangulation::*;
    // Note: collections module not re-exported here to avoid namespace pollution
}

/// Topological characteristics derived from the combinatorial structure.
///
/// This module provides f-vectors and Euler characteristics, and the manifold checks
/// built on top of vertex links.
pub mod topology {
    /// Numerical invariants of triangulated spaces
    pub mod characteristics {
        /// f-vectors and Euler characteristics
        pub mod euler;
    }
    pub mod manifold;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        algorithms::signature::SignatureError,
        change_span::*,
        isomorphism::*,
        perm::*,
        simplex::*,
        skeleton::*,
        triangulation::*,
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    // Re-export from topology
    pub use crate::topology::{
        characteristics::euler::{FVector, TopologyClassification},
        manifold::ManifoldError,
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
