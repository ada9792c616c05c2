//! Euler characteristic computation for triangulations.
//!
//! This module implements dimension-generic Euler characteristic calculation
//! using the formula: χ = Σ(-1)^k · `f_k` where `f_k` is the number of `k`-faces
//! of the triangulation (equivalence classes under the gluings, not faces of
//! individual simplices).
//!
//! # Examples
//!
//! ```rust
//! use simplicial::prelude::*;
//! use simplicial::topology::characteristics::euler;
//!
//! let mut tri = Triangulation::<3>::new();
//! tri.new_simplex();
//!
//! let counts = euler::count_simplices(&tri);
//! assert_eq!(counts.by_dim, vec![4, 6, 4, 1]);
//! assert_eq!(euler::euler_characteristic(&counts), 1); // Single tetrahedron has χ = 1
//! ```

use crate::core::triangulation::Triangulation;

/// Counts of `k`-faces for all dimensions 0 ≤ k ≤ D.
///
/// Stores the f-vector (f₀, f₁, ..., `f_D`) where `f_k` is the number of
/// `k`-faces:
/// - `f₀` = vertex classes
/// - `f₁` = edge classes
/// - `f_{D-1}` = facet classes (a glued pair counts once)
/// - `f_D` = top-dimensional simplices
///
/// # Examples
///
/// ```rust
/// use simplicial::topology::characteristics::euler::FVector;
///
/// // 2D triangle: 3 vertices, 3 edges, 1 face
/// let counts = FVector {
///     by_dim: vec![3, 3, 1],
/// };
///
/// assert_eq!(counts.count(0), 3);
/// assert_eq!(counts.count(1), 3);
/// assert_eq!(counts.count(2), 1);
/// assert_eq!(counts.count(3), 0); // out of range
/// assert_eq!(counts.dimension(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FVector {
    /// `by_dim[k]` = `f_k` = number of `k`-faces
    pub by_dim: Vec<usize>,
}

impl FVector {
    /// Get the number of `k`-faces.
    ///
    /// Returns 0 if `k` is out of range.
    #[must_use]
    #[inline]
    pub fn count(&self, k: usize) -> usize {
        self.by_dim.get(k).copied().unwrap_or(0)
    }

    /// The top dimension recorded in this vector.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.by_dim.len().saturating_sub(1)
    }
}

/// Topological classification of a triangulation.
///
/// # Variants
///
/// - `Empty`: No simplices (χ = 0)
/// - `SingleSimplex(D)`: One D-simplex with no gluings at all (χ = 1)
/// - `Closed(D)`: Valid, no unglued facets and no ideal vertices
/// - `Bounded(D)`: Valid, with unglued facets but no ideal vertices
/// - `Ideal(D)`: Valid, with at least one ideal vertex
/// - `Invalid`: Some face is identified with itself in reverse, or some vertex
///   link is not a sphere, a ball or a closed manifold
///
/// # Examples
///
/// ```rust
/// use simplicial::prelude::*;
/// use simplicial::topology::characteristics::euler::classify_triangulation;
///
/// let fig8 = Triangulation::<3>::from_iso_sig("cPcbbbiht").unwrap();
/// assert_eq!(classify_triangulation(&fig8), TopologyClassification::Ideal(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyClassification {
    /// Empty triangulation (no simplices).
    Empty,

    /// One unglued D-simplex.
    SingleSimplex(usize),

    /// A closed D-dimensional triangulation.
    Closed(usize),

    /// A D-dimensional triangulation with real boundary.
    Bounded(usize),

    /// A D-dimensional triangulation with ideal vertices.
    Ideal(usize),

    /// An invalid triangulation.
    Invalid,
}

/// Counts faces of every dimension.
///
/// Empty triangulations yield a vector of `D + 1` zeros.
#[must_use]
pub fn count_simplices<const D: usize>(tri: &Triangulation<D>) -> FVector {
    let skeleton = tri.skeleton();
    FVector {
        by_dim: (0..=D).map(|k| skeleton.count_faces(k)).collect(),
    }
}

/// Counts the faces of the real boundary, as a `(D-1)`-dimensional complex.
///
/// Ideal vertices are not part of the real boundary and are not counted.
/// A closed or ideal triangulation yields `D` zeros.
///
/// # Examples
///
/// ```rust
/// use simplicial::prelude::*;
/// use simplicial::topology::characteristics::euler::{count_boundary_simplices, euler_characteristic};
///
/// let mut tri = Triangulation::<3>::new();
/// tri.new_simplex();
///
/// let boundary = count_boundary_simplices(&tri);
/// assert_eq!(boundary.by_dim, vec![4, 6, 4]);
/// assert_eq!(euler_characteristic(&boundary), 2); // a 2-sphere
/// ```
#[must_use]
pub fn count_boundary_simplices<const D: usize>(tri: &Triangulation<D>) -> FVector {
    let skeleton = tri.skeleton();
    FVector {
        by_dim: (0..D)
            .map(|k| skeleton.faces(k).iter().filter(|f| f.is_boundary()).count())
            .collect(),
    }
}

/// Computes χ = Σ(-1)^k · `f_k` from an f-vector.
#[must_use]
#[allow(clippy::cast_possible_wrap)] // Face counts won't exceed isize::MAX in practice
pub fn euler_characteristic(counts: &FVector) -> isize {
    counts
        .by_dim
        .iter()
        .enumerate()
        .map(|(k, &f_k)| {
            let sign = if k % 2 == 0 { 1 } else { -1 };
            sign * (f_k as isize)
        })
        .sum()
}

/// Classifies a triangulation from its skeleton.
#[must_use]
pub fn classify_triangulation<const D: usize>(tri: &Triangulation<D>) -> TopologyClassification {
    if tri.is_empty() {
        return TopologyClassification::Empty;
    }
    if !tri.is_valid() {
        return TopologyClassification::Invalid;
    }
    if tri.size() == 1 && tri.count_boundary_facets() == D + 1 {
        TopologyClassification::SingleSimplex(D)
    } else if tri.is_ideal() {
        TopologyClassification::Ideal(D)
    } else if tri.has_boundary_facets() {
        TopologyClassification::Bounded(D)
    } else {
        TopologyClassification::Closed(D)
    }
}

/// The Euler characteristic implied by a classification alone, if there is one.
///
/// Closed odd-dimensional manifolds always have χ = 0. Other classes do not
/// determine χ without further information.
///
/// # Examples
///
/// ```rust
/// use simplicial::topology::characteristics::euler::{TopologyClassification, expected_chi_for};
///
/// assert_eq!(expected_chi_for(&TopologyClassification::Closed(3)), Some(0));
/// assert_eq!(expected_chi_for(&TopologyClassification::Closed(2)), None);
/// assert_eq!(expected_chi_for(&TopologyClassification::SingleSimplex(4)), Some(1));
/// ```
#[must_use]
pub const fn expected_chi_for(classification: &TopologyClassification) -> Option<isize> {
    match *classification {
        TopologyClassification::Empty => Some(0),
        TopologyClassification::SingleSimplex(_) => Some(1),
        TopologyClassification::Closed(d) if d % 2 == 1 => Some(0),
        _ => None,
    }
}

// =============================================================================
// CONSISTENCY CHECK
// =============================================================================

/// Result of comparing the computed Euler characteristic with the expected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyCheckResult {
    /// Computed Euler characteristic.
    pub chi: isize,

    /// Expected Euler characteristic, when it can be determined.
    pub expected: Option<isize>,

    /// Classification used to derive the expectation.
    pub classification: TopologyClassification,

    /// Face counts the characteristic was computed from.
    pub counts: FVector,

    /// Diagnostic notes (mismatches).
    pub notes: Vec<String>,
}

impl TopologyCheckResult {
    /// `true` when there is no expectation or it matches.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.expected.is_none_or(|exp| self.chi == exp)
    }
}

/// Computes χ and checks it against what the classification predicts.
///
/// Beyond [`expected_chi_for`], two further identities are used in dimension 3:
/// a bounded manifold has χ(M) = χ(∂M) / 2, and a triangulation without unglued
/// facets has χ = Σ_v (1 − χ(link v) / 2), which also covers ideal vertices.
#[must_use]
pub fn check_euler_characteristic<const D: usize>(tri: &Triangulation<D>) -> TopologyCheckResult {
    let counts = count_simplices(tri);
    let chi = euler_characteristic(&counts);
    let classification = classify_triangulation(tri);

    let expected = expected_chi_for(&classification).or_else(|| match classification {
        TopologyClassification::Bounded(d) if d % 2 == 1 => {
            Some(euler_characteristic(&count_boundary_simplices(tri)) / 2)
        }
        TopologyClassification::Ideal(3) if !tri.has_boundary_facets() => {
            let twice: i64 = tri
                .skeleton()
                .vertex_links()
                .iter()
                .map(|link| 2 - link.euler_characteristic())
                .sum();
            isize::try_from(twice / 2).ok()
        }
        _ => None,
    });

    let mut notes = Vec::new();
    if let Some(exp) = expected.filter(|&exp| chi != exp) {
        notes.push(format!(
            "Euler characteristic mismatch: computed {chi}, expected {exp}"
        ));
    }
    tracing::debug!(chi, ?expected, ?classification, "checked Euler characteristic");

    TopologyCheckResult {
        chi,
        expected,
        classification,
        counts,
        notes,
    }
}

impl<const D: usize> Triangulation<D> {
    /// The f-vector of this triangulation.
    ///
    /// ```rust
    /// use simplicial::prelude::*;
    ///
    /// let sphere = Triangulation::<3>::from_iso_sig("cPcbbbaaa").unwrap();
    /// assert_eq!(sphere.f_vector().by_dim, vec![4, 6, 4, 2]);
    /// ```
    #[must_use]
    pub fn f_vector(&self) -> FVector {
        count_simplices(self)
    }

    /// The Euler characteristic computed from the f-vector.
    #[must_use]
    pub fn euler_characteristic(&self) -> isize {
        euler_characteristic(&self.f_vector())
    }
}
