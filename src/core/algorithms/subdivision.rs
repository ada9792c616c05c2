//! Subdivision surgery on 3-dimensional triangulations.
//!
//! - [`Triangulation::ideal_to_finite`] truncates ideal and invalid vertices, turning
//!   each into a real boundary component.
//! - [`Triangulation::puncture`] removes a small ball from the interior of a
//!   tetrahedron, creating a new 2-sphere boundary component.
//!
//! Both build their result without intermediate skeleton recomputation and publish it
//! in a single change.

use crate::core::perm::{Perm, PermError};
use crate::core::staging::StagingTriangulation;
use crate::core::triangulation::{Triangulation, TriangulationError};

/// Tetrahedra created per original tetrahedron by [`Triangulation::ideal_to_finite`].
pub const TRUNCATION_GADGET_SIZE: usize = 32;

/// Tetrahedra added by [`Triangulation::puncture`].
pub const PUNCTURE_GADGET_SIZE: usize = 6;

/// Positions of the 32 sub-tetrahedra inside one truncation gadget.
///
/// For each vertex `j` of the original tetrahedron there is a `tip` (the corner cut
/// off at `j`), an `interior` piece, and for each other vertex `k` an `edge` piece
/// (near edge `jk`, on the side of `j`) and a `vertex` piece.
struct TruncationLayout {
    tip: [usize; 4],
    interior: [usize; 4],
    edge: [[usize; 4]; 4],
    vertex: [[usize; 4]; 4],
}

impl TruncationLayout {
    const fn new() -> Self {
        let mut layout = Self {
            tip: [0; 4],
            interior: [0; 4],
            edge: [[0; 4]; 4],
            vertex: [[0; 4]; 4],
        };
        let mut next = 0;
        let mut j = 0;
        while j < 4 {
            layout.tip[j] = next;
            layout.interior[j] = next + 1;
            next += 2;
            let mut k = 0;
            while k < 4 {
                if j != k {
                    layout.edge[j][k] = next;
                    layout.vertex[j][k] = next + 1;
                    next += 2;
                }
                k += 1;
            }
            j += 1;
        }
        layout
    }
}

const LAYOUT: TruncationLayout = TruncationLayout::new();

/// Builds the truncated complex: each tetrahedron is cut into a gadget, gadgets are glued
/// along the original gluings, and every sub-tetrahedron touching an ideal or invalid
/// vertex is discarded.
fn truncate(tri: &Triangulation<3>) -> StagingTriangulation<3> {
    let n = tri.size();
    let id = Perm::identity(4);
    let mut staging = StagingTriangulation::<3>::new();
    staging.new_simplices(TRUNCATION_GADGET_SIZE * n);

    for i in 0..n {
        let at = |slot: usize| TRUNCATION_GADGET_SIZE * i + slot;
        for j in 0..4 {
            staging.join(at(LAYOUT.tip[j]), j, at(LAYOUT.interior[j]), id);
        }
        for j in 0..4 {
            for k in (0..4).filter(|&k| k != j) {
                staging.join(at(LAYOUT.interior[j]), k, at(LAYOUT.vertex[k][j]), id);
            }
        }
        for j in 0..4 {
            for k in (0..4).filter(|&k| k != j) {
                if j < k {
                    staging.join(
                        at(LAYOUT.edge[j][k]),
                        j,
                        at(LAYOUT.edge[k][j]),
                        Perm::transposition(4, j, k),
                    );
                }
                for l in (0..4).filter(|&l| l != j && l != k) {
                    staging.join(
                        at(LAYOUT.edge[j][k]),
                        l,
                        at(LAYOUT.vertex[j][l]),
                        Perm::transposition(4, k, l),
                    );
                }
            }
        }
    }

    for i in 0..n {
        for j in 0..4 {
            let Some((o, p)) = tri.adjacent(i, j) else {
                continue;
            };
            if o < i || (o == i && p.apply(j) < j) {
                continue;
            }
            let here = |slot: usize| TRUNCATION_GADGET_SIZE * i + slot;
            let there = |slot: usize| TRUNCATION_GADGET_SIZE * o + slot;
            for k in (0..4).filter(|&k| k != j) {
                staging.join(here(LAYOUT.tip[k]), j, there(LAYOUT.tip[p.apply(k)]), p);
            }
            for k in (0..4).filter(|&k| k != j) {
                staging.join(
                    here(LAYOUT.edge[j][k]),
                    k,
                    there(LAYOUT.edge[p.apply(j)][p.apply(k)]),
                    p,
                );
            }
            for k in (0..4).filter(|&k| k != j) {
                staging.join(
                    here(LAYOUT.vertex[j][k]),
                    k,
                    there(LAYOUT.vertex[p.apply(j)][p.apply(k)]),
                    p,
                );
            }
        }
    }

    let skeleton = staging.skeleton();
    let bad_vertex: Vec<bool> = skeleton
        .vertex_links()
        .iter()
        .map(|link| !link.kind().is_regular())
        .collect();
    let flagged: Vec<bool> = (0..staging.size())
        .map(|s| {
            (0..4).any(|v| {
                skeleton
                    .simplex_face(0, s, v)
                    .is_some_and(|vertex| bad_vertex[vertex])
            })
        })
        .collect();
    tracing::debug!(
        built = staging.size(),
        removed = flagged.iter().filter(|&&f| f).count(),
        "truncating ideal and invalid vertices"
    );
    staging.remove_flagged(&flagged);
    staging
}

/// Two triangular prisms glued along their rectangular walls.
///
/// Tetrahedron `2 * j + i` is piece `j` of prism `i`. Facet 3 of tetrahedron 0 receives
/// the punctured tetrahedron and facet 0 of tetrahedron 1 its former neighbour; facet 0
/// of tetrahedra 4 and 5 forms the new boundary sphere.
fn puncture_gadget() -> Result<StagingTriangulation<3>, PermError> {
    let cycle = Perm::from_images(&[3, 0, 1, 2])?;
    let shift = Perm::from_images(&[1, 2, 3, 0])?;
    let swap = Perm::from_images(&[0, 1, 3, 2])?;
    let prism = |i: usize, j: usize| 2 * j + i;

    let mut staging = StagingTriangulation::<3>::new();
    staging.new_simplices(PUNCTURE_GADGET_SIZE);
    staging.join(prism(0, 0), 0, prism(0, 1), cycle);
    staging.join(prism(0, 1), 0, prism(0, 2), cycle);
    staging.join(prism(1, 0), 1, prism(1, 1), cycle);
    staging.join(prism(1, 1), 1, prism(1, 2), Perm::from_images(&[3, 2, 0, 1])?);
    for j in 0..2 {
        staging.join(prism(0, j), 1, prism(1, j), shift);
        staging.join(prism(0, j), 2, prism(1, j), shift);
    }
    staging.join(prism(0, 2), 1, prism(1, 2), swap);
    staging.join(prism(0, 2), 2, prism(1, 2), swap);
    Ok(staging)
}

impl Triangulation<3> {
    /// Converts ideal (and invalid) vertices into real boundary components.
    ///
    /// Each tetrahedron is replaced by 32 smaller ones, after which everything meeting
    /// an ideal or invalid vertex is deleted. Returns `Ok(false)`, leaving the
    /// triangulation untouched, if it is empty or valid with no ideal vertices.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::LockViolation`] if any simplex or facet is locked.
    pub fn ideal_to_finite(&mut self) -> Result<bool, TriangulationError> {
        if self.is_empty() || (self.is_valid() && !self.is_ideal()) {
            return Ok(false);
        }
        if let Some(violation) = self.first_lock() {
            return Err(violation.into());
        }
        let staging = truncate(self);
        self.adopt_staging(staging)?;
        Ok(true)
    }

    /// Punctures tetrahedron `at` (default `0`), removing a ball from its interior.
    ///
    /// Six tetrahedra forming two triangular prisms are inserted between facet 0 of
    /// `at` and whatever it was glued to. The new 2-sphere boundary consists of facet 0
    /// of the last two tetrahedra. An empty triangulation is left unchanged.
    ///
    /// # Errors
    ///
    /// - [`TriangulationError::SimplexIndexOutOfRange`] if `at` is not a valid index.
    /// - [`TriangulationError::LockViolation`] if `at`, its facet 0, or the neighbour across
    ///   that facet is locked.
    pub fn puncture(&mut self, at: Option<usize>) -> Result<(), TriangulationError> {
        if self.is_empty() {
            return Ok(());
        }
        let tet = at.unwrap_or(0);
        self.check_index(tet)?;
        self.check_unjoin_locks(tet, 0)?;

        let gadget = puncture_gadget()?;
        let cycle = Perm::from_images(&[3, 0, 1, 2])?;

        let mut span = self.change_span();
        let first = span.append_staging(gadget)?;
        let store = span.store_mut();
        if let Some((adjacent, gluing)) = store.adjacent(tet, 0) {
            store.unjoin(tet, 0);
            store.join(first + 1, 0, adjacent, gluing);
        }
        store.join(tet, 0, first, cycle);
        tracing::debug!(tet, "punctured tetrahedron");
        Ok(())
    }
}
