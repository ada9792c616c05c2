//! Combinatorial isomorphisms between triangulations.
//!
//! An [`Isomorphism<D>`] sends simplex `i` to simplex `simp_image(i)` and, within that
//! simplex, vertex `v` to vertex `facet_perm(i)[v]`. Applying it to a triangulation
//! relabels every gluing: if facet `f` of `i` is glued to `j` via `g`, the image has
//! facet `facet_perm(i)[f]` of `simp_image(i)` glued to `simp_image(j)` via
//! `facet_perm(j) * g * facet_perm(i)⁻¹`.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::core::perm::Perm;
use crate::core::simplex::SIMPLEX_LOCK_BIT;
use crate::core::store::SimplexStore;
use crate::core::triangulation::{Triangulation, TriangulationError};

/// A relabelling of simplices and, per simplex, of vertices.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIsomorphism")]
pub struct Isomorphism<const D: usize> {
    simp_image: Vec<usize>,
    facet_perm: Vec<Perm>,
}

#[derive(Deserialize)]
struct RawIsomorphism {
    simp_image: Vec<usize>,
    facet_perm: Vec<Perm>,
}

impl<const D: usize> TryFrom<RawIsomorphism> for Isomorphism<D> {
    type Error = TriangulationError;

    fn try_from(raw: RawIsomorphism) -> Result<Self, Self::Error> {
        Self::new(raw.simp_image, raw.facet_perm)
    }
}

impl<const D: usize> Isomorphism<D> {
    /// The identity on `size` simplices.
    #[must_use]
    pub fn identity(size: usize) -> Self {
        Self {
            simp_image: (0..size).collect(),
            facet_perm: vec![Perm::identity(D + 1); size],
        }
    }

    /// Builds an isomorphism from explicit images.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidConstruction`] if `simp_image` is not a
    /// permutation of `0..simp_image.len()`, if the lengths differ, or if some vertex
    /// permutation does not have size `D + 1`.
    pub fn new(simp_image: Vec<usize>, facet_perm: Vec<Perm>) -> Result<Self, TriangulationError> {
        let fail = |message: String| Err(TriangulationError::InvalidConstruction { message });
        let n = simp_image.len();
        if facet_perm.len() != n {
            return fail(format!(
                "{n} simplex images but {} vertex permutations",
                facet_perm.len()
            ));
        }
        let mut seen = vec![false; n];
        for &image in &simp_image {
            if image >= n || seen[image] {
                return fail(format!("simplex images are not a permutation of 0..{n}"));
            }
            seen[image] = true;
        }
        if let Some(bad) = facet_perm.iter().find(|p| p.len() != D + 1) {
            return fail(format!("vertex permutation {bad} does not have size {}", D + 1));
        }
        Ok(Self {
            simp_image,
            facet_perm,
        })
    }

    /// Builds an isomorphism from parts already known to be consistent.
    pub(crate) const fn from_parts(simp_image: Vec<usize>, facet_perm: Vec<Perm>) -> Self {
        Self {
            simp_image,
            facet_perm,
        }
    }

    /// A uniformly random isomorphism on `size` simplices.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let mut simp_image: Vec<usize> = (0..size).collect();
        simp_image.shuffle(rng);
        let facet_perm = (0..size)
            .map(|_| {
                let mut images: Vec<usize> = (0..=D).collect();
                images.shuffle(rng);
                Perm::from_valid_images(images)
            })
            .collect();
        Self {
            simp_image,
            facet_perm,
        }
    }

    /// Number of simplices in the source (and target).
    #[must_use]
    pub fn size(&self) -> usize {
        self.simp_image.len()
    }

    /// Whether this isomorphism acts on no simplices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.simp_image.is_empty()
    }

    /// The image of simplex `simplex`.
    ///
    /// # Panics
    ///
    /// Panics if `simplex >= self.size()`.
    #[must_use]
    pub fn simp_image(&self, simplex: usize) -> usize {
        self.simp_image[simplex]
    }

    /// The vertex relabelling applied to simplex `simplex`.
    ///
    /// # Panics
    ///
    /// Panics if `simplex >= self.size()`.
    #[must_use]
    pub fn facet_perm(&self, simplex: usize) -> Perm {
        self.facet_perm[simplex]
    }

    /// All simplex images, indexed by source simplex.
    #[must_use]
    pub fn simp_images(&self) -> &[usize] {
        &self.simp_image
    }

    /// All vertex relabellings, indexed by source simplex.
    #[must_use]
    pub fn facet_perms(&self) -> &[Perm] {
        &self.facet_perm
    }

    /// The image `(simplex, facet)` of facet `facet` of `simplex`.
    #[must_use]
    pub fn map_facet(&self, simplex: usize, facet: usize) -> (usize, usize) {
        (
            self.simp_image[simplex],
            self.facet_perm[simplex].apply(facet),
        )
    }

    /// Whether every simplex and vertex maps to itself.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.simp_image.iter().enumerate().all(|(i, &s)| i == s)
            && self.facet_perm.iter().all(Perm::is_identity)
    }

    /// The inverse isomorphism.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let n = self.size();
        let mut simp_image = vec![0; n];
        let mut facet_perm = vec![Perm::identity(D + 1); n];
        for (i, &image) in self.simp_image.iter().enumerate() {
            simp_image[image] = i;
            facet_perm[image] = self.facet_perm[i].inverse();
        }
        Self {
            simp_image,
            facet_perm,
        }
    }

    /// The isomorphism applying `first`, then `self`.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::IsomorphismSize`] if the sizes differ.
    pub fn compose(&self, first: &Self) -> Result<Self, TriangulationError> {
        if self.size() != first.size() {
            return Err(TriangulationError::IsomorphismSize {
                expected: self.size(),
                found: first.size(),
            });
        }
        let (simp_image, facet_perm) = first
            .simp_image
            .iter()
            .zip(&first.facet_perm)
            .map(|(&mid, &p)| (self.simp_image[mid], self.facet_perm[mid] * p))
            .unzip();
        Ok(Self {
            simp_image,
            facet_perm,
        })
    }

    /// Returns the image of `tri` under this isomorphism.
    ///
    /// Each simplex carries its UUID, label and locks to its new position; facet locks
    /// follow the vertex relabelling.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::IsomorphismSize`] if the sizes differ.
    pub fn apply(&self, tri: &Triangulation<D>) -> Result<Triangulation<D>, TriangulationError> {
        self.relabel(tri.store()).map(Triangulation::from_store)
    }

    /// Relabels `tri` in place, firing one change notification.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::IsomorphismSize`] if the sizes differ.
    pub fn apply_in_place(&self, tri: &mut Triangulation<D>) -> Result<(), TriangulationError> {
        let relabelled = self.relabel(tri.store())?;
        let mut span = tri.change_span();
        *span.store_mut() = relabelled;
        Ok(())
    }

    fn relabel(&self, store: &SimplexStore<D>) -> Result<SimplexStore<D>, TriangulationError> {
        let n = store.len();
        if self.size() != n {
            return Err(TriangulationError::IsomorphismSize {
                expected: n,
                found: self.size(),
            });
        }
        let source_of = self.inverse().simp_image;

        let mut out = SimplexStore::new();
        for &source in &source_of {
            let Some(simplex) = store.get(source) else {
                continue;
            };
            let index = out.push_with_uuid(simplex.label().to_string(), simplex.uuid());
            let p = self.facet_perm[source];
            let locks = (0..=D)
                .filter(|&f| simplex.is_facet_locked(f))
                .fold(simplex.locks() & SIMPLEX_LOCK_BIT, |acc, f| {
                    acc | (1 << p.apply(f))
                });
            if let Some(new) = out.get_mut(index) {
                new.set_locks(locks);
            }
        }

        for i in 0..n {
            let p = self.facet_perm[i];
            for f in 0..=D {
                let Some((j, g)) = store.adjacent(i, f) else {
                    continue;
                };
                let (image, facet) = self.map_facet(i, f);
                if out.adjacent(image, facet).is_none() {
                    out.join(
                        image,
                        facet,
                        self.simp_image[j],
                        self.facet_perm[j] * g * p.inverse(),
                    );
                }
            }
        }
        Ok(out)
    }
}

impl<const D: usize> fmt::Display for Isomorphism<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (image, perm)) in self.simp_image.iter().zip(&self.facet_perm).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{i} -> {image} ({perm})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn perm(images: &[usize]) -> Perm {
        Perm::from_images(images).unwrap()
    }

    fn figure_eight() -> Triangulation<3> {
        let mut tri = Triangulation::<3>::new();
        tri.new_simplices(2);
        tri.join(0, 0, 1, perm(&[1, 3, 0, 2])).unwrap();
        tri.join(0, 1, 1, perm(&[2, 0, 3, 1])).unwrap();
        tri.join(0, 2, 1, perm(&[0, 3, 2, 1])).unwrap();
        tri.join(0, 3, 1, perm(&[2, 1, 0, 3])).unwrap();
        tri
    }

    #[test]
    fn test_identity_apply_is_identical() {
        let tri = figure_eight();
        let iso = Isomorphism::<3>::identity(2);
        assert!(iso.is_identity());
        assert!(iso.apply(&tri).unwrap().is_identical_to(&tri));
    }

    #[test]
    fn test_apply_relabels_gluings() {
        let tri = figure_eight();
        let iso = Isomorphism::<3>::new(vec![1, 0], vec![perm(&[1, 0, 2, 3]), Perm::identity(4)])
            .unwrap();
        let image = iso.apply(&tri).unwrap();
        assert!(image.validate_structure().is_ok());
        // Facet 0 of simplex 0 becomes facet 1 of simplex 1.
        let (j, g) = image.adjacent(1, 1).unwrap();
        assert_eq!(j, 0);
        assert_eq!(g, perm(&[1, 3, 0, 2]) * perm(&[1, 0, 2, 3]).inverse());
        assert!(!image.is_identical_to(&tri));
        assert_eq!(image.count_vertices(), 1);
    }

    #[test]
    fn test_inverse_and_compose() {
        let mut rng = StdRng::seed_from_u64(7);
        let tri = figure_eight();
        let iso = Isomorphism::<3>::random(2, &mut rng);
        let inverse = iso.inverse();
        assert!(iso.compose(&inverse).unwrap().is_identity());
        assert!(inverse.compose(&iso).unwrap().is_identity());

        let there = iso.apply(&tri).unwrap();
        let back = inverse.apply(&there).unwrap();
        assert!(back.is_identical_to(&tri));

        let other = Isomorphism::<3>::random(2, &mut rng);
        let both = other.compose(&iso).unwrap();
        assert!(
            both.apply(&tri)
                .unwrap()
                .is_identical_to(&other.apply(&there).unwrap())
        );
    }

    #[test]
    fn test_apply_transports_identity_and_locks() {
        let mut tri = figure_eight();
        tri.set_label(0, "zero").unwrap();
        tri.lock_simplex(1).unwrap();
        let uuid0 = tri.simplex(0).unwrap().uuid();
        let iso = Isomorphism::<3>::new(vec![1, 0], vec![perm(&[3, 2, 1, 0]), Perm::identity(4)])
            .unwrap();

        iso.apply_in_place(&mut tri).unwrap();
        assert_eq!(tri.index_of(&uuid0), Some(1));
        assert_eq!(tri.simplex(1).unwrap().label(), "zero");
        assert!(tri.simplex(0).unwrap().is_locked());
        assert!(tri.validate_structure().is_ok());
    }

    #[test]
    fn test_size_and_construction_errors() {
        let tri = figure_eight();
        assert_eq!(
            Isomorphism::<3>::identity(3).apply(&tri).unwrap_err(),
            TriangulationError::IsomorphismSize {
                expected: 2,
                found: 3
            }
        );
        assert!(Isomorphism::<3>::new(vec![0, 0], vec![Perm::identity(4); 2]).is_err());
        assert!(Isomorphism::<3>::new(vec![0], vec![Perm::identity(3)]).is_err());
        assert!(Isomorphism::<3>::new(vec![0], vec![]).is_err());
    }

    #[test]
    fn test_display_and_serde() {
        let iso = Isomorphism::<2>::new(vec![1, 0], vec![perm(&[1, 2, 0]), Perm::identity(3)])
            .unwrap();
        assert_eq!(iso.to_string(), "0 -> 1 (120), 1 -> 0 (012)");
        let json = serde_json::to_string(&iso).unwrap();
        let back: Isomorphism<2> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, iso);
        assert!(serde_json::from_str::<Isomorphism<2>>(r#"{"simp_image":[0,0],"facet_perm":[[0,1,2],[0,1,2]]}"#).is_err());
    }
}
