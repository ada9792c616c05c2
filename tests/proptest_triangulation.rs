//! Property-based tests for triangulations built from random gluings.
//!
//! This module uses proptest to drive random sequences of `join`/`unjoin` calls
//! across dimensions 2D-5D and checks the invariants every triangulation must keep.
//!
//! ## Test Properties
//!
//! 1. **Gluing Symmetry**: every glued facet is glued back with the inverse permutation
//! 2. **Structural Validity**: `validate_structure` never fails after public mutations
//! 3. **Signature Round Trip**: decoding a signature and re-encoding it is the identity
//! 4. **Signature Invariance**: relabelling by a random isomorphism keeps the signature
//! 5. **Face Counts**: the f-vector matches the size and the skeleton

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use simplicial::prelude::*;
use simplicial::topology::characteristics::euler;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// One attempted gluing: `(simplex, facet, adjacent, permutation index)`.
///
/// Indices are taken modulo the current size, so every attempt addresses an existing
/// simplex; attempts that the triangulation rejects are simply skipped.
type Attempt = (usize, usize, usize, u64);

fn attempts(dimension: usize) -> impl Strategy<Value = Vec<Attempt>> {
    prop::collection::vec(
        (
            any::<usize>(),
            0..=dimension,
            any::<usize>(),
            0..factorial(dimension + 1),
        ),
        0..24,
    )
}

/// Builds a triangulation of `size` simplices and applies the attempted gluings.
fn build<const D: usize>(size: usize, gluings: &[Attempt]) -> Triangulation<D> {
    let mut tri = Triangulation::<D>::new();
    tri.new_simplices(size);
    for &(simplex, facet, adjacent, index) in gluings {
        let perm = Perm::from_index(D + 1, index).unwrap();
        let _ = tri.join(simplex % size, facet, adjacent % size, perm);
    }
    tri
}

fn check_symmetry<const D: usize>(tri: &Triangulation<D>) -> Result<(), TestCaseError> {
    for simplex in 0..tri.size() {
        for facet in 0..=D {
            if let Some((adjacent, gluing)) = tri.adjacent(simplex, facet) {
                let back = gluing.apply(facet);
                prop_assert_eq!(
                    tri.adjacent(adjacent, back),
                    Some((simplex, gluing.inverse())),
                    "{}D: gluing on facet {} of simplex {} is not symmetric",
                    D,
                    facet,
                    simplex
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// PROPERTY-BASED TESTS - RANDOM GLUINGS
// =============================================================================

macro_rules! test_triangulation_properties {
    ($dim:literal, $max_size:literal $(, #[$attr:meta])*) => {
        pastey::paste! {
            proptest! {
                /// Property: gluings are symmetric and the structure validates
                $(#[$attr])*
                #[test]
                fn [<prop_gluings_symmetric_ $dim d>](
                    size in 1_usize..=$max_size,
                    gluings in attempts($dim),
                ) {
                    let tri = build::<$dim>(size, &gluings);
                    prop_assert!(tri.validate_structure().is_ok());
                    check_symmetry(&tri)?;

                    let glued = (0..tri.size())
                        .flat_map(|s| (0..=$dim).map(move |f| (s, f)))
                        .filter(|&(s, f)| tri.adjacent(s, f).is_some())
                        .count();
                    prop_assert_eq!(glued + tri.count_boundary_facets(), size * ($dim + 1));
                    prop_assert_eq!(glued % 2, 0);
                }

                /// Property: unjoining every facet leaves isolated simplices
                $(#[$attr])*
                #[test]
                fn [<prop_unjoin_restores_isolation_ $dim d>](
                    size in 1_usize..=$max_size,
                    gluings in attempts($dim),
                ) {
                    let mut tri = build::<$dim>(size, &gluings);
                    for simplex in 0..size {
                        tri.isolate(simplex).unwrap();
                    }
                    prop_assert_eq!(tri.count_boundary_facets(), size * ($dim + 1));
                    prop_assert_eq!(tri.count_components(), size);
                    check_symmetry(&tri)?;
                }

                /// Property: decoding then re-encoding a signature is the identity
                $(#[$attr])*
                #[test]
                fn [<prop_signature_round_trip_ $dim d>](
                    size in 0_usize..=$max_size,
                    gluings in attempts($dim),
                ) {
                    let tri = if size == 0 {
                        Triangulation::<$dim>::new()
                    } else {
                        build::<$dim>(size, &gluings)
                    };
                    let sig = tri.iso_sig();
                    let decoded = Triangulation::<$dim>::from_iso_sig(&sig).unwrap();
                    prop_assert_eq!(decoded.size(), tri.size());
                    prop_assert_eq!(decoded.iso_sig(), sig.clone());
                    prop_assert!(decoded.is_isomorphic_to(&tri).is_some());

                    let (relabelled_sig, relabelling) = tri.iso_sig_with_relabelling();
                    prop_assert_eq!(&relabelled_sig, &sig);
                    let canonical = relabelling.apply(&tri).unwrap();
                    prop_assert!(canonical.is_identical_to(&decoded));
                }

                /// Property: the signature is invariant under relabelling
                $(#[$attr])*
                #[test]
                fn [<prop_signature_invariant_ $dim d>](
                    size in 1_usize..=$max_size,
                    gluings in attempts($dim),
                    seed in any::<u64>(),
                ) {
                    let tri = build::<$dim>(size, &gluings);
                    let mut rng = StdRng::seed_from_u64(seed);
                    let iso = Isomorphism::<$dim>::random(size, &mut rng);
                    let relabelled = iso.apply(&tri).unwrap();

                    prop_assert_eq!(relabelled.iso_sig(), tri.iso_sig());
                    prop_assert_eq!(relabelled.count_vertices(), tri.count_vertices());
                    prop_assert_eq!(relabelled.is_orientable(), tri.is_orientable());
                    prop_assert!(iso.inverse().apply(&relabelled).unwrap().is_identical_to(&tri));
                }

                /// Property: face counts are consistent with the triangulation
                $(#[$attr])*
                #[test]
                fn [<prop_face_counts_consistent_ $dim d>](
                    size in 1_usize..=$max_size,
                    gluings in attempts($dim),
                ) {
                    let tri = build::<$dim>(size, &gluings);
                    let counts = tri.f_vector();
                    prop_assert_eq!(counts.dimension(), $dim);
                    prop_assert_eq!(counts.count($dim), size);
                    prop_assert_eq!(counts.count(0), tri.count_vertices());

                    // Every facet class is either a glued pair or a single boundary facet.
                    let boundary = tri.count_boundary_facets();
                    prop_assert_eq!(
                        counts.count($dim - 1),
                        boundary + (size * ($dim + 1) - boundary) / 2
                    );
                    prop_assert_eq!(
                        euler::euler_characteristic(&counts),
                        tri.euler_characteristic()
                    );
                }
            }
        }
    };
}

test_triangulation_properties!(2, 6);
test_triangulation_properties!(3, 5);
test_triangulation_properties!(4, 4);
test_triangulation_properties!(5, 3, #[ignore = "slow: 720 candidate labellings per start"]);

// =============================================================================
// DETERMINISTIC SANITY CHECKS
// =============================================================================

#[test]
fn test_random_isomorphisms_compose() {
    let mut rng = StdRng::seed_from_u64(42);
    let tri = Triangulation::<3>::from_iso_sig("cPcbbbiht").unwrap();
    let first = Isomorphism::<3>::random(2, &mut rng);
    let second = Isomorphism::<3>::random(2, &mut rng);

    let composed = second.compose(&first).unwrap();
    let stepwise = second.apply(&first.apply(&tri).unwrap()).unwrap();
    assert!(composed.apply(&tri).unwrap().is_identical_to(&stepwise));
}
