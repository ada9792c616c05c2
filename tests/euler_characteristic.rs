//! Deterministic integration tests for f-vectors, Euler characteristics and
//! manifold validation.
//!
//! ## Test Coverage
//!
//! - Empty triangulations (χ = 0)
//! - Single simplices (χ = 1) in 2D-5D
//! - Closed, bounded and ideal 3-manifolds from known signatures
//! - Manifold validation reports for ideal, non-orientable and invalid input

use simplicial::prelude::*;
use simplicial::topology::characteristics::euler;
use simplicial::topology::manifold::{
    InvariantKind, ManifoldError, ValidationOptions, validation_report,
};

// =============================================================================
// EULER CHARACTERISTIC
// =============================================================================

#[test]
fn test_empty_triangulation_euler() {
    let tri = Triangulation::<3>::new();

    let counts = euler::count_simplices(&tri);
    assert_eq!(counts.count(0), 0);
    assert_eq!(counts.count(3), 0);
    assert_eq!(euler::euler_characteristic(&counts), 0);

    let classification = euler::classify_triangulation(&tri);
    assert_eq!(classification, TopologyClassification::Empty);
    assert_eq!(euler::expected_chi_for(&classification), Some(0));
}

macro_rules! single_simplex_test {
    ($name:ident, $dim:literal, [$($count:literal),+]) => {
        #[test]
        fn $name() {
            let mut tri = Triangulation::<$dim>::new();
            tri.new_simplex();
            let result = euler::check_euler_characteristic(&tri);
            assert_eq!(result.counts.by_dim, vec![$($count),+]);
            assert_eq!(result.chi, 1);
            assert_eq!(result.classification, TopologyClassification::SingleSimplex($dim));
            assert!(result.is_consistent());
        }
    };
}

single_simplex_test!(test_2d_single_triangle, 2, [3, 3, 1]);
single_simplex_test!(test_3d_single_tetrahedron, 3, [4, 6, 4, 1]);
single_simplex_test!(test_4d_single_pentachoron, 4, [5, 10, 10, 5, 1]);
single_simplex_test!(test_5d_single_simplex, 5, [6, 15, 20, 15, 6, 1]);

#[test]
fn test_closed_spheres() {
    let mut s2 = Triangulation::<2>::new();
    s2.new_simplices(2);
    for edge in 0..3 {
        s2.join(0, edge, 1, Perm::identity(3)).unwrap();
    }
    assert_eq!(s2.euler_characteristic(), 2);
    assert_eq!(
        euler::classify_triangulation(&s2),
        TopologyClassification::Closed(2)
    );

    let s3 = Triangulation::<3>::from_iso_sig("cPcbbbaaa").unwrap();
    let result = euler::check_euler_characteristic(&s3);
    assert_eq!(result.chi, 0);
    assert_eq!(result.expected, Some(0));

    let mut s4 = Triangulation::<4>::new();
    s4.new_simplices(2);
    for facet in 0..5 {
        s4.join(0, facet, 1, Perm::identity(5)).unwrap();
    }
    assert_eq!(s4.f_vector().by_dim, vec![5, 10, 10, 5, 2]);
    assert_eq!(s4.euler_characteristic(), 2);
}

#[test]
fn test_ideal_manifolds() {
    for sig in ["cPcbbbiht", "bkaaid"] {
        let tri = Triangulation::<3>::from_iso_sig(sig).unwrap();
        let result = euler::check_euler_characteristic(&tri);
        assert_eq!(result.classification, TopologyClassification::Ideal(3), "{sig}");
        assert_eq!(result.chi, 1, "{sig}");
        assert_eq!(result.expected, Some(1), "{sig}");
    }
}

// =============================================================================
// MANIFOLD VALIDATION
// =============================================================================

#[test]
fn test_manifold_reports() {
    let fig8 = Triangulation::<3>::from_iso_sig("cPcbbbiht").unwrap();
    let report = validation_report(&fig8, ValidationOptions::default()).unwrap_err();
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].kind, InvariantKind::VertexLinks);
    assert!(matches!(
        report.violations[0].error,
        ManifoldError::IdealVertex { vertex: 0, .. }
    ));

    let gieseking = Triangulation::<3>::from_iso_sig("bkaaid").unwrap();
    let strict = ValidationOptions {
        allow_ideal: true,
        require_orientable: true,
    };
    let report = validation_report(&gieseking, strict).unwrap_err();
    assert!(report.has(InvariantKind::Orientability));

    let mut finite = gieseking.clone();
    finite.ideal_to_finite().unwrap();
    assert!(finite.is_manifold(ValidationOptions::default()));
}

#[test]
fn test_invalid_triangulation_report() {
    let mut tri = Triangulation::<3>::new();
    tri.new_simplex();
    tri.join(0, 0, 0, Perm::from_images(&[1, 0, 3, 2]).unwrap())
        .unwrap();
    assert!(!tri.is_valid());
    assert_eq!(
        euler::classify_triangulation(&tri),
        TopologyClassification::Invalid
    );

    let report = validation_report(
        &tri,
        ValidationOptions {
            allow_ideal: true,
            require_orientable: false,
        },
    )
    .unwrap_err();
    assert!(report.has(InvariantKind::FaceValidity));
    assert!(!report.has(InvariantKind::Structure));
}
