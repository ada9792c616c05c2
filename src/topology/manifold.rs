//! # Combinatorial manifold validation
//!
//! A triangulation that passes its structural checks (symmetric gluings, dense indices,
//! consistent UUID map) is a pseudo-manifold, but not necessarily a manifold. This module
//! certifies the stronger property from the skeleton.
//!
//! ## What is being validated
//!
//! 1. **Face validity**
//!    No face of dimension `1 ≤ k < D` is identified with itself under a non-identity
//!    map of its vertices (for example, an edge glued to itself in reverse).
//!
//! 2. **Vertex-link condition**
//!    The link of every vertex is a `(D−1)`-sphere for interior vertices or a
//!    `(D−1)`-ball for vertices on the real boundary. Vertices whose link is some other
//!    closed manifold are *ideal*; they are accepted only when
//!    [`ValidationOptions::allow_ideal`] is set.
//!
//! 3. **Orientability** (optional)
//!    Every connected component admits a consistent orientation.
//!
//! These conditions are enforced respectively by [`validate_faces`],
//! [`validate_vertex_links`] and [`validate_orientability`], and
//! [`validation_report`] runs all of them and collects every failure.
//!
//! Vertex links are classified through their Euler characteristic, which is exact in
//! dimension 3 (links are surfaces) but only a necessary condition in higher odd
//! dimensions.
//!
//! # Examples
//!
//! ```rust
//! use simplicial::prelude::*;
//! use simplicial::topology::manifold::{ValidationOptions, validation_report};
//!
//! let fig8 = Triangulation::<3>::from_iso_sig("cPcbbbiht").unwrap();
//! assert!(validation_report(&fig8, ValidationOptions::default()).is_err());
//!
//! let options = ValidationOptions {
//!     allow_ideal: true,
//!     ..ValidationOptions::default()
//! };
//! assert!(validation_report(&fig8, options).is_ok());
//! ```

use thiserror::Error;

use crate::core::skeleton::LinkKind;
use crate::core::triangulation::{Triangulation, TriangulationValidationError};

/// Errors that can occur during manifold validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ManifoldError {
    /// The underlying triangulation is structurally inconsistent.
    #[error(transparent)]
    Structure(#[from] TriangulationValidationError),

    /// A face is identified with itself under a non-identity map.
    #[error("Face {face} of dimension {dimension} is identified with itself in reverse")]
    InvalidFace {
        /// Dimension of the face.
        dimension: usize,
        /// Index of the face among the faces of that dimension.
        face: usize,
    },

    /// A vertex link is neither a sphere, a ball nor a closed manifold.
    #[error(
        "Vertex {vertex} has a non-manifold link ({kind:?}, Euler characteristic {euler_characteristic})"
    )]
    VertexLinkNotManifold {
        /// Index of the vertex.
        vertex: usize,
        /// Classification of its link.
        kind: LinkKind,
        /// Euler characteristic of its link.
        euler_characteristic: i64,
    },

    /// A vertex is ideal but ideal vertices were not allowed.
    #[error("Vertex {vertex} is ideal (link Euler characteristic {euler_characteristic})")]
    IdealVertex {
        /// Index of the vertex.
        vertex: usize,
        /// Euler characteristic of its link.
        euler_characteristic: i64,
    },

    /// A connected component cannot be consistently oriented.
    #[error("Component {component} is not orientable")]
    NonOrientable {
        /// Index of the component.
        component: usize,
    },
}

/// Classifies the kind of invariant that failed during validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvariantKind {
    /// Gluing symmetry and index/UUID bookkeeping.
    Structure,
    /// Faces identified with themselves in reverse.
    FaceValidity,
    /// Vertex links.
    VertexLinks,
    /// Consistent orientation of every component.
    Orientability,
}

/// A single invariant violation recorded during validation.
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// The kind of invariant that failed.
    pub kind: InvariantKind,
    /// The detailed error.
    pub error: ManifoldError,
}

/// Aggregate report of one or more validation failures.
#[derive(Clone, Debug)]
pub struct ManifoldValidationReport {
    /// The violations, in the order the checks ran.
    pub violations: Vec<InvariantViolation>,
}

impl ManifoldValidationReport {
    /// Returns `true` if no violations were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether some violation has the given kind.
    #[must_use]
    pub fn has(&self, kind: InvariantKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

/// Configuration options for [`validation_report`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationOptions {
    /// Accept ideal vertices (closed non-sphere links).
    pub allow_ideal: bool,
    /// Require every component to be orientable.
    pub require_orientable: bool,
}

/// Checks that no face of dimension `1 ≤ k < D` is invalid.
///
/// # Errors
///
/// Returns [`ManifoldError::InvalidFace`] for the first invalid face.
pub fn validate_faces<const D: usize>(tri: &Triangulation<D>) -> Result<(), ManifoldError> {
    let skeleton = tri.skeleton();
    for dimension in 1..D {
        if let Some(face) = skeleton.faces(dimension).iter().position(|f| !f.is_valid()) {
            return Err(ManifoldError::InvalidFace { dimension, face });
        }
    }
    Ok(())
}

/// Checks every vertex link.
///
/// # Errors
///
/// Returns [`ManifoldError::VertexLinkNotManifold`] for the first vertex with an
/// invalid link, or [`ManifoldError::IdealVertex`] for the first ideal vertex when
/// `allow_ideal` is `false`.
pub fn validate_vertex_links<const D: usize>(
    tri: &Triangulation<D>,
    allow_ideal: bool,
) -> Result<(), ManifoldError> {
    for (vertex, link) in tri.skeleton().vertex_links().iter().enumerate() {
        match link.kind() {
            LinkKind::Sphere | LinkKind::Ball => {}
            LinkKind::Ideal if allow_ideal => {}
            LinkKind::Ideal => {
                return Err(ManifoldError::IdealVertex {
                    vertex,
                    euler_characteristic: link.euler_characteristic(),
                });
            }
            kind @ LinkKind::Invalid => {
                return Err(ManifoldError::VertexLinkNotManifold {
                    vertex,
                    kind,
                    euler_characteristic: link.euler_characteristic(),
                });
            }
        }
    }
    Ok(())
}

/// Checks that every connected component is orientable.
///
/// # Errors
///
/// Returns [`ManifoldError::NonOrientable`] for the first non-orientable component.
pub fn validate_orientability<const D: usize>(
    tri: &Triangulation<D>,
) -> Result<(), ManifoldError> {
    match tri
        .skeleton()
        .components()
        .iter()
        .position(|c| !c.is_orientable())
    {
        Some(component) => Err(ManifoldError::NonOrientable { component }),
        None => Ok(()),
    }
}

/// Runs every check selected by `options` and collects all failures.
///
/// Structural failures stop validation early, since the skeleton of an inconsistent
/// triangulation is meaningless.
///
/// # Errors
///
/// Returns a [`ManifoldValidationReport`] listing every violation found.
pub fn validation_report<const D: usize>(
    tri: &Triangulation<D>,
    options: ValidationOptions,
) -> Result<(), ManifoldValidationReport> {
    let mut violations = Vec::new();

    if let Err(e) = tri.validate_structure() {
        violations.push(InvariantViolation {
            kind: InvariantKind::Structure,
            error: e.into(),
        });
        return Err(ManifoldValidationReport { violations });
    }

    if let Err(error) = validate_faces(tri) {
        violations.push(InvariantViolation {
            kind: InvariantKind::FaceValidity,
            error,
        });
    }
    if let Err(error) = validate_vertex_links(tri, options.allow_ideal) {
        violations.push(InvariantViolation {
            kind: InvariantKind::VertexLinks,
            error,
        });
    }
    if options.require_orientable {
        if let Err(error) = validate_orientability(tri) {
            violations.push(InvariantViolation {
                kind: InvariantKind::Orientability,
                error,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = violations.len(), "manifold validation failed");
        Err(ManifoldValidationReport { violations })
    }
}

impl<const D: usize> Triangulation<D> {
    /// Whether this triangulation is a combinatorial manifold under `options`.
    ///
    /// ```rust
    /// use simplicial::prelude::*;
    /// use simplicial::topology::manifold::ValidationOptions;
    ///
    /// let sphere = Triangulation::<3>::from_iso_sig("cPcbbbaaa").unwrap();
    /// assert!(sphere.is_manifold(ValidationOptions::default()));
    /// ```
    #[must_use]
    pub fn is_manifold(&self, options: ValidationOptions) -> bool {
        validation_report(self, options).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::perm::Perm;

    fn from_sig(sig: &str) -> Triangulation<3> {
        Triangulation::<3>::from_iso_sig(sig).unwrap()
    }

    const IDEAL: ValidationOptions = ValidationOptions {
        allow_ideal: true,
        require_orientable: false,
    };

    #[test]
    fn test_closed_and_bounded_manifolds_pass() {
        let sphere = from_sig("cPcbbbaaa");
        assert!(validation_report(&sphere, ValidationOptions::default()).is_ok());
        assert!(validate_orientability(&sphere).is_ok());

        let mut ball = Triangulation::<4>::new();
        ball.new_simplex();
        assert!(ball.is_manifold(ValidationOptions::default()));

        let solid_klein = from_sig("dHKabcjj");
        assert!(solid_klein.is_manifold(ValidationOptions::default()));
        assert!(!solid_klein.is_manifold(ValidationOptions {
            require_orientable: true,
            ..ValidationOptions::default()
        }));
    }

    #[test]
    fn test_ideal_vertices() {
        let fig8 = from_sig("cPcbbbiht");
        assert_eq!(
            validate_vertex_links(&fig8, false),
            Err(ManifoldError::IdealVertex {
                vertex: 0,
                euler_characteristic: 0,
            })
        );
        assert!(validate_vertex_links(&fig8, true).is_ok());

        let report = validation_report(&fig8, ValidationOptions::default()).unwrap_err();
        assert_eq!(report.violations.len(), 1);
        assert!(report.has(InvariantKind::VertexLinks));
        assert!(validation_report(&fig8, IDEAL).is_ok());

        let mut truncated = fig8.clone();
        truncated.ideal_to_finite().unwrap();
        assert!(truncated.is_manifold(ValidationOptions::default()));
    }

    #[test]
    fn test_non_orientable_component() {
        let gieseking = from_sig("bkaaid");
        let options = ValidationOptions {
            allow_ideal: true,
            require_orientable: true,
        };
        let report = validation_report(&gieseking, options).unwrap_err();
        assert!(report.has(InvariantKind::Orientability));
        assert!(!report.has(InvariantKind::VertexLinks));
        assert_eq!(
            validate_orientability(&gieseking),
            Err(ManifoldError::NonOrientable { component: 0 })
        );
    }

    #[test]
    fn test_reversed_edge_is_reported() {
        let mut tri = Triangulation::<3>::new();
        tri.new_simplex();
        tri.join(0, 0, 0, Perm::from_images(&[1, 0, 3, 2]).unwrap())
            .unwrap();

        let edge = tri.skeleton().simplex_face(1, 0, 5).unwrap();
        assert_eq!(
            validate_faces(&tri),
            Err(ManifoldError::InvalidFace {
                dimension: 1,
                face: edge,
            })
        );
        let report = validation_report(&tri, IDEAL).unwrap_err();
        assert!(report.has(InvariantKind::FaceValidity));
        assert!(!report.is_empty());
    }

    #[test]
    fn test_error_messages() {
        let error = ManifoldError::InvalidFace {
            dimension: 1,
            face: 3,
        };
        assert_eq!(
            error.to_string(),
            "Face 3 of dimension 1 is identified with itself in reverse"
        );
        assert_eq!(
            ManifoldError::NonOrientable { component: 2 }.to_string(),
            "Component 2 is not orientable"
        );
    }
}
