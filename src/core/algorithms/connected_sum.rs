//! Connected sum of 3-dimensional triangulations.

use crate::core::perm::Perm;
use crate::core::triangulation::{Triangulation, TriangulationError};

impl Triangulation<3> {
    /// Forms the connected sum of this triangulation with a copy of `other`.
    ///
    /// A copy of `other` is appended, tetrahedron `0` is punctured, and the resulting
    /// 2-sphere boundary is glued into facet 0 of the first copied tetrahedron (which is
    /// opened up if it was glued). The gluing permutations are chosen so that oriented
    /// inputs give an oriented result. The size grows by `other.size() + 6` unless one
    /// side is empty: an empty `other` changes nothing, and an empty `self` simply
    /// receives a copy of `other`.
    ///
    /// # Errors
    ///
    /// [`TriangulationError::LockViolation`] if tetrahedron `0`, its facet 0, or the
    /// neighbour across that facet is locked. Nothing changes in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use simplicial::prelude::*;
    ///
    /// let mut tri = Triangulation::<3>::from_iso_sig("cPcbbbaaa").unwrap();
    /// let copy = tri.clone();
    /// tri.connected_sum_with(&copy).unwrap();
    /// assert_eq!(tri.size(), 10);
    /// assert!(tri.is_closed());
    /// ```
    pub fn connected_sum_with(&mut self, other: &Self) -> Result<(), TriangulationError> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            self.insert_triangulation(other);
            return Ok(());
        }
        self.check_unjoin_locks(0, 0)?;

        // Facet 0 of the opened tetrahedron, listed by its vertices. This ordering is
        // odd, so the opened side takes the reflected gluing and its old neighbour the
        // rotated one.
        let facet_vertices = Perm::from_images(&[1, 2, 3, 0])?;
        let rotated = Perm::from_images(&[3, 0, 1, 2])?;
        let reflected = Perm::from_images(&[3, 0, 2, 1])?;

        let mut span = self.change_span();
        let opened = span.insert_triangulation(other).start;
        span.puncture(Some(0))?;
        let boundary = span.size() - 2;

        let store = span.store_mut();
        if let Some((adjacent, gluing)) = store.adjacent(opened, 0) {
            store.unjoin(opened, 0);
            store.join(boundary + 1, 0, adjacent, gluing * facet_vertices * rotated);
        }
        store.join(boundary, 0, opened, facet_vertices * reflected);
        tracing::debug!(
            added = other.size(),
            size = span.size(),
            "formed connected sum"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::perm::Perm;
    use crate::core::simplex::Simplex;
    use crate::core::skeleton::LinkKind;
    use crate::core::triangulation::Triangulation;

    fn from_sig(sig: &str) -> Triangulation<3> {
        Triangulation::<3>::from_iso_sig(sig).unwrap()
    }

    #[test]
    fn test_sphere_with_itself() {
        let mut tri = from_sig("cPcbbbaaa");
        let copy = tri.clone();
        tri.connected_sum_with(&copy).unwrap();

        assert_eq!(tri.size(), 10);
        assert!(tri.is_closed());
        assert!(tri.is_valid());
        assert!(tri.is_orientable());
        assert!(tri.is_connected());
        assert_eq!(tri.count_vertices(), 8);
        assert!(
            tri.skeleton()
                .vertex_links()
                .iter()
                .all(|link| link.kind() == LinkKind::Sphere)
        );
    }

    /// The figure-eight knot complement with every gluing odd, so both tetrahedra keep
    /// orientation +1.
    fn oriented_figure_eight() -> Triangulation<3> {
        let mut tri = Triangulation::<3>::new();
        tri.new_simplices(2);
        for (facet, images) in [[1, 3, 0, 2], [2, 0, 3, 1], [0, 3, 2, 1], [2, 1, 0, 3]]
            .iter()
            .enumerate()
        {
            tri.join(0, facet, 1, Perm::from_images(images).unwrap())
                .unwrap();
        }
        tri
    }

    #[test]
    fn test_figure_eight_keeps_orientation() {
        let mut tri = oriented_figure_eight();
        assert!(tri.is_oriented());
        assert_eq!(tri.iso_sig(), "cPcbbbiht");
        let copy = tri.clone();
        tri.connected_sum_with(&copy).unwrap();

        assert_eq!(tri.size(), 10);
        assert!(tri.is_oriented());
        assert_eq!(
            tri.skeleton()
                .vertex_links()
                .iter()
                .filter(|link| link.kind() == LinkKind::Ideal)
                .count(),
            2
        );
        assert!(tri.validate_structure().is_ok());
    }

    #[test]
    fn test_boundary_facet_opened_keeps_orientation() {
        let mut single = Triangulation::<3>::new();
        single.new_simplex();
        let fig8 = oriented_figure_eight();

        // Facet 0 of the inserted tetrahedron is already boundary, so nothing is opened.
        let mut tri = fig8.clone();
        let uuids: Vec<_> = tri.simplices().map(Simplex::uuid).collect();
        tri.connected_sum_with(&single).unwrap();
        assert_eq!(tri.size(), 9);
        assert!(tri.is_oriented());
        assert_eq!(tri.count_boundary_facets(), 4);
        assert_eq!(tri.simplex(0).unwrap().uuid(), uuids[0]);
        assert_eq!(tri.simplex(1).unwrap().uuid(), uuids[1]);
        assert!(tri.validate_structure().is_ok());

        let mut tri = single;
        tri.connected_sum_with(&fig8).unwrap();
        assert_eq!(tri.size(), 9);
        assert!(tri.is_oriented());
        assert_eq!(tri.count_boundary_facets(), 4);
        assert!(tri.validate_structure().is_ok());
    }

    #[test]
    fn test_solid_klein_bottle_with_itself() {
        let mut tri = from_sig("dHKabcjj");
        let copy = tri.clone();
        tri.connected_sum_with(&copy).unwrap();

        assert_eq!(tri.size(), 12);
        assert!(!tri.is_orientable());
        assert_eq!(tri.count_boundary_facets(), 8);
    }

    #[test]
    fn test_empty_sides_and_locks() {
        let sphere = from_sig("cPcbbbaaa");

        let mut tri = sphere.clone();
        tri.connected_sum_with(&Triangulation::new()).unwrap();
        assert!(tri.is_identical_to(&sphere));

        let mut empty = Triangulation::<3>::new();
        empty.connected_sum_with(&sphere).unwrap();
        assert!(empty.is_identical_to(&sphere));

        tri.lock_facet(1, 0).unwrap();
        assert!(tri.connected_sum_with(&sphere).unwrap_err().is_lock_violation());
        assert_eq!(tri.size(), 2);
    }
}
