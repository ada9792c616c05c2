//! Isomorphism signatures.
//!
//! The isomorphism signature is a printable string that identifies a triangulation up
//! to relabelling of simplices and of the vertices within each simplex: two
//! triangulations of the same dimension are combinatorially isomorphic exactly when
//! their signatures are equal.
//!
//! # Algorithm
//!
//! Each connected component is encoded separately. For every choice of starting simplex
//! and starting vertex ordering, a breadth-first traversal assigns canonical labels:
//! the start becomes simplex `0`, and facets of labelled simplices are visited in
//! canonical order. A facet is recorded as
//!
//! - action `0` if it is a boundary facet,
//! - action `1` if it leads to an unlabelled simplex, which receives the next label and
//!   the vertex ordering that makes the gluing the identity,
//! - action `2` if it leads to an already labelled simplex, in which case the
//!   destination label and the gluing permutation (by rank) are recorded too.
//!
//! Facets whose partner was already recorded are skipped. The candidate string is the
//! component size, the actions packed three to a character, the destinations and then
//! the gluing ranks, all in the base-64 alphabet of [`printable`]. The component's
//! signature is the smallest candidate; component signatures are sorted and
//! concatenated. The empty triangulation has signature `"a"`.
//!
//! # Examples
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! // Two tetrahedra glued by the identity on all four facets: a 3-sphere.
//! let mut tri = Triangulation::<3>::new();
//! tri.new_simplices(2);
//! for facet in 0..4 {
//!     tri.join(0, facet, 1, Perm::identity(4)).unwrap();
//! }
//! let sig = tri.iso_sig();
//! assert_eq!(sig, "cPcbbbaaa");
//!
//! let rebuilt = Triangulation::<3>::from_iso_sig(&sig).unwrap();
//! assert!(rebuilt.is_isomorphic_to(&tri).is_some());
//! ```

use thiserror::Error;

use crate::core::isomorphism::Isomorphism;
use crate::core::perm::{Perm, factorial};
use crate::core::staging::StagingTriangulation;
use crate::core::triangulation::Triangulation;
use crate::core::util::printable::{self, append_value, chars_per_perm, digits_needed};

/// Signature of the empty triangulation.
pub const EMPTY_SIGNATURE: &str = "a";

/// Size header value announcing a multi-character size.
const LONG_SIZE_MARKER: u64 = 63;

/// Largest digit count accepted for a multi-character size.
const MAX_SIZE_DIGITS: u64 = 10;

/// Errors from [`Triangulation::from_iso_sig`]. Positions are byte offsets into the
/// signature.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature is the empty string.
    #[error("Empty isomorphism signature")]
    Empty,
    /// A character outside the signature alphabet.
    #[error("Invalid character {character:?} at position {position}")]
    InvalidCharacter {
        /// Byte offset.
        position: usize,
        /// The offending character.
        character: char,
    },
    /// The signature ended in the middle of a component.
    #[error("Signature ends unexpectedly at position {position}")]
    UnexpectedEnd {
        /// Byte offset where more input was expected.
        position: usize,
    },
    /// A multi-character size header has an unusable digit count.
    #[error("Invalid component size header at position {position}")]
    InvalidSize {
        /// Byte offset of the header.
        position: usize,
    },
    /// A facet action is not `0`, `1` or `2`, or cannot be carried out.
    #[error("Invalid facet action {action} at position {position}")]
    InvalidAction {
        /// Byte offset of the packed action character.
        position: usize,
        /// The action value.
        action: u64,
    },
    /// A gluing refers to a simplex that does not exist or has not been reached yet.
    #[error("Invalid gluing destination {destination} at position {position} (component size {size})")]
    InvalidDestination {
        /// Byte offset of the destination.
        position: usize,
        /// The destination label.
        destination: u64,
        /// Size of the component being decoded.
        size: usize,
    },
    /// A permutation rank is out of range.
    #[error("Invalid permutation rank {rank} at position {position}")]
    InvalidPermutation {
        /// Byte offset of the rank.
        position: usize,
        /// The decoded rank.
        rank: u64,
    },
    /// A gluing targets a facet that is already glued, or glues a facet to itself.
    #[error("Inconsistent gluing at position {position}")]
    InconsistentGluing {
        /// Byte offset of the gluing permutation.
        position: usize,
    },
    /// The component's actions do not account for every simplex and facet.
    #[error("Incomplete component ending at position {position}")]
    IncompleteComponent {
        /// Byte offset where the component ends.
        position: usize,
    },
}

// =============================================================================
// ENCODING
// =============================================================================

/// Reusable state for one labelling traversal.
struct Traversal {
    /// Canonical label per simplex of the triangulation.
    label: Vec<Option<usize>>,
    /// Vertex relabelling per simplex of the triangulation.
    vertex_map: Vec<Perm>,
    /// Simplex per canonical label.
    preimage: Vec<usize>,
    actions: Vec<u8>,
    destinations: Vec<usize>,
    gluings: Vec<Perm>,
}

/// The winning traversal of one component.
struct ComponentLabelling {
    signature: String,
    preimage: Vec<usize>,
    vertex_maps: Vec<Perm>,
}

impl Traversal {
    fn new<const D: usize>(size: usize) -> Self {
        Self {
            label: vec![None; size],
            vertex_map: vec![Perm::identity(D + 1); size],
            preimage: Vec::with_capacity(size),
            actions: Vec::new(),
            destinations: Vec::new(),
            gluings: Vec::new(),
        }
    }

    /// Labels the component containing `start`, beginning with vertex map `start_map`,
    /// and returns the candidate signature.
    fn run<const D: usize>(
        &mut self,
        tri: &Triangulation<D>,
        members: &[usize],
        start: usize,
        start_map: Perm,
    ) -> String {
        for &member in members {
            self.label[member] = None;
        }
        self.preimage.clear();
        self.actions.clear();
        self.destinations.clear();
        self.gluings.clear();

        self.label[start] = Some(0);
        self.vertex_map[start] = start_map;
        self.preimage.push(start);

        let mut current = 0;
        while current < self.preimage.len() {
            let src = self.preimage[current];
            let src_map = self.vertex_map[src];
            for facet in 0..=D {
                let src_facet = src_map.pre_image(facet);
                let Some((dst, g)) = tri.adjacent(src, src_facet) else {
                    self.actions.push(0);
                    continue;
                };
                if let Some(dst_label) = self.label[dst] {
                    if dst_label < current
                        || (dst_label == current && src_map.apply(g.apply(src_facet)) < facet)
                    {
                        continue;
                    }
                    self.actions.push(2);
                    self.destinations.push(dst_label);
                    self.gluings
                        .push(self.vertex_map[dst] * g * src_map.inverse());
                } else {
                    self.label[dst] = Some(self.preimage.len());
                    self.vertex_map[dst] = src_map * g.inverse();
                    self.preimage.push(dst);
                    self.actions.push(1);
                }
            }
            current += 1;
        }
        self.encode::<D>()
    }

    fn encode<const D: usize>(&self) -> String {
        let size = self.preimage.len() as u64;
        let mut out = String::new();
        let chars = if size < LONG_SIZE_MARKER {
            out.push(printable::encode(size));
            1
        } else {
            let digits = digits_needed(size);
            out.push(printable::encode(LONG_SIZE_MARKER));
            out.push(printable::encode(digits as u64));
            append_value(&mut out, size, digits);
            digits
        };
        for packed in self.actions.chunks(3) {
            let value = packed
                .iter()
                .enumerate()
                .fold(0_u64, |acc, (slot, &action)| acc | (u64::from(action) << (2 * slot)));
            out.push(printable::encode(value));
        }
        for &destination in &self.destinations {
            append_value(&mut out, destination as u64, chars);
        }
        let perm_chars = chars_per_perm(D + 1);
        for gluing in &self.gluings {
            append_value(&mut out, gluing.index(), perm_chars);
        }
        out
    }
}

impl<const D: usize> Triangulation<D> {
    /// The isomorphism signature.
    ///
    /// Cost is `O(n² · (D+1)! · D)` per component of `n` simplices.
    #[must_use]
    pub fn iso_sig(&self) -> String {
        self.iso_sig_with_relabelling().0
    }

    /// The isomorphism signature together with the isomorphism that maps this
    /// triangulation onto exactly the triangulation that
    /// [`from_iso_sig`](Self::from_iso_sig) rebuilds from the signature.
    #[must_use]
    pub fn iso_sig_with_relabelling(&self) -> (String, Isomorphism<D>) {
        if self.is_empty() {
            return (EMPTY_SIGNATURE.to_string(), Isomorphism::identity(0));
        }
        let components = self.skeleton().components();
        tracing::debug!(
            simplices = self.size(),
            components = components.len(),
            "computing isomorphism signature"
        );

        let mut traversal = Traversal::new::<D>(self.size());
        let mut labellings: Vec<ComponentLabelling> = components
            .iter()
            .map(|component| {
                let members = component.simplices();
                let mut best: Option<ComponentLabelling> = None;
                for &start in members {
                    for start_map in Perm::all(D + 1) {
                        let candidate = traversal.run(self, members, start, start_map);
                        if best
                            .as_ref()
                            .is_none_or(|current| candidate < current.signature)
                        {
                            best = Some(ComponentLabelling {
                                signature: candidate,
                                preimage: traversal.preimage.clone(),
                                vertex_maps: traversal
                                    .preimage
                                    .iter()
                                    .map(|&s| traversal.vertex_map[s])
                                    .collect(),
                            });
                        }
                    }
                }
                best
            })
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        labellings.sort_by(|a, b| a.signature.cmp(&b.signature));

        let mut signature = String::new();
        let mut simp_image = vec![0; self.size()];
        let mut facet_perm = vec![Perm::identity(D + 1); self.size()];
        let mut offset = 0;
        for labelling in &labellings {
            signature.push_str(&labelling.signature);
            for (label, (&simplex, &map)) in labelling
                .preimage
                .iter()
                .zip(&labelling.vertex_maps)
                .enumerate()
            {
                simp_image[simplex] = offset + label;
                facet_perm[simplex] = map;
            }
            offset += labelling.preimage.len();
        }
        (signature, Isomorphism::from_parts(simp_image, facet_perm))
    }

    /// Rebuilds a triangulation from its isomorphism signature.
    ///
    /// The result is the canonical relabelling of any triangulation with this signature.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] locating the first malformed part of `signature`.
    pub fn from_iso_sig(signature: &str) -> Result<Self, SignatureError> {
        let staging = decode::<D>(signature).inspect_err(|err| {
            tracing::debug!(%err, signature, "rejected isomorphism signature");
        })?;
        Self::from_staging(staging).map_err(|err| {
            tracing::debug!(%err, signature, "decoded gluings are inconsistent");
            SignatureError::InconsistentGluing {
                position: signature.len(),
            }
        })
    }

    /// The number of simplices in the first component of `signature`, read from its size
    /// header alone.
    ///
    /// Nothing past the header is examined, so a malformed signature can still report a
    /// positive size; [`Triangulation::from_iso_sig`] checks the whole string. Returns `0`
    /// if the header itself cannot be read.
    ///
    /// ```rust
    /// use simplicial::prelude::*;
    ///
    /// assert_eq!(Triangulation::<3>::iso_sig_component_size("cPcbbbiht"), 2);
    /// assert_eq!(Triangulation::<3>::iso_sig_component_size("a"), 0);
    /// ```
    #[must_use]
    pub fn iso_sig_component_size(signature: &str) -> usize {
        let mut reader = Reader {
            signature,
            position: 0,
        };
        reader
            .read_size()
            .ok()
            .and_then(|(size, _)| usize::try_from(size).ok())
            .unwrap_or(0)
    }

    /// An isomorphism from this triangulation onto `other`, if one exists.
    #[must_use]
    pub fn is_isomorphic_to(&self, other: &Self) -> Option<Isomorphism<D>> {
        if self.size() != other.size() {
            return None;
        }
        let (mine, to_canonical) = self.iso_sig_with_relabelling();
        let (theirs, other_to_canonical) = other.iso_sig_with_relabelling();
        if mine != theirs {
            return None;
        }
        other_to_canonical.inverse().compose(&to_canonical).ok()
    }

    /// Relabels this triangulation into its canonical form.
    ///
    /// Returns `false`, without notifying subscribers, if it was already canonical.
    pub fn make_canonical(&mut self) -> bool {
        let (_, relabelling) = self.iso_sig_with_relabelling();
        match relabelling.apply(self) {
            Ok(canonical) if !canonical.is_identical_to(self) => {
                let mut span = self.change_span();
                *span.store_mut() = canonical.into_store();
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// DECODING
// =============================================================================

struct Reader<'a> {
    signature: &'a str,
    position: usize,
}

impl Reader<'_> {
    const fn at_end(&self) -> bool {
        self.position >= self.signature.len()
    }

    const fn remaining(&self) -> usize {
        self.signature.len().saturating_sub(self.position)
    }

    fn read(&mut self, chars: usize) -> Result<u64, SignatureError> {
        let bytes = self.signature.as_bytes();
        let mut value = 0_u64;
        for digit in 0..chars {
            let position = self.position + digit;
            let &byte = bytes
                .get(position)
                .ok_or(SignatureError::UnexpectedEnd { position })?;
            let decoded = printable::decode(byte).ok_or_else(|| SignatureError::InvalidCharacter {
                position,
                character: self
                    .signature
                    .get(position..)
                    .and_then(|rest| rest.chars().next())
                    .unwrap_or(char::REPLACEMENT_CHARACTER),
            })?;
            value |= decoded << (6 * digit);
        }
        self.position += chars;
        Ok(value)
    }

    /// Reads a component size header, returning the size and the width in characters
    /// of every simplex index in that component.
    fn read_size(&mut self) -> Result<(u64, usize), SignatureError> {
        let header = self.position;
        match self.read(1)? {
            LONG_SIZE_MARKER => {
                let digits = self.read(1)?;
                if digits == 0 || digits > MAX_SIZE_DIGITS {
                    return Err(SignatureError::InvalidSize { position: header });
                }
                let digits = digits as usize;
                Ok((self.read(digits)?, digits))
            }
            size => Ok((size, 1)),
        }
    }
}

/// One decoded facet action with the byte offset of its packed character.
#[derive(Clone, Copy)]
struct Action {
    kind: u64,
    position: usize,
}

fn decode<const D: usize>(signature: &str) -> Result<StagingTriangulation<D>, SignatureError> {
    if signature.is_empty() {
        return Err(SignatureError::Empty);
    }
    let mut reader = Reader {
        signature,
        position: 0,
    };
    let perm_chars = chars_per_perm(D + 1);
    let perm_count = factorial(D + 1);
    let mut staging = StagingTriangulation::new();

    while !reader.at_end() {
        let (size, chars) = reader.read_size()?;
        if size == 0 {
            continue;
        }

        // One packed character covers at most six facets.
        let size = usize::try_from(size)
            .ok()
            .filter(|&n| {
                n.checked_mul(D + 1)
                    .is_some_and(|facets| facets <= reader.remaining().saturating_mul(6))
            })
            .ok_or(SignatureError::UnexpectedEnd {
                position: signature.len(),
            })?;
        let facets = (D + 1) * size;

        let mut actions = Vec::with_capacity(facets);
        let mut seen = 0;
        let mut joins = 0;
        while seen < facets {
            let position = reader.position;
            let packed = reader.read(1)?;
            for slot in 0..3 {
                let kind = (packed >> (2 * slot)) & 3;
                if seen >= facets {
                    if kind != 0 {
                        return Err(SignatureError::InvalidAction {
                            position,
                            action: kind,
                        });
                    }
                    continue;
                }
                match kind {
                    0 => seen += 1,
                    1 => seen += 2,
                    2 => {
                        seen += 2;
                        joins += 1;
                    }
                    _ => {
                        return Err(SignatureError::InvalidAction {
                            position,
                            action: kind,
                        });
                    }
                }
                actions.push(Action { kind, position });
            }
        }
        if seen != facets {
            return Err(SignatureError::IncompleteComponent {
                position: reader.position,
            });
        }

        let mut destinations = Vec::with_capacity(joins);
        for _ in 0..joins {
            let position = reader.position;
            destinations.push((reader.read(chars)?, position));
        }
        let mut gluings = Vec::with_capacity(joins);
        for _ in 0..joins {
            let position = reader.position;
            let rank = reader.read(perm_chars)?;
            if rank >= perm_count {
                return Err(SignatureError::InvalidPermutation { position, rank });
            }
            let perm = Perm::from_index(D + 1, rank)
                .map_err(|_| SignatureError::InvalidPermutation { position, rank })?;
            gluings.push((perm, position));
        }

        let base = staging.new_simplices(size).start;
        let mut next_action = actions.iter();
        let mut next_join = destinations.iter().zip(&gluings);
        let mut next_unused = 1;
        for simplex in 0..size {
            for facet in 0..=D {
                if staging.adjacent(base + simplex, facet).is_some() {
                    continue;
                }
                let &Action { kind, position } =
                    next_action
                        .next()
                        .ok_or(SignatureError::IncompleteComponent {
                            position: reader.position,
                        })?;
                match kind {
                    0 => {}
                    1 => {
                        if next_unused >= size {
                            return Err(SignatureError::InvalidAction {
                                position,
                                action: kind,
                            });
                        }
                        staging.join(
                            base + simplex,
                            facet,
                            base + next_unused,
                            Perm::identity(D + 1),
                        );
                        next_unused += 1;
                    }
                    _ => {
                        let (&(destination, dest_position), &(perm, perm_position)) = next_join
                            .next()
                            .ok_or(SignatureError::IncompleteComponent {
                                position: reader.position,
                            })?;
                        let target = usize::try_from(destination)
                            .ok()
                            .filter(|&d| d < next_unused)
                            .ok_or(SignatureError::InvalidDestination {
                                position: dest_position,
                                destination,
                                size,
                            })?;
                        let target_facet = perm.apply(facet);
                        if (target == simplex && target_facet == facet)
                            || staging.adjacent(base + target, target_facet).is_some()
                        {
                            return Err(SignatureError::InconsistentGluing {
                                position: perm_position,
                            });
                        }
                        staging.join(base + simplex, facet, base + target, perm);
                    }
                }
            }
        }
        if next_action.next().is_some() || next_unused != size {
            return Err(SignatureError::IncompleteComponent {
                position: reader.position,
            });
        }
    }
    Ok(staging)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn perm(images: &[usize]) -> Perm {
        Perm::from_images(images).unwrap()
    }

    fn build<const D: usize>(size: usize, joins: &[(usize, usize, usize, &[usize])]) -> Triangulation<D> {
        let mut tri = Triangulation::<D>::new();
        tri.new_simplices(size);
        for &(s, f, t, images) in joins {
            tri.join(s, f, t, perm(images)).unwrap();
        }
        tri
    }

    fn sphere() -> Triangulation<3> {
        let id: &[usize] = &[0, 1, 2, 3];
        build(2, &[(0, 0, 1, id), (0, 1, 1, id), (0, 2, 1, id), (0, 3, 1, id)])
    }

    fn figure_eight() -> Triangulation<3> {
        build(
            2,
            &[
                (0, 0, 1, &[1, 3, 0, 2]),
                (0, 1, 1, &[2, 0, 3, 1]),
                (0, 2, 1, &[0, 3, 2, 1]),
                (0, 3, 1, &[2, 1, 0, 3]),
            ],
        )
    }

    fn gieseking() -> Triangulation<3> {
        build(1, &[(0, 0, 0, &[1, 2, 0, 3]), (0, 2, 0, &[0, 2, 3, 1])])
    }

    fn solid_klein_bottle() -> Triangulation<3> {
        build(
            3,
            &[
                (1, 0, 0, &[0, 1, 2, 3]),
                (1, 3, 0, &[3, 0, 1, 2]),
                (1, 1, 2, &[3, 0, 1, 2]),
                (1, 2, 2, &[0, 1, 2, 3]),
            ],
        )
    }

    #[test]
    fn test_known_signatures() {
        assert_eq!(Triangulation::<3>::new().iso_sig(), "a");
        assert_eq!(build::<2>(1, &[]).iso_sig(), "ba");
        assert_eq!(build::<3>(1, &[]).iso_sig(), "baa");
        assert_eq!(sphere().iso_sig(), "cPcbbbaaa");
        assert_eq!(figure_eight().iso_sig(), "cPcbbbiht");
        assert_eq!(gieseking().iso_sig(), "bkaaid");
        assert_eq!(solid_klein_bottle().iso_sig(), "dHKabcjj");
    }

    #[test]
    fn test_components_are_sorted() {
        let mut tri = figure_eight();
        tri.insert_triangulation(&sphere());
        assert_eq!(tri.iso_sig(), "cPcbbbaaacPcbbbiht");
        let mut swapped = sphere();
        swapped.insert_triangulation(&figure_eight());
        assert_eq!(swapped.iso_sig(), tri.iso_sig());
    }

    #[test]
    fn test_other_dimensions() {
        let id2: &[usize] = &[0, 1, 2];
        let sphere2 = build::<2>(2, &[(0, 0, 1, id2), (0, 1, 1, id2), (0, 2, 1, id2)]);
        assert_eq!(sphere2.iso_sig(), "cPbbaa");

        let id4: &[usize] = &[0, 1, 2, 3, 4];
        let sphere4 = build::<4>(
            2,
            &[
                (0, 0, 1, id4),
                (0, 1, 1, id4),
                (0, 2, 1, id4),
                (0, 3, 1, id4),
                (0, 4, 1, id4),
            ],
        );
        assert_eq!(sphere4.iso_sig(), "cPkbbbbaaaaaaaa");
        assert!(Triangulation::<4>::from_iso_sig("cPkbbbbaaaaaaaa")
            .unwrap()
            .is_identical_to(&sphere4));
    }

    #[test]
    fn test_relabelling_maps_onto_decoded() {
        for tri in [sphere(), figure_eight(), gieseking(), solid_klein_bottle()] {
            let (sig, iso) = tri.iso_sig_with_relabelling();
            let decoded = Triangulation::<3>::from_iso_sig(&sig).unwrap();
            assert!(iso.apply(&tri).unwrap().is_identical_to(&decoded), "{sig}");
            assert_eq!(decoded.iso_sig(), sig);
        }
    }

    #[test]
    fn test_signature_invariant_under_relabelling() {
        let mut rng = StdRng::seed_from_u64(2024);
        for tri in [figure_eight(), gieseking(), solid_klein_bottle()] {
            let sig = tri.iso_sig();
            for _ in 0..5 {
                let iso = Isomorphism::<3>::random(tri.size(), &mut rng);
                let image = iso.apply(&tri).unwrap();
                assert_eq!(image.iso_sig(), sig);
                let found = tri.is_isomorphic_to(&image).unwrap();
                assert!(found.apply(&tri).unwrap().is_identical_to(&image));
            }
        }
        assert!(sphere().is_isomorphic_to(&figure_eight()).is_none());
        assert!(gieseking().is_isomorphic_to(&sphere()).is_none());
    }

    #[test]
    fn test_long_size_header() {
        // A strip of 64 triangles.
        let mut tri = Triangulation::<2>::new();
        tri.new_simplices(64);
        for i in 0..63 {
            tri.join(i, 0, i + 1, perm(&[1, 0, 2])).unwrap();
        }
        let sig = tri.iso_sig();
        assert!(sig.starts_with("-cab"), "{sig}");
        assert_eq!(Triangulation::<2>::iso_sig_component_size(&sig), 64);
        let decoded = Triangulation::<2>::from_iso_sig(&sig).unwrap();
        assert_eq!(decoded.size(), 64);
        assert!(decoded.is_isomorphic_to(&tri).is_some());
    }

    #[test]
    fn test_component_size_from_header() {
        type T3 = Triangulation<3>;
        assert_eq!(T3::iso_sig_component_size("cPcbbbaaa"), 2);
        assert_eq!(T3::iso_sig_component_size("bkaaid"), 1);
        // Only the first component is measured.
        assert_eq!(T3::iso_sig_component_size("bkaaidcPcbbbaaa"), 1);
        // The header alone decides, even when the rest is malformed.
        assert_eq!(T3::iso_sig_component_size("dHK"), 3);
        assert_eq!(T3::iso_sig_component_size("-cab"), 64);
        assert_eq!(T3::iso_sig_component_size("-dbaa"), 1);

        for unreadable in ["", "a", "*cPc", "-", "-aa", "-c", "-la"] {
            assert_eq!(T3::iso_sig_component_size(unreadable), 0, "{unreadable:?}");
        }
    }

    #[test]
    fn test_make_canonical() {
        let mut rng = StdRng::seed_from_u64(11);
        let tri = solid_klein_bottle();
        let mut shuffled = Isomorphism::<3>::random(3, &mut rng).apply(&tri).unwrap();
        let canonical = Triangulation::<3>::from_iso_sig(&tri.iso_sig()).unwrap();

        let was_canonical = shuffled.is_identical_to(&canonical);
        assert_eq!(shuffled.make_canonical(), !was_canonical);
        assert!(shuffled.is_identical_to(&canonical));
        assert!(!shuffled.make_canonical());
    }

    #[test]
    fn test_decode_errors() {
        fn error(sig: &str) -> Option<SignatureError> {
            Triangulation::<3>::from_iso_sig(sig).err()
        }

        assert_eq!(error(""), Some(SignatureError::Empty));
        assert_eq!(
            error("b*a"),
            Some(SignatureError::InvalidCharacter {
                position: 1,
                character: '*'
            })
        );
        assert_eq!(error("ba"), Some(SignatureError::UnexpectedEnd { position: 2 }));
        // Action 3 in the first slot.
        assert_eq!(
            error("bda"),
            Some(SignatureError::InvalidAction {
                position: 1,
                action: 3
            })
        );
        // Trailing non-zero action after the last facet.
        assert_eq!(
            error("bae"),
            Some(SignatureError::InvalidAction {
                position: 2,
                action: 1
            })
        );
        // The last action covers more facets than remain.
        assert_eq!(
            error("bab"),
            Some(SignatureError::IncompleteComponent { position: 3 })
        );
        // A new-simplex action with no simplex left to reach.
        assert_eq!(
            error("bbaa"),
            Some(SignatureError::InvalidAction {
                position: 1,
                action: 1
            })
        );
        // Gluing a facet to itself.
        assert_eq!(
            error("bkaadd"),
            Some(SignatureError::InconsistentGluing { position: 4 })
        );
        // Destination beyond the simplices reached so far.
        assert!(matches!(
            error("bkbadd"),
            Some(SignatureError::InvalidDestination {
                position: 2,
                destination: 1,
                ..
            })
        ));
        assert_eq!(error("-aa"), Some(SignatureError::InvalidSize { position: 0 }));
        // More simplices than the remaining characters could describe.
        assert_eq!(error("zaa"), Some(SignatureError::UnexpectedEnd { position: 3 }));
        assert!(error("cPcbbbaa").is_some());
    }

    #[test]
    fn test_strip_has_more_triangles_than_action_characters() {
        let mut tri = Triangulation::<2>::new();
        tri.new_simplices(4);
        for i in 0..3 {
            tri.join(i, 0, i + 1, perm(&[1, 0, 2])).unwrap();
        }
        let sig = tri.iso_sig();
        assert_eq!(sig.len(), 4, "{sig}");

        let decoded = Triangulation::<2>::from_iso_sig(&sig).unwrap();
        assert_eq!(decoded.size(), 4);
        assert_eq!(decoded.iso_sig(), sig);
        assert!(decoded.is_isomorphic_to(&tri).is_some());
    }

    #[test]
    fn test_decode_accepts_empty_components() {
        assert!(Triangulation::<3>::from_iso_sig("a").unwrap().is_empty());
        let tri = Triangulation::<3>::from_iso_sig("abaa").unwrap();
        assert_eq!(tri.size(), 1);
    }
}
