//! The skeleton of a triangulation: faces of every dimension and the structure built on them.
//!
//! A `k`-face of a triangulation is an equivalence class of `k`-faces of individual
//! simplices under the facet gluings. The [`Skeleton`] records, for every `0 ≤ k < D`,
//! these classes together with their embeddings, and derives from them:
//!
//! - vertex links, classified through their Euler characteristic
//!   ([`LinkKind::Sphere`], [`LinkKind::Ball`], [`LinkKind::Ideal`], [`LinkKind::Invalid`]);
//! - connected components and a consistent orientation where one exists;
//! - boundary components, both real (built from unglued facets) and ideal (one per
//!   ideal vertex).
//!
//! # Face numbering
//!
//! Inside one simplex, vertices are numbered by themselves, facets by their opposite
//! vertex, and every other face by the lexicographic order of its vertex set. For a
//! tetrahedron the edges are therefore `01, 02, 03, 12, 13, 23`.
//!
//! Each [`FaceEmbedding`] carries a permutation whose first `k + 1` images are the
//! face's vertices (in a consistent order across the whole class) and whose remaining
//! images are the other vertices of the simplex.
//!
//! # Examples
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let tri = Triangulation::<3>::from_iso_sig("bkaaid").unwrap(); // Gieseking manifold
//! let skeleton = tri.skeleton();
//!
//! assert_eq!(skeleton.count_faces(0), 1);
//! assert_eq!(skeleton.vertex_link(0).map(|l| l.kind()), Some(LinkKind::Ideal));
//! assert!(!skeleton.is_orientable());
//! assert_eq!(skeleton.boundary_components().len(), 1);
//! ```

use std::collections::VecDeque;

use crate::core::collections::{FacetBuffer, FastHashMap, SmallBuffer, fast_hash_map_with_capacity};
use crate::core::perm::{MAX_PERM_SIZE, Perm};
use crate::core::store::SimplexStore;
use crate::core::util::DisjointSets;

const UNASSIGNED: usize = usize::MAX;

// =============================================================================
// FACE TYPES
// =============================================================================

/// One appearance of a face class inside a particular simplex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceEmbedding {
    simplex: usize,
    face: usize,
    vertices: Perm,
}

impl FaceEmbedding {
    /// Index of the simplex containing this embedding.
    #[must_use]
    pub const fn simplex(&self) -> usize {
        self.simplex
    }

    /// Face number within that simplex.
    #[must_use]
    pub const fn face(&self) -> usize {
        self.face
    }

    /// Maps positions `0..=k` to the face's vertices and the rest to the other vertices.
    #[must_use]
    pub const fn vertices(&self) -> Perm {
        self.vertices
    }
}

/// An equivalence class of `k`-faces.
#[derive(Clone, Debug)]
pub struct Face {
    dim: usize,
    embeddings: Vec<FaceEmbedding>,
    boundary: bool,
    valid: bool,
    component: usize,
}

impl Face {
    /// The dimension `k` of this face.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of embeddings.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.embeddings.len()
    }

    /// All embeddings, in discovery order.
    #[must_use]
    pub fn embeddings(&self) -> &[FaceEmbedding] {
        &self.embeddings
    }

    /// The first embedding.
    #[must_use]
    pub fn front(&self) -> FaceEmbedding {
        self.embeddings[0]
    }

    /// The last embedding.
    #[must_use]
    pub fn back(&self) -> FaceEmbedding {
        self.embeddings[self.embeddings.len() - 1]
    }

    /// Whether this face meets an unglued facet.
    #[must_use]
    pub const fn is_boundary(&self) -> bool {
        self.boundary
    }

    /// `false` if the face is identified with itself under a non-identity map,
    /// or (for vertices) if its link is neither a sphere, a ball nor closed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Index of the connected component containing this face.
    #[must_use]
    pub const fn component(&self) -> usize {
        self.component
    }
}

/// Classification of a vertex link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Interior vertex whose link has the Euler characteristic of a sphere.
    Sphere,
    /// Boundary vertex whose link has the Euler characteristic of a ball.
    Ball,
    /// Interior vertex whose link is not sphere-like.
    Ideal,
    /// Boundary vertex whose link is not ball-like.
    Invalid,
}

impl LinkKind {
    /// Whether the link is a sphere or a ball, as in a manifold.
    #[must_use]
    pub const fn is_regular(self) -> bool {
        matches!(self, Self::Sphere | Self::Ball)
    }
}

/// The link of a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLink {
    kind: LinkKind,
    euler_characteristic: i64,
}

impl VertexLink {
    /// The link classification.
    #[must_use]
    pub const fn kind(&self) -> LinkKind {
        self.kind
    }

    /// The Euler characteristic of the link.
    #[must_use]
    pub const fn euler_characteristic(&self) -> i64 {
        self.euler_characteristic
    }
}

/// A connected component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    simplices: Vec<usize>,
    orientable: bool,
    boundary_facets: usize,
}

impl Component {
    /// Indices of the component's simplices, in increasing order.
    #[must_use]
    pub fn simplices(&self) -> &[usize] {
        &self.simplices
    }

    /// Number of simplices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.simplices.len()
    }

    /// Whether the component admits a consistent orientation.
    #[must_use]
    pub const fn is_orientable(&self) -> bool {
        self.orientable
    }

    /// Number of unglued facets in this component.
    #[must_use]
    pub const fn count_boundary_facets(&self) -> usize {
        self.boundary_facets
    }
}

/// A boundary component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundaryComponent {
    /// A maximal set of unglued facets connected through shared ridges.
    Real {
        /// `(simplex, facet)` pairs.
        facets: Vec<(usize, usize)>,
    },
    /// The link of an ideal vertex.
    Ideal {
        /// Index of the ideal vertex.
        vertex: usize,
    },
}

impl BoundaryComponent {
    /// Whether this is an ideal boundary component.
    #[must_use]
    pub const fn is_ideal(&self) -> bool {
        matches!(self, Self::Ideal { .. })
    }
}

// =============================================================================
// FACE NUMBERING
// =============================================================================

/// Vertex sets of the faces of one `D`-simplex, by dimension and face number.
#[derive(Clone, Debug)]
struct FaceNumbering {
    masks: Vec<Vec<u32>>,
    numbers: FastHashMap<u32, usize>,
}

impl FaceNumbering {
    fn new(d: usize) -> Self {
        let full = (1_u32 << (d + 1)) - 1;
        let mut masks = Vec::with_capacity(d);
        for k in 0..d {
            if k + 1 == d {
                masks.push((0..=d).map(|opposite| full & !(1 << opposite)).collect());
            } else {
                masks.push(lexicographic_subsets(d + 1, k + 1));
            }
        }
        let numbers = masks
            .iter()
            .flat_map(|by_dim| by_dim.iter().enumerate().map(|(number, &mask)| (mask, number)))
            .collect();
        Self { masks, numbers }
    }

    fn count(&self, k: usize) -> usize {
        self.masks[k].len()
    }

    fn mask(&self, k: usize, number: usize) -> u32 {
        self.masks[k][number]
    }

    fn number(&self, mask: u32) -> usize {
        self.numbers.get(&mask).copied().unwrap_or(UNASSIGNED)
    }
}

fn lexicographic_subsets(n: usize, size: usize) -> Vec<u32> {
    let mut subsets = Vec::new();
    let mut combo: SmallBuffer<usize, MAX_PERM_SIZE> = (0..size).collect();
    loop {
        subsets.push(combo.iter().fold(0_u32, |mask, &v| mask | (1 << v)));
        let Some(i) = (0..size).rev().find(|&i| combo[i] < n - size + i) else {
            return subsets;
        };
        combo[i] += 1;
        for j in i + 1..size {
            combo[j] = combo[j - 1] + 1;
        }
    }
}

/// The vertices of `mask` in increasing order, followed by the others in increasing order.
fn face_ordering(mask: u32, d: usize) -> Perm {
    let inside = (0..=d).filter(|&v| mask & (1 << v) != 0);
    let outside = (0..=d).filter(|&v| mask & (1 << v) == 0);
    Perm::from_valid_images(inside.chain(outside))
}

fn image_mask(mask: u32, perm: &Perm) -> u32 {
    perm.images()
        .iter()
        .enumerate()
        .filter(|&(v, _)| mask & (1 << v) != 0)
        .fold(0, |acc, (_, &image)| acc | (1 << image))
}

// =============================================================================
// SKELETON
// =============================================================================

/// Faces, vertex links, components, boundary components and orientation of a triangulation.
///
/// Obtained from [`Triangulation::skeleton`](crate::core::triangulation::Triangulation::skeleton),
/// which computes it on demand and caches it until the next structural change.
#[derive(Clone, Debug)]
pub struct Skeleton<const D: usize> {
    faces: Vec<Vec<Face>>,
    face_of: Vec<Vec<usize>>,
    faces_per_simplex: Vec<usize>,
    vertex_links: Vec<VertexLink>,
    components: Vec<Component>,
    simplex_component: Vec<usize>,
    boundary_components: Vec<BoundaryComponent>,
    orientation: Vec<i8>,
    simplex_count: usize,
    boundary_facet_count: usize,
}

impl<const D: usize> Skeleton<D> {
    pub(crate) fn compute(store: &SimplexStore<D>) -> Self {
        let n = store.len();
        let adjacency: Vec<FacetBuffer<Option<(usize, Perm)>>> = (0..n)
            .map(|s| (0..=D).map(|f| store.adjacent(s, f)).collect())
            .collect();
        let numbering = FaceNumbering::new(D);

        let (simplex_component, components, orientation) = compute_components(&adjacency);

        let mut faces = Vec::with_capacity(D);
        let mut face_of = Vec::with_capacity(D);
        let mut orbits = Vec::with_capacity(D);
        for k in 0..D {
            let (classes, lookup, class_orbits) =
                compute_faces::<D>(&adjacency, &numbering, k, &simplex_component);
            faces.push(classes);
            face_of.push(lookup);
            orbits.push(class_orbits);
        }
        let faces_per_simplex = (0..D).map(|k| numbering.count(k)).collect();

        let mut skeleton = Self {
            faces,
            face_of,
            faces_per_simplex,
            vertex_links: Vec::new(),
            components,
            simplex_component,
            boundary_components: Vec::new(),
            orientation,
            simplex_count: n,
            boundary_facet_count: adjacency.iter().flatten().filter(|g| g.is_none()).count(),
        };
        skeleton.classify_vertex_links(&orbits);
        skeleton.collect_boundary_components(&adjacency, &numbering);

        tracing::debug!(
            dimension = D,
            simplices = n,
            vertices = skeleton.count_faces(0),
            components = skeleton.components.len(),
            boundary_components = skeleton.boundary_components.len(),
            "computed skeleton"
        );
        skeleton
    }

    /// Number of `k`-faces; `k == D` counts the simplices themselves.
    #[must_use]
    pub fn count_faces(&self, k: usize) -> usize {
        match k {
            k if k < D => self.faces[k].len(),
            k if k == D => self.simplex_count,
            _ => 0,
        }
    }

    /// The `k`-faces for `k < D` (empty otherwise).
    #[must_use]
    pub fn faces(&self, k: usize) -> &[Face] {
        self.faces.get(k).map_or(&[], Vec::as_slice)
    }

    /// A single `k`-face.
    #[must_use]
    pub fn face(&self, k: usize, index: usize) -> Option<&Face> {
        self.faces.get(k)?.get(index)
    }

    /// The vertex classes.
    #[must_use]
    pub fn vertices(&self) -> &[Face] {
        self.faces(0)
    }

    /// The edge classes.
    #[must_use]
    pub fn edges(&self) -> &[Face] {
        self.faces(1)
    }

    /// The index of the `k`-face class containing face `face` of `simplex`.
    #[must_use]
    pub fn simplex_face(&self, k: usize, simplex: usize, face: usize) -> Option<usize> {
        let per = *self.faces_per_simplex.get(k)?;
        if simplex >= self.simplex_count || face >= per {
            return None;
        }
        self.face_of[k].get(simplex * per + face).copied()
    }

    /// The link of vertex class `vertex`.
    #[must_use]
    pub fn vertex_link(&self, vertex: usize) -> Option<&VertexLink> {
        self.vertex_links.get(vertex)
    }

    /// The links of all vertex classes, indexed like [`vertices`](Self::vertices).
    #[must_use]
    pub fn vertex_links(&self) -> &[VertexLink] {
        &self.vertex_links
    }

    /// Connected components, ordered by their lowest simplex index.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The component containing `simplex`.
    #[must_use]
    pub fn component_of(&self, simplex: usize) -> Option<usize> {
        self.simplex_component.get(simplex).copied()
    }

    /// Real boundary components followed by ideal ones.
    #[must_use]
    pub fn boundary_components(&self) -> &[BoundaryComponent] {
        &self.boundary_components
    }

    /// `+1` or `-1` for each simplex; consistent within orientable components.
    #[must_use]
    pub fn orientation(&self, simplex: usize) -> Option<i8> {
        self.orientation.get(simplex).copied()
    }

    /// Number of unglued facets.
    #[must_use]
    pub const fn count_boundary_facets(&self) -> usize {
        self.boundary_facet_count
    }

    /// Whether every component is orientable.
    #[must_use]
    pub fn is_orientable(&self) -> bool {
        self.components.iter().all(Component::is_orientable)
    }

    /// Whether the triangulation is orientable and every simplex already carries orientation `+1`.
    #[must_use]
    pub fn is_oriented(&self) -> bool {
        self.is_orientable() && self.orientation.iter().all(|&o| o == 1)
    }

    /// Whether every face is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.faces.iter().flatten().all(Face::is_valid)
    }

    /// Whether some vertex is ideal.
    #[must_use]
    pub fn is_ideal(&self) -> bool {
        self.vertex_links
            .iter()
            .any(|link| link.kind() == LinkKind::Ideal)
    }

    /// Whether there are no boundary components, real or ideal.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.boundary_components.is_empty()
    }

    fn classify_vertex_links(&mut self, orbits: &[Vec<usize>]) {
        let sign = |k: usize| -> i64 { if k % 2 == 1 { 1 } else { -1 } };
        let mut chi = vec![0_i64; self.faces[0].len()];

        // A k-face contributes one (k-1)-face to the link of each orbit of its vertices.
        for k in 1..D {
            for (class, face) in self.faces[k].iter().enumerate() {
                let front = face.front();
                let vertex_of = |position: usize| {
                    self.simplex_face(0, front.simplex, front.vertices.apply(position))
                };
                let per = k + 1;
                for position in 0..per {
                    if orbits[k][class * per + position] != position {
                        continue;
                    }
                    if let Some(vertex) = vertex_of(position) {
                        chi[vertex] += sign(k);
                    }
                }
            }
        }
        for simplex in 0..self.simplex_count {
            for v in 0..=D {
                if let Some(vertex) = self.simplex_face(0, simplex, v) {
                    chi[vertex] += sign(D);
                }
            }
        }

        let sphere = 1 + sign(D);
        let mut links = Vec::with_capacity(chi.len());
        for (vertex, &euler) in chi.iter().enumerate() {
            let boundary = self.faces[0][vertex].boundary;
            let kind = match (boundary, euler) {
                (true, 1) => LinkKind::Ball,
                (true, _) => LinkKind::Invalid,
                (false, e) if e == sphere => LinkKind::Sphere,
                (false, _) => LinkKind::Ideal,
            };
            if kind == LinkKind::Invalid {
                self.faces[0][vertex].valid = false;
            }
            links.push(VertexLink {
                kind,
                euler_characteristic: euler,
            });
        }
        self.vertex_links = links;
    }

    fn collect_boundary_components(
        &mut self,
        adjacency: &[FacetBuffer<Option<(usize, Perm)>>],
        numbering: &FaceNumbering,
    ) {
        let boundary_facets: Vec<(usize, usize)> = adjacency
            .iter()
            .enumerate()
            .flat_map(|(s, gluings)| {
                gluings
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.is_none())
                    .map(move |(f, _)| (s, f))
            })
            .collect();

        let mut sets = DisjointSets::new(boundary_facets.len());
        let ridge = D - 2;
        let mut first_facet_on_ridge: FastHashMap<usize, usize> =
            fast_hash_map_with_capacity(boundary_facets.len());
        for (i, &(s, f)) in boundary_facets.iter().enumerate() {
            for number in 0..numbering.count(ridge) {
                if numbering.mask(ridge, number) & (1 << f) != 0 {
                    continue;
                }
                let Some(class) = self.simplex_face(ridge, s, number) else {
                    continue;
                };
                match first_facet_on_ridge.get(&class) {
                    Some(&other) => {
                        sets.union(i, other);
                    }
                    None => {
                        first_facet_on_ridge.insert(class, i);
                    }
                }
            }
        }

        let mut component_of_root: FastHashMap<usize, usize> =
            fast_hash_map_with_capacity(boundary_facets.len());
        let mut real: Vec<Vec<(usize, usize)>> = Vec::new();
        for (i, &facet) in boundary_facets.iter().enumerate() {
            let root = sets.find(i);
            let next = real.len();
            let c = *component_of_root.entry(root).or_insert(next);
            if c == real.len() {
                real.push(Vec::new());
            }
            real[c].push(facet);
        }

        self.boundary_components = real
            .into_iter()
            .map(|facets| BoundaryComponent::Real { facets })
            .chain(
                self.vertex_links
                    .iter()
                    .enumerate()
                    .filter(|(_, link)| link.kind() == LinkKind::Ideal)
                    .map(|(vertex, _)| BoundaryComponent::Ideal { vertex }),
            )
            .collect();
    }
}

/// Breadth-first labelling of components, with orientations where possible.
fn compute_components(
    adjacency: &[FacetBuffer<Option<(usize, Perm)>>],
) -> (Vec<usize>, Vec<Component>, Vec<i8>) {
    let n = adjacency.len();
    let mut component_of = vec![UNASSIGNED; n];
    let mut orientation = vec![0_i8; n];
    let mut components = Vec::new();

    for start in 0..n {
        if component_of[start] != UNASSIGNED {
            continue;
        }
        let id = components.len();
        let mut simplices = vec![start];
        let mut orientable = true;
        let mut boundary_facets = 0;
        component_of[start] = id;
        orientation[start] = 1;
        let mut queue = VecDeque::from([start]);
        while let Some(s) = queue.pop_front() {
            for gluing in &adjacency[s] {
                let Some((t, g)) = gluing else {
                    boundary_facets += 1;
                    continue;
                };
                // Adjacent simplices agree in orientation across odd gluings.
                let expected = if g.sign() == 1 {
                    -orientation[s]
                } else {
                    orientation[s]
                };
                if component_of[*t] == UNASSIGNED {
                    component_of[*t] = id;
                    orientation[*t] = expected;
                    simplices.push(*t);
                    queue.push_back(*t);
                } else if orientation[*t] != expected {
                    orientable = false;
                }
            }
        }
        simplices.sort_unstable();
        components.push(Component {
            simplices,
            orientable,
            boundary_facets,
        });
    }
    (component_of, components, orientation)
}

/// Face classes of dimension `k`, the per-simplex lookup table, and for each class
/// the union-find parents of its vertex positions under self-identifications.
fn compute_faces<const D: usize>(
    adjacency: &[FacetBuffer<Option<(usize, Perm)>>],
    numbering: &FaceNumbering,
    k: usize,
    simplex_component: &[usize],
) -> (Vec<Face>, Vec<usize>, Vec<usize>) {
    let n = adjacency.len();
    let per = numbering.count(k);
    let mut class_of = vec![UNASSIGNED; n * per];
    let mut perms: Vec<Option<Perm>> = vec![None; n * per];
    let mut classes = Vec::new();
    let mut orbits = Vec::new();

    for s in 0..n {
        for number in 0..per {
            if class_of[s * per + number] != UNASSIGNED {
                continue;
            }
            let class = classes.len();
            let start = face_ordering(numbering.mask(k, number), D);
            class_of[s * per + number] = class;
            perms[s * per + number] = Some(start);

            let mut face = Face {
                dim: k,
                embeddings: vec![FaceEmbedding {
                    simplex: s,
                    face: number,
                    vertices: start,
                }],
                boundary: false,
                valid: true,
                component: simplex_component[s],
            };
            let mut positions = DisjointSets::new(k + 1);
            let mut queue = VecDeque::from([(s, number)]);
            while let Some((t, t_number)) = queue.pop_front() {
                let Some(p) = perms[t * per + t_number] else {
                    continue;
                };
                let mask = numbering.mask(k, t_number);
                for facet in (0..=D).filter(|&i| mask & (1 << i) == 0) {
                    let Some((u, g)) = adjacency[t][facet] else {
                        face.boundary = true;
                        continue;
                    };
                    let u_number = numbering.number(image_mask(mask, &g));
                    let slot = u * per + u_number;
                    let derived = g * p;
                    match perms[slot] {
                        None => {
                            class_of[slot] = class;
                            perms[slot] = Some(derived);
                            face.embeddings.push(FaceEmbedding {
                                simplex: u,
                                face: u_number,
                                vertices: derived,
                            });
                            queue.push_back((u, u_number));
                        }
                        Some(existing) => {
                            for a in 0..=k {
                                let b = existing.pre_image(derived.apply(a));
                                if b != a {
                                    face.valid = false;
                                    positions.union(a, b);
                                }
                            }
                        }
                    }
                }
            }
            for position in 0..=k {
                orbits.push(positions.find(position));
            }
            classes.push(face);
        }
    }
    (classes, class_of, orbits)
}

// =============================================================================
// TESTS
// =============================================================================
