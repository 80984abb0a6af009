//! Hexahedral meshes for synapse bounding boxes.
//!
//! Every edge contributes one axis-aligned box: 8 corners and 6 quads. All
//! boxes of a stratum are concatenated into a single [`BoxMesh`], with each
//! box's local face indices offset by `8 * i`.
//!
//! # Corner order
//!
//! With transformed corners `a = map(bbox_min)` and `b = map(bbox_max)`:
//!
//! | local | x | y | z |
//! |-------|---|---|---|
//! | 0 | a | a | a |
//! | 1 | a | a | b |
//! | 2 | a | b | b |
//! | 3 | a | b | a |
//! | 4 | b | a | a |
//! | 5 | b | a | b |
//! | 6 | b | b | b |
//! | 7 | b | b | a |
//!
//! Faces wind counter-clockwise seen from outside when `a <= b` on every
//! axis. The mapping may flip an axis (negative scale) or the input may
//! already have reversed corners; a box mirrored an odd number of times has
//! its winding reversed so normals stay outward.

use std::borrow::Borrow;
use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::error::{Result, SynMeshError};
use crate::graph::SynapseEdge;
use crate::mapper::CoordinateMapper;

/// Vertices per box.
pub const BOX_VERTICES: usize = 8;

/// Faces per box.
pub const BOX_FACES: usize = 6;

/// Local quads of one box: -x, -z, -y, +z, +y, +x.
const LOCAL_FACES: [[usize; 4]; BOX_FACES] = [
    [0, 1, 2, 3],
    [0, 3, 7, 4],
    [0, 4, 5, 1],
    [1, 5, 6, 2],
    [2, 6, 7, 3],
    [5, 4, 7, 6],
];

/// The 8 corners spanned by two opposite corners, in canonical order.
pub fn box_corners(a: &Point3<f64>, b: &Point3<f64>) -> [Point3<f64>; BOX_VERTICES] {
    [
        Point3::new(a.x, a.y, a.z),
        Point3::new(a.x, a.y, b.z),
        Point3::new(a.x, b.y, b.z),
        Point3::new(a.x, b.y, a.z),
        Point3::new(b.x, a.y, a.z),
        Point3::new(b.x, a.y, b.z),
        Point3::new(b.x, b.y, b.z),
        Point3::new(b.x, b.y, a.z),
    ]
}

/// Whether the corner pair is mirrored an odd number of times.
#[inline]
fn is_mirrored(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    (0..3).filter(|&i| b[i] < a[i]).count() % 2 == 1
}

/// Faces of box number `box_index`, addressed into the concatenated buffer.
fn box_faces(box_index: usize, mirrored: bool) -> [[usize; 4]; BOX_FACES] {
    let offset = BOX_VERTICES * box_index;
    LOCAL_FACES.map(|[v0, v1, v2, v3]| {
        if mirrored {
            [v0 + offset, v3 + offset, v2 + offset, v1 + offset]
        } else {
            [v0 + offset, v1 + offset, v2 + offset, v3 + offset]
        }
    })
}

/// A set of disjoint boxes as one quad mesh.
///
/// `vertices.len() == 8 * n` and `faces.len() == 6 * n`; the faces of box `i`
/// only reference vertices `8*i ..= 8*i + 7`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[usize; 4]>,
}

impl BoxMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mesh with room for `boxes` boxes.
    pub fn with_capacity(boxes: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(boxes * BOX_VERTICES),
            faces: Vec::with_capacity(boxes * BOX_FACES),
        }
    }

    /// Append the box spanned by two opposite mesh-space corners.
    pub fn push_box(&mut self, a: &Point3<f64>, b: &Point3<f64>) {
        let index = self.num_boxes();
        self.vertices.extend_from_slice(&box_corners(a, b));
        self.faces.extend_from_slice(&box_faces(index, is_mirrored(a, b)));
    }

    /// Number of boxes.
    #[inline]
    pub fn num_boxes(&self) -> usize {
        self.vertices.len() / BOX_VERTICES
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of quad faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Whether the mesh has no boxes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// All vertex positions.
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// All quads, as indices into [`vertices`](Self::vertices).
    pub fn faces(&self) -> &[[usize; 4]] {
        &self.faces
    }

    /// The 8 corners of box `i`.
    ///
    /// # Panics
    /// Panics if `i >= num_boxes()`.
    pub fn box_vertices(&self, i: usize) -> &[Point3<f64>] {
        &self.vertices[i * BOX_VERTICES..(i + 1) * BOX_VERTICES]
    }

    /// The 6 quads of box `i`.
    ///
    /// # Panics
    /// Panics if `i >= num_boxes()`.
    pub fn box_faces(&self, i: usize) -> &[[usize; 4]] {
        &self.faces[i * BOX_FACES..(i + 1) * BOX_FACES]
    }

    /// Unit normal of face `f` by the right-hand rule.
    ///
    /// Zero for a face collapsed to a line or point.
    pub fn face_normal(&self, f: usize) -> Vector3<f64> {
        let [v0, v1, v2, v3] = self.faces[f];
        let p = |v: usize| self.vertices[v];
        // Diagonal cross product: exact for planar quads, robust to one
        // collapsed edge.
        let n = (p(v2) - p(v0)).cross(&(p(v3) - p(v1)));
        n.try_normalize(1e-300).unwrap_or_else(Vector3::zeros)
    }

    /// Centroid of face `f`.
    pub fn face_centroid(&self, f: usize) -> Point3<f64> {
        let sum = self.faces[f]
            .iter()
            .fold(Vector3::zeros(), |acc, &v| acc + self.vertices[v].coords);
        Point3::from(sum / 4.0)
    }

    /// Axis-aligned bounds of all vertices, or `None` when empty.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        super::bounding_box(&self.vertices)
    }

    /// Check that every box is a closed, consistently oriented surface.
    ///
    /// Each directed edge must occur exactly once and its reverse exactly
    /// once.
    pub fn is_closed(&self) -> bool {
        let mut directed: HashMap<(usize, usize), usize> = HashMap::with_capacity(self.faces.len() * 4);
        for face in &self.faces {
            for k in 0..4 {
                *directed.entry((face[k], face[(k + 1) % 4])).or_default() += 1;
            }
        }
        directed
            .iter()
            .all(|(&(u, v), &count)| count == 1 && directed.get(&(v, u)) == Some(&1))
    }

    /// Split every quad into two triangles, keeping the winding.
    pub fn triangulate(&self) -> Vec<[usize; 3]> {
        self.faces
            .iter()
            .flat_map(|&[v0, v1, v2, v3]| [[v0, v1, v2], [v0, v2, v3]])
            .collect()
    }

    /// Take the vertex and face buffers.
    pub fn into_parts(self) -> (Vec<Point3<f64>>, Vec<[usize; 4]>) {
        (self.vertices, self.faces)
    }
}

/// Options for [`BoxMeshBuilder`].
#[derive(Debug, Clone)]
pub struct BoxMeshOptions {
    /// Whether to compute box corners in parallel (default: false).
    ///
    /// The output is identical either way.
    pub parallel: bool,
}

impl Default for BoxMeshOptions {
    fn default() -> Self {
        Self { parallel: false }
    }
}

impl BoxMeshOptions {
    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Builds [`BoxMesh`]es from synapse bounding boxes.
#[derive(Debug, Clone, Default)]
pub struct BoxMeshBuilder {
    mapper: CoordinateMapper,
    options: BoxMeshOptions,
}

impl BoxMeshBuilder {
    /// Create a builder using the given mapper.
    pub fn new(mapper: CoordinateMapper) -> Self {
        Self {
            mapper,
            options: BoxMeshOptions::default(),
        }
    }

    /// Set the builder options.
    pub fn with_options(mut self, options: BoxMeshOptions) -> Self {
        self.options = options;
        self
    }

    /// Build one box per edge, in edge order. Empty input gives an empty mesh.
    ///
    /// # Example
    ///
    /// ```
    /// use synmesh::geometry::BoxMeshBuilder;
    /// use synmesh::graph::SynapseEdge;
    /// use synmesh::mapper::{Calibration, CoordinateMapper};
    /// use nalgebra::Point3;
    ///
    /// let edge = SynapseEdge::at(1, 2, Point3::new(0.5, 0.5, 0.5))
    ///     .with_bbox(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    ///
    /// let builder = BoxMeshBuilder::new(CoordinateMapper::new(Calibration::identity()));
    /// let mesh = builder.build(&[edge]);
    /// assert_eq!(mesh.num_vertices(), 8);
    /// assert_eq!(mesh.num_faces(), 6);
    /// assert!(mesh.is_closed());
    /// ```
    pub fn build<E>(&self, edges: &[E]) -> BoxMesh
    where
        E: Borrow<SynapseEdge> + Sync,
    {
        let map_pair = |e: &E| {
            let e = e.borrow();
            (self.mapper.map(&e.bbox_min), self.mapper.map(&e.bbox_max))
        };

        let pairs: Vec<(Point3<f64>, Point3<f64>)> = if self.options.parallel {
            edges.par_iter().map(map_pair).collect()
        } else {
            edges.iter().map(map_pair).collect()
        };

        let mut mesh = BoxMesh::with_capacity(pairs.len());
        for (a, b) in &pairs {
            mesh.push_box(a, b);
        }
        mesh
    }

    /// Like [`build`](Self::build), but an empty input is an error.
    pub fn build_strict<E>(&self, edges: &[E]) -> Result<BoxMesh>
    where
        E: Borrow<SynapseEdge> + Sync,
    {
        if edges.is_empty() {
            return Err(SynMeshError::empty_geometry("box mesh of zero edges"));
        }
        Ok(self.build(edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Calibration;

    fn identity_builder() -> BoxMeshBuilder {
        BoxMeshBuilder::new(CoordinateMapper::new(Calibration::identity()))
    }

    fn boxed(min: [f64; 3], max: [f64; 3]) -> SynapseEdge {
        SynapseEdge::at(1, 2, Point3::origin()).with_bbox(Point3::from(min), Point3::from(max))
    }

    fn sample_edges() -> Vec<SynapseEdge> {
        vec![
            boxed([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            boxed([2.0, 0.0, 0.0], [3.0, 2.0, 4.0]),
            boxed([-5.0, -5.0, -5.0], [-4.5, -4.0, -1.0]),
        ]
    }

    fn box_centroid(mesh: &BoxMesh, i: usize) -> Point3<f64> {
        let sum = mesh
            .box_vertices(i)
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords);
        Point3::from(sum / BOX_VERTICES as f64)
    }

    fn assert_outward(mesh: &BoxMesh) {
        for i in 0..mesh.num_boxes() {
            let center = box_centroid(mesh, i);
            for f in i * BOX_FACES..(i + 1) * BOX_FACES {
                let outward = mesh.face_centroid(f) - center;
                let dot = mesh.face_normal(f).dot(&outward);
                assert!(dot > 0.0, "box {} face {} points inward", i, f);
            }
        }
    }

    #[test]
    fn test_cardinality() {
        let edges = sample_edges();
        let mesh = identity_builder().build(&edges);
        assert_eq!(mesh.num_boxes(), 3);
        assert_eq!(mesh.num_vertices(), 24);
        assert_eq!(mesh.num_faces(), 18);
    }

    #[test]
    fn test_empty_input() {
        let edges: Vec<SynapseEdge> = Vec::new();
        let mesh = identity_builder().build(&edges);
        assert!(mesh.is_empty());
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.bounding_box().is_none());

        assert!(matches!(
            identity_builder().build_strict(&edges),
            Err(SynMeshError::EmptyGeometry { .. })
        ));
    }

    #[test]
    fn test_face_locality() {
        let mesh = identity_builder().build(&sample_edges());
        for (f, face) in mesh.faces().iter().enumerate() {
            let i = f / BOX_FACES;
            for &v in face {
                assert!(
                    (BOX_VERTICES * i..BOX_VERTICES * i + BOX_VERTICES).contains(&v),
                    "face {} of box {} references vertex {}",
                    f,
                    i,
                    v
                );
            }
        }
    }

    #[test]
    fn test_each_face_uses_four_distinct_corners_once() {
        let mesh = identity_builder().build(&sample_edges()[..1]);
        let mut uses = [0usize; BOX_VERTICES];
        for face in mesh.faces() {
            let mut sorted = *face;
            sorted.sort_unstable();
            assert!(sorted.windows(2).all(|w| w[0] != w[1]));
            for &v in face {
                uses[v] += 1;
            }
        }
        // Every corner of a box touches exactly three faces.
        assert_eq!(uses, [3; BOX_VERTICES]);
    }

    #[test]
    fn test_corners_cover_the_box() {
        let mesh = identity_builder().build(&sample_edges()[1..2]);
        let verts = mesh.box_vertices(0);
        assert_eq!(verts[0], Point3::new(2.0, 0.0, 0.0));
        assert_eq!(verts[6], Point3::new(3.0, 2.0, 4.0));
        assert_eq!(
            mesh.bounding_box(),
            Some((Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 2.0, 4.0)))
        );
    }

    #[test]
    fn test_closed_and_outward() {
        let mesh = identity_builder().build(&sample_edges());
        assert!(mesh.is_closed());
        assert_outward(&mesh);
    }

    #[test]
    fn test_negative_scale_stays_outward() {
        // One flipped axis mirrors every box.
        let mapper = CoordinateMapper::new(Calibration::identity().with_scale_z(-1.0));
        let mesh = BoxMeshBuilder::new(mapper).build(&sample_edges());
        assert!(mesh.is_closed());
        assert_outward(&mesh);

        // The corners come from the transformed pair, not a re-sorted one.
        assert_eq!(mesh.box_vertices(0)[0], Point3::new(0.0, 0.0, -0.0));
        assert_eq!(mesh.box_vertices(0)[1], Point3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_reversed_input_corners() {
        let edges = vec![
            boxed([1.0, 0.0, 0.0], [0.0, 1.0, 1.0]),
            boxed([1.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            boxed([1.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
        ];
        let mesh = identity_builder().build(&edges);
        assert!(mesh.is_closed());
        assert_outward(&mesh);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let edges: Vec<SynapseEdge> = (0..500)
            .map(|i| {
                let x = i as f64;
                boxed([x, x * 0.5, -x], [x + 1.0, x * 0.5 + 2.0, -x + 3.0])
            })
            .collect();
        let mapper = CoordinateMapper::default();
        let sequential = BoxMeshBuilder::new(mapper).build(&edges);
        let parallel = BoxMeshBuilder::new(mapper)
            .with_options(BoxMeshOptions::default().with_parallel(true))
            .build(&edges);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_accepts_edge_references() {
        let edges = sample_edges();
        let refs: Vec<&SynapseEdge> = edges.iter().collect();
        assert_eq!(identity_builder().build(&refs), identity_builder().build(&edges));
    }

    #[test]
    fn test_triangulate() {
        let mesh = identity_builder().build(&sample_edges()[..1]);
        let tris = mesh.triangulate();
        assert_eq!(tris.len(), 12);
        assert_eq!(tris[0], [0, 1, 2]);
        assert_eq!(tris[1], [0, 2, 3]);
    }
}
