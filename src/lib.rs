//! # synmesh
//!
//! Synapse geometry from connectomics connectivity graphs.
//!
//! synmesh reads a synapse edge list (pre/post cell ids, synapse location and
//! bounding box per row) and a cell registry (cell id and type), and derives
//! per-cell geometry that lines up with independently produced cell surface
//! meshes: point sets of synapse locations and hexahedral box meshes of
//! synapse bounding boxes, split by direction and by partner type.
//!
//! ## Features
//!
//! - **Directional subgraphs**: incoming or outgoing synapses of a cell,
//!   stratified into all / smooth (inhibitory partner) / spiny (excitatory
//!   partner)
//! - **Calibrated coordinates**: injectable affine mapping from graph space
//!   to mesh space
//! - **Box meshes**: watertight, outward-wound quad boxes concatenated with
//!   per-box index offsets
//! - **Plain values out**: geometry is returned keyed by explicit identifiers;
//!   rendering is left to the caller
//!
//! ## Quick Start
//!
//! ```no_run
//! use synmesh::prelude::*;
//!
//! let config = SynMeshConfig::from_file("synmesh.toml").unwrap();
//! let index = config.open_index().unwrap();
//! let facade = QueryFacade::new(&index, config.mapper());
//!
//! let geometry = facade
//!     .synapse_geometry(CellId(42), Direction::Incoming, &GeometryRequest::default())
//!     .unwrap();
//!
//! for stratum in &geometry.strata {
//!     if let Some(boxes) = &stratum.boxes {
//!         println!("{}: {} boxes", stratum.key, boxes.num_boxes());
//!     }
//! }
//! ```
//!
//! ## Building Geometry Directly
//!
//! ```
//! use synmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let edges = vec![
//!     SynapseEdge::at(1, 2, Point3::new(1.0, 1.0, 1.0))
//!         .with_bbox(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0)),
//!     SynapseEdge::at(1, 2, Point3::new(5.0, 5.0, 5.0))
//!         .with_bbox(Point3::new(4.0, 4.0, 4.0), Point3::new(6.0, 6.0, 6.0)),
//! ];
//!
//! let mapper = CoordinateMapper::new(Calibration::identity());
//! let mesh = BoxMeshBuilder::new(mapper).build(&edges);
//! assert_eq!(mesh.num_vertices(), 16);
//! assert_eq!(mesh.num_faces(), 12);
//!
//! let points = PointExtractor::new(mapper).extract(&edges);
//! assert_eq!(points[1], Point3::new(5.0, 5.0, 5.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod mapper;
pub mod query;
pub mod soma;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use synmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::SynMeshConfig;
    pub use crate::error::{Result, SynMeshError};
    pub use crate::geometry::{BoxMesh, BoxMeshBuilder, BoxMeshOptions, PointExtractor};
    pub use crate::graph::{
        CellId, CellRecord, CellType, Direction, GraphIndex, LoadOptions, NeighborDirection,
        Subgraph, SynapseEdge, TypeFilter, UnregisteredPolicy,
    };
    pub use crate::mapper::{Calibration, CoordinateMapper};
    pub use crate::query::{
        GeometryKey, GeometryKind, GeometryRequest, QueryFacade, Stratum, SynapseGeometry,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{Point3, Vector3};

    /// Two excitatory and two inhibitory cells wired in a ring plus chords.
    fn ring() -> GraphIndex {
        let cells = vec![
            CellRecord::new(1, CellType::Excitatory),
            CellRecord::new(2, CellType::Inhibitory),
            CellRecord::new(3, CellType::Excitatory),
            CellRecord::new(4, CellType::Inhibitory),
        ];
        let mut edges = Vec::new();
        for (k, (s, t)) in [(1, 2), (2, 3), (3, 4), (4, 1), (1, 3), (2, 4), (3, 1)]
            .into_iter()
            .enumerate()
        {
            let c = 1000.0 * k as f64;
            let half = Vector3::new(10.0, 10.0, 1.0);
            let location = Point3::new(c, c, c);
            edges.push(SynapseEdge::at(s, t, location).with_bbox(location - half, location + half));
        }
        GraphIndex::load(edges, cells).unwrap()
    }

    #[test]
    fn test_pipeline_invariants() {
        let index = ring();
        let mapper = CoordinateMapper::default();
        let facade = QueryFacade::new(&index, mapper);
        let request = GeometryRequest::default().with_points(true);

        for cell in index.cells() {
            for direction in Direction::ALL {
                let sub = index.subgraph(cell, direction);
                let geometry = facade.synapse_geometry(cell, direction, &request).unwrap();
                assert_eq!(geometry.counts.as_tuple(), sub.counts());
                assert_eq!(sub.all.len(), sub.smooth.len() + sub.spiny.len());

                for stratum in &geometry.strata {
                    let n = stratum.edge_count;
                    let boxes = stratum.boxes.as_ref().unwrap();
                    assert_eq!(boxes.num_vertices(), 8 * n);
                    assert_eq!(boxes.num_faces(), 6 * n);
                    assert!(boxes.is_closed());
                    assert_eq!(stratum.points.as_ref().unwrap().len(), n);
                }
            }
        }
    }

    #[test]
    fn test_box_extent_matches_scale_factors() {
        let index = ring();
        let mapper = CoordinateMapper::default();
        let facade = QueryFacade::new(&index, mapper);
        let geometry = facade
            .synapse_geometry(CellId(1), Direction::Outgoing, &GeometryRequest::default())
            .unwrap();

        let boxes = geometry.get(Stratum::All).unwrap().boxes.as_ref().unwrap();
        let verts = boxes.box_vertices(0);
        let extent = verts[6] - verts[0];
        let expected = Vector3::new(20.0, 20.0, 2.0).component_mul(&mapper.scale_factors());
        assert!((extent - expected).norm() < 1e-12);
    }
}
