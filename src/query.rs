//! Per-cell synapse geometry queries.
//!
//! [`QueryFacade`] ties the pieces together: it pulls a directional
//! [`Subgraph`](crate::graph::Subgraph) from a [`GraphIndex`], then builds
//! point sets and box meshes for each non-empty stratum. The result is a
//! plain value; rendering, materials and scene placement belong to whoever
//! consumes it.
//!
//! # Example
//!
//! ```
//! use synmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let edges = vec![SynapseEdge::at(1, 2, Point3::new(100000.0, 100000.0, 0.0))
//!     .with_bbox(Point3::new(90000.0, 90000.0, 0.0), Point3::new(110000.0, 110000.0, 1000.0))];
//! let cells = vec![
//!     CellRecord::new(1, CellType::Excitatory),
//!     CellRecord::new(2, CellType::Inhibitory),
//! ];
//! let index = GraphIndex::load(edges, cells).unwrap();
//!
//! let facade = QueryFacade::new(&index, CoordinateMapper::default());
//! let request = GeometryRequest::default().with_points(true);
//! let geometry = facade.synapse_geometry(CellId(2), Direction::Incoming, &request).unwrap();
//!
//! assert_eq!(geometry.counts.as_tuple(), (1, 0, 1));
//! assert!(geometry.get(Stratum::Smooth).is_none());
//! assert_eq!(geometry.get(Stratum::Spiny).unwrap().boxes.as_ref().unwrap().num_faces(), 6);
//! ```

use std::fmt;

use nalgebra::Point3;

use crate::error::{Result, SynMeshError};
use crate::geometry::{BoxMesh, BoxMeshBuilder, BoxMeshOptions, PointExtractor};
use crate::graph::{
    CellId, CellRecord, Direction, GraphIndex, NeighborDirection, SynapseEdge, TypeFilter,
};
use crate::mapper::CoordinateMapper;

/// One partition of a directional subgraph.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Stratum {
    /// Every synapse.
    All,
    /// Synapses with inhibitory partners.
    Smooth,
    /// Synapses with excitatory partners.
    Spiny,
}

impl Stratum {
    /// All strata in output order.
    pub const ALL: [Stratum; 3] = [Stratum::All, Stratum::Smooth, Stratum::Spiny];

    /// Short label used in geometry names.
    pub fn label(self) -> &'static str {
        match self {
            Stratum::All => "all",
            Stratum::Smooth => "smooth",
            Stratum::Spiny => "spiny",
        }
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Explicit identifier of one piece of returned geometry.
///
/// Displays as `{cell}_{in|out}_{stratum}`, e.g. `42_in_smooth`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct GeometryKey {
    /// The queried cell.
    pub cell: CellId,
    /// Query direction.
    pub direction: Direction,
    /// Partition of the subgraph.
    pub stratum: Stratum,
}

impl fmt::Display for GeometryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.cell, self.direction, self.stratum)
    }
}

/// The two outputs built for a stratum.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GeometryKind {
    /// Location point set.
    Points,
    /// Bounding-box mesh.
    Boxes,
}

impl GeometryKey {
    /// Name for one output of this stratum, unique across kinds.
    ///
    /// Point sets use the key itself; box meshes append `_boxes`, e.g.
    /// `42_in_smooth` and `42_in_smooth_boxes`.
    pub fn object_name(&self, kind: GeometryKind) -> String {
        match kind {
            GeometryKind::Points => self.to_string(),
            GeometryKind::Boxes => format!("{}_boxes", self),
        }
    }
}

/// What to build for each stratum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryRequest {
    /// Build location point sets (default: false).
    pub points: bool,
    /// Build bounding-box meshes (default: true).
    pub boxes: bool,
    /// Fail with [`SynMeshError::EmptyGeometry`] when the cell has no
    /// synapses in the queried direction (default: false).
    pub require_non_empty: bool,
}

impl Default for GeometryRequest {
    fn default() -> Self {
        Self {
            points: false,
            boxes: true,
            require_non_empty: false,
        }
    }
}

impl GeometryRequest {
    /// Set whether to build point sets.
    pub fn with_points(mut self, points: bool) -> Self {
        self.points = points;
        self
    }

    /// Set whether to build box meshes.
    pub fn with_boxes(mut self, boxes: bool) -> Self {
        self.boxes = boxes;
        self
    }

    /// Require at least one synapse.
    pub fn strict(mut self) -> Self {
        self.require_non_empty = true;
        self
    }
}

/// Synapse counts of a directional query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynapseCounts {
    /// All synapses.
    pub total: usize,
    /// Synapses with smooth partners.
    pub smooth: usize,
    /// Synapses with spiny partners.
    pub spiny: usize,
}

impl SynapseCounts {
    /// `(total, smooth, spiny)`.
    pub fn as_tuple(&self) -> (usize, usize, usize) {
        (self.total, self.smooth, self.spiny)
    }
}

/// Geometry for one non-empty stratum.
#[derive(Debug, Clone)]
pub struct StratumGeometry {
    /// Identifier of this geometry.
    pub key: GeometryKey,
    /// Number of synapses in the stratum.
    pub edge_count: usize,
    /// Mapped synapse locations, if requested.
    pub points: Option<Vec<Point3<f64>>>,
    /// Bounding-box mesh, if requested.
    pub boxes: Option<BoxMesh>,
}

/// Result of [`QueryFacade::synapse_geometry`].
#[derive(Debug, Clone)]
pub struct SynapseGeometry {
    /// The queried cell.
    pub cell: CellId,
    /// Query direction.
    pub direction: Direction,
    /// Non-empty strata, in [`Stratum::ALL`] order.
    pub strata: Vec<StratumGeometry>,
    /// Synapse counts, including empty strata.
    pub counts: SynapseCounts,
}

impl SynapseGeometry {
    /// Geometry of a stratum, or `None` if it had no synapses.
    pub fn get(&self, stratum: Stratum) -> Option<&StratumGeometry> {
        self.strata.iter().find(|s| s.key.stratum == stratum)
    }

    /// Whether the query found no synapses.
    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }
}

/// A cell together with its incoming and outgoing synapse geometry.
#[derive(Debug, Clone)]
pub struct CellGeometry {
    /// Registry entry of the cell.
    pub record: CellRecord,
    /// Synapses onto the cell.
    pub incoming: SynapseGeometry,
    /// Synapses from the cell.
    pub outgoing: SynapseGeometry,
}

/// Answers geometry queries against a loaded [`GraphIndex`].
#[derive(Debug, Clone)]
pub struct QueryFacade<'a> {
    index: &'a GraphIndex,
    points: PointExtractor,
    boxes: BoxMeshBuilder,
}

impl<'a> QueryFacade<'a> {
    /// Create a facade over `index` using `mapper` for all geometry.
    pub fn new(index: &'a GraphIndex, mapper: CoordinateMapper) -> Self {
        Self {
            index,
            points: PointExtractor::new(mapper),
            boxes: BoxMeshBuilder::new(mapper),
        }
    }

    /// Set the box building options.
    pub fn with_box_options(mut self, options: BoxMeshOptions) -> Self {
        self.boxes = self.boxes.with_options(options);
        self
    }

    /// The underlying index.
    pub fn index(&self) -> &'a GraphIndex {
        self.index
    }

    /// Build synapse geometry for `cell` in `direction`, per stratum.
    ///
    /// Empty strata are left out of the result but still counted.
    ///
    /// # Errors
    ///
    /// - [`SynMeshError::UnknownCell`] if `cell` is not registered
    /// - [`SynMeshError::EmptyGeometry`] if the request is strict and there are
    ///   no synapses
    pub fn synapse_geometry(
        &self,
        cell: CellId,
        direction: Direction,
        request: &GeometryRequest,
    ) -> Result<SynapseGeometry> {
        self.index.cell_type(cell)?;
        let sub = self.index.subgraph(cell, direction);

        let counts = SynapseCounts {
            total: sub.all.len(),
            smooth: sub.smooth.len(),
            spiny: sub.spiny.len(),
        };

        if request.require_non_empty && counts.total == 0 {
            return Err(SynMeshError::empty_geometry(format!(
                "cell {} ({} synapses)",
                cell, direction
            )));
        }

        let mut strata = Vec::with_capacity(Stratum::ALL.len());
        for stratum in Stratum::ALL {
            let edges: &[&SynapseEdge] = match stratum {
                Stratum::All => &sub.all,
                Stratum::Smooth => &sub.smooth,
                Stratum::Spiny => &sub.spiny,
            };
            if edges.is_empty() {
                continue;
            }

            strata.push(StratumGeometry {
                key: GeometryKey {
                    cell,
                    direction,
                    stratum,
                },
                edge_count: edges.len(),
                points: request.points.then(|| self.points.extract(edges)),
                boxes: request.boxes.then(|| self.boxes.build(edges)),
            });
        }

        match direction {
            Direction::Incoming => log::info!(
                "Loaded {} input synapses. {} from smooth, {} from spiny.",
                counts.total,
                counts.smooth,
                counts.spiny
            ),
            Direction::Outgoing => log::info!(
                "Loaded {} output synapses. {} to smooth, {} to spiny.",
                counts.total,
                counts.smooth,
                counts.spiny
            ),
        }

        Ok(SynapseGeometry {
            cell,
            direction,
            strata,
            counts,
        })
    }

    /// The cell's registry entry with both directions of synapse geometry.
    pub fn cell_with_synapses(&self, cell: CellId, request: &GeometryRequest) -> Result<CellGeometry> {
        let cell_type = self.index.cell_type(cell)?;
        Ok(CellGeometry {
            record: CellRecord { cell_id: cell, cell_type },
            incoming: self.synapse_geometry(cell, Direction::Incoming, request)?,
            outgoing: self.synapse_geometry(cell, Direction::Outgoing, request)?,
        })
    }

    /// Registry entries of the partners of `cell`, ascending by id.
    pub fn neighbor_cells(
        &self,
        cell: CellId,
        direction: NeighborDirection,
        filter: TypeFilter,
    ) -> Result<Vec<CellRecord>> {
        self.index.cell_type(cell)?;
        self.index
            .neighbors(cell, direction, filter)
            .into_iter()
            .map(|id| {
                Ok(CellRecord {
                    cell_id: id,
                    cell_type: self.index.cell_type(id)?,
                })
            })
            .collect()
    }
}
