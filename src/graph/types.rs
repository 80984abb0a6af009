//! Value types for cells and synapse edges.

use std::collections::HashMap;
use std::fmt;

use nalgebra::Point3;

use crate::error::{Result, SynMeshError};

/// Identifier of a segmented cell.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct CellId(pub u64);

impl CellId {
    /// Get the raw id.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CellId {
    fn from(v: u64) -> Self {
        CellId(v)
    }
}

/// Physiological type of a cell.
///
/// Excitatory cells are spiny, inhibitory cells are smooth.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CellType {
    /// Excitatory (spiny) cell, registry code `E`.
    Excitatory,
    /// Inhibitory (smooth) cell, registry code `I`.
    Inhibitory,
    /// Any other registry code.
    Unknown,
}

impl CellType {
    /// Parse a registry type code. Returns `None` for an empty code.
    pub fn from_code(code: &str) -> Option<CellType> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        Some(if code.eq_ignore_ascii_case("e") {
            CellType::Excitatory
        } else if code.eq_ignore_ascii_case("i") {
            CellType::Inhibitory
        } else {
            CellType::Unknown
        })
    }

    /// The registry code for this type.
    pub fn code(self) -> &'static str {
        match self {
            CellType::Excitatory => "E",
            CellType::Inhibitory => "I",
            CellType::Unknown => "?",
        }
    }

    /// Whether this is a smooth (inhibitory) cell.
    #[inline]
    pub fn is_smooth(self) -> bool {
        self == CellType::Inhibitory
    }

    /// Whether this is a spiny (excitatory) cell.
    #[inline]
    pub fn is_spiny(self) -> bool {
        self == CellType::Excitatory
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellType::Excitatory => "excitatory",
            CellType::Inhibitory => "inhibitory",
            CellType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One row of the cell registry.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct CellRecord {
    /// The cell id.
    pub cell_id: CellId,
    /// The cell's type.
    pub cell_type: CellType,
}

impl CellRecord {
    /// Create a new record.
    pub fn new(cell_id: impl Into<CellId>, cell_type: CellType) -> Self {
        Self {
            cell_id: cell_id.into(),
            cell_type,
        }
    }
}

/// Mapping from cell id to registry record. Keys are unique.
#[derive(Debug, Clone, Default)]
pub struct CellRegistry {
    cells: HashMap<CellId, CellRecord>,
}

impl CellRegistry {
    /// Build a registry, rejecting duplicate ids.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = CellRecord>,
    {
        let mut cells = HashMap::new();
        for (row, record) in records.into_iter().enumerate() {
            if cells.insert(record.cell_id, record).is_some() {
                return Err(SynMeshError::data_format(
                    "registry",
                    row + 1,
                    format!("duplicate cell id {}", record.cell_id),
                ));
            }
        }
        Ok(Self { cells })
    }

    /// Look up a record.
    #[inline]
    pub fn get(&self, cell_id: CellId) -> Option<&CellRecord> {
        self.cells.get(&cell_id)
    }

    /// Whether the registry has an entry for this cell.
    #[inline]
    pub fn contains(&self, cell_id: CellId) -> bool {
        self.cells.contains_key(&cell_id)
    }

    /// Number of registered cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &CellRecord> {
        self.cells.values()
    }
}

/// One synapse of the connectivity graph, in graph-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapseEdge {
    /// Presynaptic cell.
    pub source: CellId,
    /// Postsynaptic cell.
    pub target: CellId,
    /// Synapse location.
    pub location: Point3<f64>,
    /// First bounding-box corner, nominally the minimum.
    pub bbox_min: Point3<f64>,
    /// Second bounding-box corner, nominally the maximum.
    pub bbox_max: Point3<f64>,
}

impl SynapseEdge {
    /// Create an edge whose bounding box is degenerate at the location.
    pub fn at(source: impl Into<CellId>, target: impl Into<CellId>, location: Point3<f64>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            location,
            bbox_min: location,
            bbox_max: location,
        }
    }

    /// Set the bounding box corners.
    pub fn with_bbox(mut self, bbox_min: Point3<f64>, bbox_max: Point3<f64>) -> Self {
        self.bbox_min = bbox_min;
        self.bbox_max = bbox_max;
        self
    }
}

/// Direction of a subgraph query relative to the queried cell.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Direction {
    /// Synapses onto the cell; partner is the source.
    Incoming,
    /// Synapses from the cell; partner is the target.
    Outgoing,
}

impl Direction {
    /// Both directions, incoming first.
    pub const ALL: [Direction; 2] = [Direction::Incoming, Direction::Outgoing];

    /// Short label used in geometry names.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Incoming => "in",
            Direction::Outgoing => "out",
        }
    }

    /// The endpoint of `edge` that is the queried cell.
    #[inline]
    pub fn own_endpoint(self, edge: &SynapseEdge) -> CellId {
        match self {
            Direction::Incoming => edge.target,
            Direction::Outgoing => edge.source,
        }
    }

    /// The endpoint of `edge` that is the partner cell.
    #[inline]
    pub fn other_endpoint(self, edge: &SynapseEdge) -> CellId {
        match self {
            Direction::Incoming => edge.source,
            Direction::Outgoing => edge.target,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Direction selector for neighbor queries.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NeighborDirection {
    /// Presynaptic partners only.
    Incoming,
    /// Postsynaptic partners only.
    Outgoing,
    /// Partners in either direction.
    Both,
}

impl NeighborDirection {
    /// The subgraph directions this selector covers.
    pub fn directions(self) -> &'static [Direction] {
        match self {
            NeighborDirection::Incoming => &[Direction::Incoming],
            NeighborDirection::Outgoing => &[Direction::Outgoing],
            NeighborDirection::Both => &Direction::ALL,
        }
    }
}

impl From<Direction> for NeighborDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Incoming => NeighborDirection::Incoming,
            Direction::Outgoing => NeighborDirection::Outgoing,
        }
    }
}

/// Partner-type filter for neighbor queries.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeFilter {
    /// Smooth and spiny partners.
    All,
    /// Smooth (inhibitory) partners only.
    SmoothOnly,
    /// Spiny (excitatory) partners only.
    SpinyOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_type_codes() {
        assert_eq!(CellType::from_code("E"), Some(CellType::Excitatory));
        assert_eq!(CellType::from_code(" i "), Some(CellType::Inhibitory));
        assert_eq!(CellType::from_code("?"), Some(CellType::Unknown));
        assert_eq!(CellType::from_code("  "), None);
        assert!(CellType::Inhibitory.is_smooth());
        assert!(CellType::Excitatory.is_spiny());
        assert!(!CellType::Unknown.is_smooth() && !CellType::Unknown.is_spiny());
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let records = vec![
            CellRecord::new(1, CellType::Excitatory),
            CellRecord::new(2, CellType::Inhibitory),
            CellRecord::new(1, CellType::Inhibitory),
        ];
        match CellRegistry::from_records(records) {
            Err(SynMeshError::DataFormat { table, row, .. }) => {
                assert_eq!(table, "registry");
                assert_eq!(row, 3);
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_direction_endpoints() {
        let edge = SynapseEdge::at(1, 2, Point3::origin());
        assert_eq!(Direction::Incoming.own_endpoint(&edge), CellId(2));
        assert_eq!(Direction::Incoming.other_endpoint(&edge), CellId(1));
        assert_eq!(Direction::Outgoing.own_endpoint(&edge), CellId(1));
        assert_eq!(Direction::Outgoing.other_endpoint(&edge), CellId(2));
    }
}
