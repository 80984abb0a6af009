//! CSV ingest for the synapse graph and the cell registry.
//!
//! Both tables are delimited text with a header row. Columns are located by
//! name through [`GraphColumns`] and [`RegistryColumns`]; the defaults match
//! the published edge list (`segs_*`, `locs_*`, `bboxes_*`) and cell list
//! (`cell_id`, `cell_type`). Columns not named in the mapping are ignored.
//!
//! ```no_run
//! use synmesh::graph::load::{read_graph_path, read_registry_path, GraphColumns, RegistryColumns};
//! use synmesh::graph::GraphIndex;
//!
//! let edges = read_graph_path("edges.csv", &GraphColumns::default()).unwrap();
//! let cells = read_registry_path("cells.csv", &RegistryColumns::default()).unwrap();
//! let index = GraphIndex::load(edges, cells).unwrap();
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::types::{CellId, CellRecord, CellType, SynapseEdge};
use crate::error::{Result, SynMeshError};

const GRAPH: &str = "graph";
const REGISTRY: &str = "registry";

/// Column names of the graph table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphColumns {
    /// Presynaptic cell id.
    pub source: String,
    /// Postsynaptic cell id.
    pub target: String,
    /// Synapse location, x y z.
    pub location: [String; 3],
    /// First bounding-box corner, x y z.
    pub bbox_min: [String; 3],
    /// Second bounding-box corner, x y z.
    pub bbox_max: [String; 3],
}

impl Default for GraphColumns {
    fn default() -> Self {
        Self {
            source: "segs_1".to_string(),
            target: "segs_2".to_string(),
            location: numbered("locs_", 1),
            bbox_min: numbered("bboxes_", 1),
            bbox_max: numbered("bboxes_", 4),
        }
    }
}

/// Column names of the registry table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryColumns {
    /// Cell id.
    pub cell_id: String,
    /// Cell type code (`E`, `I`, anything else is unknown).
    pub cell_type: String,
}

impl Default for RegistryColumns {
    fn default() -> Self {
        Self {
            cell_id: "cell_id".to_string(),
            cell_type: "cell_type".to_string(),
        }
    }
}

fn numbered(prefix: &str, first: usize) -> [String; 3] {
    [0, 1, 2].map(|i| format!("{}{}", prefix, first + i))
}

/// Resolves column names to positions once per table.
struct Header {
    table: &'static str,
    names: csv::StringRecord,
}

impl Header {
    fn position(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| {
                SynMeshError::data_format(self.table, 0, format!("missing column '{}'", name))
            })
    }

    fn positions(&self, names: &[String; 3]) -> Result<[usize; 3]> {
        Ok([
            self.position(&names[0])?,
            self.position(&names[1])?,
            self.position(&names[2])?,
        ])
    }
}

/// A data row with its 1-based number, for error reporting.
struct Row<'a> {
    table: &'static str,
    number: usize,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn field(&self, col: usize) -> Result<&str> {
        self.record.get(col).map(str::trim).ok_or_else(|| {
            SynMeshError::data_format(
                self.table,
                self.number,
                format!("row has {} fields, column {} is missing", self.record.len(), col + 1),
            )
        })
    }

    fn float(&self, col: usize) -> Result<f64> {
        let raw = self.field(col)?;
        raw.parse::<f64>().map_err(|_| {
            SynMeshError::data_format(self.table, self.number, format!("'{}' is not a number", raw))
        })
    }

    fn point(&self, cols: [usize; 3]) -> Result<Point3<f64>> {
        Ok(Point3::new(
            self.float(cols[0])?,
            self.float(cols[1])?,
            self.float(cols[2])?,
        ))
    }

    /// Parse a cell id. Integral floats such as `12.0` are accepted since
    /// dataframe exports write ids that way.
    fn cell_id(&self, col: usize) -> Result<CellId> {
        let raw = self.field(col)?;
        parse_cell_id(raw).map(CellId).ok_or_else(|| {
            SynMeshError::data_format(
                self.table,
                self.number,
                format!("'{}' is not a cell id", raw),
            )
        })
    }
}

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Parse an id written as an integer, as `NNN.000`, or as a float that is
/// exactly integral. Ids beyond 2^53 must use one of the first two forms.
fn parse_cell_id(raw: &str) -> Option<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    if let Some((int, frac)) = raw.split_once('.') {
        if !frac.is_empty() && frac.bytes().all(|b| b == b'0') {
            return int.parse::<u64>().ok();
        }
    }
    match raw.parse::<f64>() {
        Ok(v) if (0.0..=MAX_EXACT_FLOAT).contains(&v) && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source)
}

/// Read graph edges from CSV text.
pub fn read_graph<R: Read>(source: R, columns: &GraphColumns) -> Result<Vec<SynapseEdge>> {
    let mut reader = reader(source);
    let header = Header {
        table: GRAPH,
        names: reader.headers()?.clone(),
    };

    let source_col = header.position(&columns.source)?;
    let target_col = header.position(&columns.target)?;
    let location_cols = header.positions(&columns.location)?;
    let min_cols = header.positions(&columns.bbox_min)?;
    let max_cols = header.positions(&columns.bbox_max)?;

    let mut edges = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = Row {
            table: GRAPH,
            number: i + 1,
            record: &record,
        };
        edges.push(SynapseEdge {
            source: row.cell_id(source_col)?,
            target: row.cell_id(target_col)?,
            location: row.point(location_cols)?,
            bbox_min: row.point(min_cols)?,
            bbox_max: row.point(max_cols)?,
        });
    }

    log::debug!("Read {} graph rows", edges.len());
    Ok(edges)
}

/// Read registry records from CSV text.
pub fn read_registry<R: Read>(source: R, columns: &RegistryColumns) -> Result<Vec<CellRecord>> {
    let mut reader = reader(source);
    let header = Header {
        table: REGISTRY,
        names: reader.headers()?.clone(),
    };

    let id_col = header.position(&columns.cell_id)?;
    let type_col = header.position(&columns.cell_type)?;

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = Row {
            table: REGISTRY,
            number: i + 1,
            record: &record,
        };
        let code = row.field(type_col)?;
        let cell_type = CellType::from_code(code).ok_or_else(|| {
            SynMeshError::data_format(REGISTRY, row.number, "empty cell type code")
        })?;
        records.push(CellRecord {
            cell_id: row.cell_id(id_col)?,
            cell_type,
        });
    }

    log::debug!("Read {} registry rows", records.len());
    Ok(records)
}

/// Read graph edges from a CSV file.
pub fn read_graph_path<P: AsRef<Path>>(path: P, columns: &GraphColumns) -> Result<Vec<SynapseEdge>> {
    read_graph(File::open(path)?, columns)
}

/// Read registry records from a CSV file.
pub fn read_registry_path<P: AsRef<Path>>(
    path: P,
    columns: &RegistryColumns,
) -> Result<Vec<CellRecord>> {
    read_registry(File::open(path)?, columns)
}
