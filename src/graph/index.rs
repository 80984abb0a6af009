//! In-memory connectivity graph with directional, type-stratified queries.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::types::{
    CellId, CellRecord, CellRegistry, CellType, Direction, NeighborDirection, SynapseEdge,
    TypeFilter,
};
use crate::error::{Result, SynMeshError};

/// What to do with edges whose endpoints are missing from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnregisteredPolicy {
    /// Fail the load with a data format error.
    #[default]
    Reject,
    /// Keep the edge. The unregistered partner partitions as
    /// [`CellType::Unknown`], so the edge appears only in `all`.
    TreatAsUnknown,
}

/// Options for [`GraphIndex::load_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Handling of unregistered endpoints.
    pub unregistered: UnregisteredPolicy,
}

impl LoadOptions {
    /// Set the unregistered endpoint policy.
    pub fn with_unregistered(mut self, policy: UnregisteredPolicy) -> Self {
        self.unregistered = policy;
        self
    }
}

/// The edges touching one cell in one direction, split by partner type.
///
/// `smooth` and `spiny` are disjoint subsequences of `all` in the same
/// relative order. Partners of unknown type are only in `all`.
#[derive(Debug, Clone, Default)]
pub struct Subgraph<'a> {
    /// Every edge in the direction, in storage order.
    pub all: Vec<&'a SynapseEdge>,
    /// Edges whose partner is inhibitory.
    pub smooth: Vec<&'a SynapseEdge>,
    /// Edges whose partner is excitatory.
    pub spiny: Vec<&'a SynapseEdge>,
}

impl Subgraph<'_> {
    /// `(total, smooth, spiny)` edge counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.all.len(), self.smooth.len(), self.spiny.len())
    }

    /// Whether there are no edges at all.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Registry composition by cell type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    /// Excitatory cells.
    pub excitatory: usize,
    /// Inhibitory cells.
    pub inhibitory: usize,
    /// Cells of unknown type.
    pub unknown: usize,
}

/// Connectivity graph plus cell registry, immutable after load.
///
/// Edges are kept in input order. Per-cell incoming and outgoing position
/// lists are built once so queries do not scan the whole graph.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    edges: Vec<SynapseEdge>,
    registry: CellRegistry,
    incoming: HashMap<CellId, Vec<usize>>,
    outgoing: HashMap<CellId, Vec<usize>>,
}

impl GraphIndex {
    /// Build an index, rejecting edges with unregistered endpoints.
    ///
    /// # Example
    ///
    /// ```
    /// use synmesh::graph::{CellRecord, CellType, Direction, GraphIndex, SynapseEdge};
    /// use nalgebra::Point3;
    ///
    /// let edges = vec![SynapseEdge::at(1, 2, Point3::new(0.0, 0.0, 0.0))];
    /// let cells = vec![
    ///     CellRecord::new(1, CellType::Excitatory),
    ///     CellRecord::new(2, CellType::Inhibitory),
    /// ];
    /// let index = GraphIndex::load(edges, cells).unwrap();
    ///
    /// let sub = index.subgraph(2.into(), Direction::Incoming);
    /// assert_eq!(sub.counts(), (1, 0, 1));
    /// ```
    pub fn load<E, R>(graph_rows: E, registry_rows: R) -> Result<Self>
    where
        E: IntoIterator<Item = SynapseEdge>,
        R: IntoIterator<Item = CellRecord>,
    {
        Self::load_with(graph_rows, registry_rows, LoadOptions::default())
    }

    /// Build an index with explicit load options.
    pub fn load_with<E, R>(graph_rows: E, registry_rows: R, options: LoadOptions) -> Result<Self>
    where
        E: IntoIterator<Item = SynapseEdge>,
        R: IntoIterator<Item = CellRecord>,
    {
        let registry = CellRegistry::from_records(registry_rows)?;
        let edges: Vec<SynapseEdge> = graph_rows.into_iter().collect();

        let mut unregistered = 0usize;
        for (i, edge) in edges.iter().enumerate() {
            for cell in [edge.source, edge.target] {
                if registry.contains(cell) {
                    continue;
                }
                match options.unregistered {
                    UnregisteredPolicy::Reject => {
                        return Err(SynMeshError::data_format(
                            "graph",
                            i + 1,
                            format!("cell {} has no registry entry", cell),
                        ));
                    }
                    UnregisteredPolicy::TreatAsUnknown => unregistered += 1,
                }
            }
        }
        if unregistered > 0 {
            log::warn!(
                "{} edge endpoints reference unregistered cells; treating them as unknown",
                unregistered
            );
        }

        let mut incoming: HashMap<CellId, Vec<usize>> = HashMap::new();
        let mut outgoing: HashMap<CellId, Vec<usize>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            incoming.entry(edge.target).or_default().push(i);
            outgoing.entry(edge.source).or_default().push(i);
        }

        log::info!(
            "Indexed {} synapses between {} registered cells",
            edges.len(),
            registry.len()
        );

        Ok(Self {
            edges,
            registry,
            incoming,
            outgoing,
        })
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// All edges in storage order.
    pub fn edges(&self) -> &[SynapseEdge] {
        &self.edges
    }

    /// The cell registry.
    pub fn registry(&self) -> &CellRegistry {
        &self.registry
    }

    /// Registered cell ids, ascending.
    pub fn cells(&self) -> Vec<CellId> {
        let mut ids: Vec<CellId> = self.registry.iter().map(|r| r.cell_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Count registered cells by type.
    pub fn type_counts(&self) -> TypeCounts {
        let mut counts = TypeCounts::default();
        for record in self.registry.iter() {
            match record.cell_type {
                CellType::Excitatory => counts.excitatory += 1,
                CellType::Inhibitory => counts.inhibitory += 1,
                CellType::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    /// Type of a registered cell.
    pub fn cell_type(&self, cell_id: CellId) -> Result<CellType> {
        self.registry
            .get(cell_id)
            .map(|r| r.cell_type)
            .ok_or(SynMeshError::UnknownCell(cell_id))
    }

    /// Type used for partitioning: unregistered cells count as unknown.
    fn partner_type(&self, cell_id: CellId) -> CellType {
        self.registry
            .get(cell_id)
            .map_or(CellType::Unknown, |r| r.cell_type)
    }

    /// Edges touching `cell_id` in `direction`, split by partner type.
    ///
    /// A cell with no edges yields three empty sequences.
    pub fn subgraph(&self, cell_id: CellId, direction: Direction) -> Subgraph<'_> {
        let positions = match direction {
            Direction::Incoming => self.incoming.get(&cell_id),
            Direction::Outgoing => self.outgoing.get(&cell_id),
        };

        let mut sub = Subgraph::default();
        for &i in positions.map(Vec::as_slice).unwrap_or(&[]) {
            let edge = &self.edges[i];
            sub.all.push(edge);
            match self.partner_type(direction.other_endpoint(edge)) {
                CellType::Inhibitory => sub.smooth.push(edge),
                CellType::Excitatory => sub.spiny.push(edge),
                CellType::Unknown => {}
            }
        }

        log::debug!(
            "subgraph({}, {}): {} edges ({} smooth, {} spiny)",
            cell_id,
            direction,
            sub.all.len(),
            sub.smooth.len(),
            sub.spiny.len()
        );
        sub
    }

    /// Partner cells of `cell_id`, deduplicated and ascending.
    ///
    /// Only smooth and spiny partners count; `TypeFilter::All` is their union.
    pub fn neighbors(
        &self,
        cell_id: CellId,
        direction: NeighborDirection,
        filter: TypeFilter,
    ) -> BTreeSet<CellId> {
        let (smooth, spiny) = match filter {
            TypeFilter::All => (true, true),
            TypeFilter::SmoothOnly => (true, false),
            TypeFilter::SpinyOnly => (false, true),
        };

        let mut out = BTreeSet::new();
        for &d in direction.directions() {
            let sub = self.subgraph(cell_id, d);
            if smooth {
                out.extend(sub.smooth.iter().map(|e| d.other_endpoint(e)));
            }
            if spiny {
                out.extend(sub.spiny.iter().map(|e| d.other_endpoint(e)));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn edge(source: u64, target: u64, x: f64) -> SynapseEdge {
        SynapseEdge::at(source, target, Point3::new(x, 0.0, 0.0))
    }

    // 1, 3 excitatory; 2, 4 inhibitory; 5 unknown type.
    fn sample_index() -> GraphIndex {
        let edges = vec![
            edge(1, 2, 0.0),
            edge(3, 2, 1.0),
            edge(4, 2, 2.0),
            edge(2, 1, 3.0),
            edge(2, 4, 4.0),
            edge(5, 2, 5.0),
            edge(1, 2, 6.0),
            edge(2, 3, 7.0),
        ];
        let cells = vec![
            CellRecord::new(1, CellType::Excitatory),
            CellRecord::new(2, CellType::Inhibitory),
            CellRecord::new(3, CellType::Excitatory),
            CellRecord::new(4, CellType::Inhibitory),
            CellRecord::new(5, CellType::Unknown),
        ];
        GraphIndex::load(edges, cells).unwrap()
    }

    fn xs(edges: &[&SynapseEdge]) -> Vec<f64> {
        edges.iter().map(|e| e.location.x).collect()
    }

    #[test]
    fn test_incoming_subgraph() {
        let index = sample_index();
        let sub = index.subgraph(CellId(2), Direction::Incoming);

        assert_eq!(xs(&sub.all), vec![0.0, 1.0, 2.0, 5.0, 6.0]);
        assert_eq!(xs(&sub.smooth), vec![2.0]);
        assert_eq!(xs(&sub.spiny), vec![0.0, 1.0, 6.0]);
        for e in &sub.all {
            assert_eq!(e.target, CellId(2));
        }
    }

    #[test]
    fn test_outgoing_subgraph() {
        let index = sample_index();
        let sub = index.subgraph(CellId(2), Direction::Outgoing);

        assert_eq!(xs(&sub.all), vec![3.0, 4.0, 7.0]);
        assert_eq!(xs(&sub.smooth), vec![4.0]);
        assert_eq!(xs(&sub.spiny), vec![3.0, 7.0]);
        for e in &sub.all {
            assert_eq!(e.source, CellId(2));
        }
    }

    #[test]
    fn test_partition_complete_without_unknown() {
        let index = sample_index();
        for cell in index.cells() {
            for d in Direction::ALL {
                let sub = index.subgraph(cell, d);
                let has_unknown = sub
                    .all
                    .iter()
                    .any(|e| index.cell_type(d.other_endpoint(e)).unwrap() == CellType::Unknown);
                if !has_unknown {
                    assert_eq!(sub.all.len(), sub.smooth.len() + sub.spiny.len());
                }
            }
        }
    }

    #[test]
    fn test_subgraph_of_isolated_cell_is_empty() {
        let index = sample_index();
        let sub = index.subgraph(CellId(42), Direction::Incoming);
        assert!(sub.is_empty());
        assert_eq!(sub.counts(), (0, 0, 0));
    }

    #[test]
    fn test_cell_type() {
        let index = sample_index();
        assert_eq!(index.cell_type(CellId(1)).unwrap(), CellType::Excitatory);
        assert!(matches!(
            index.cell_type(CellId(999)),
            Err(SynMeshError::UnknownCell(CellId(999)))
        ));
    }

    #[test]
    fn test_neighbors() {
        let index = sample_index();
        let c = |ids: &[u64]| ids.iter().map(|&i| CellId(i)).collect::<BTreeSet<_>>();

        // 5 is of unknown type and never a neighbor; 1 appears twice incoming.
        assert_eq!(
            index.neighbors(CellId(2), NeighborDirection::Incoming, TypeFilter::All),
            c(&[1, 3, 4])
        );
        assert_eq!(
            index.neighbors(CellId(2), NeighborDirection::Outgoing, TypeFilter::SpinyOnly),
            c(&[1, 3])
        );
        assert_eq!(
            index.neighbors(CellId(2), NeighborDirection::Incoming, TypeFilter::SmoothOnly),
            c(&[4])
        );
    }

    #[test]
    fn test_neighbors_both_dedups() {
        let index = sample_index();
        let both = index.neighbors(CellId(2), NeighborDirection::Both, TypeFilter::All);
        let ids: Vec<u64> = both.iter().map(|c| c.get()).collect();
        // 1, 3 and 4 are partners in both directions.
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_load_rejects_unregistered() {
        let edges = vec![edge(1, 2, 0.0), edge(1, 9, 1.0)];
        let cells = vec![
            CellRecord::new(1, CellType::Excitatory),
            CellRecord::new(2, CellType::Inhibitory),
        ];
        match GraphIndex::load(edges, cells) {
            Err(SynMeshError::DataFormat { table, row, .. }) => {
                assert_eq!(table, "graph");
                assert_eq!(row, 2);
            }
            other => panic!("expected data format error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_treat_unregistered_as_unknown() {
        let edges = vec![edge(1, 2, 0.0), edge(9, 2, 1.0)];
        let cells = vec![
            CellRecord::new(1, CellType::Excitatory),
            CellRecord::new(2, CellType::Inhibitory),
        ];
        let options = LoadOptions::default().with_unregistered(UnregisteredPolicy::TreatAsUnknown);
        let index = GraphIndex::load_with(edges, cells, options).unwrap();

        let sub = index.subgraph(CellId(2), Direction::Incoming);
        assert_eq!(sub.counts(), (2, 0, 1));
        assert!(index.cell_type(CellId(9)).is_err());
    }

    #[test]
    fn test_type_counts() {
        let index = sample_index();
        assert_eq!(
            index.type_counts(),
            TypeCounts {
                excitatory: 2,
                inhibitory: 2,
                unknown: 1
            }
        );
        assert_eq!(index.len(), 8);
    }

    #[test]
    fn test_index_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GraphIndex>();
    }
}
