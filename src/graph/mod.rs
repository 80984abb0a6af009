//! Connectivity graph and cell registry.
//!
//! [`GraphIndex`] owns the synapse edges and the registry for the lifetime of
//! a session and answers directional queries:
//!
//! - [`GraphIndex::subgraph`] splits the edges onto or from a cell by the type
//!   of the partner cell into `all`, `smooth` (inhibitory partners) and
//!   `spiny` (excitatory partners)
//! - [`GraphIndex::neighbors`] collects partner cell ids
//! - [`GraphIndex::cell_type`] resolves registry entries
//!
//! Tables are read from CSV by the [`load`] module.

pub mod load;

mod index;
mod types;

pub use index::{GraphIndex, LoadOptions, Subgraph, TypeCounts, UnregisteredPolicy};
pub use types::{
    CellId, CellRecord, CellRegistry, CellType, Direction, NeighborDirection, SynapseEdge,
    TypeFilter,
};
