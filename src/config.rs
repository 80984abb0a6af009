//! Configuration file loading.
//!
//! Settings come from a TOML file (`synmesh.toml`). Every section is
//! optional and falls back to its defaults:
//!
//! ```toml
//! [calibration]
//! shift = [0.10245, 0.07687, 0.0]
//! scale_xy = 4.0
//! scale_z = 40.0
//! base_scale = 0.00001
//!
//! [tables]
//! graph = "edges.csv"
//! registry = "cells.csv"
//!
//! [columns.graph]
//! source = "segs_1"
//! target = "segs_2"
//!
//! [columns.registry]
//! cell_id = "cell_id"
//! cell_type = "cell_type"
//!
//! [load]
//! unregistered = "reject"   # or "treat_as_unknown"
//! ```
//!
//! Relative table paths are resolved against the directory of the config
//! file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynMeshError};
use crate::graph::load::{read_graph_path, read_registry_path, GraphColumns, RegistryColumns};
use crate::graph::{GraphIndex, LoadOptions, UnregisteredPolicy};
use crate::mapper::{Calibration, CoordinateMapper};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SYNMESH_CONFIG";

/// Default config file name.
pub const CONFIG_FILE: &str = "synmesh.toml";

/// Input table locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePaths {
    /// Synapse edge list.
    pub graph: Option<PathBuf>,
    /// Cell registry.
    pub registry: Option<PathBuf>,
}

/// Column mappings of both tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    /// Graph table columns.
    pub graph: GraphColumns,
    /// Registry table columns.
    pub registry: RegistryColumns,
}

/// Load behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSection {
    /// Handling of edges that reference unregistered cells.
    pub unregistered: UnregisteredPolicy,
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynMeshConfig {
    /// Graph-space to mesh-space calibration.
    pub calibration: Calibration,
    /// Input tables.
    pub tables: TablePaths,
    /// Table column names.
    pub columns: Columns,
    /// Load behavior.
    pub load: LoadSection,
}

impl SynMeshConfig {
    /// Parse a configuration from TOML text.
    ///
    /// `path` is only used in error messages.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        let config: SynMeshConfig = toml::from_str(content).map_err(|e| SynMeshError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config
            .calibration
            .validate()
            .map_err(|e| SynMeshError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(config)
    }

    /// Load a configuration file, resolving relative table paths against
    /// its directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content, path)?;

        if let Some(base) = path.parent() {
            config.tables.graph = config.tables.graph.map(|p| resolve(base, p));
            config.tables.registry = config.tables.registry.map(|p| resolve(base, p));
        }

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the config file named by `SYNMESH_CONFIG` or found in the
    /// working directory; defaults if there is none.
    pub fn discover() -> Result<Self> {
        match find_config_file()? {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Mapper for the configured calibration.
    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.calibration)
    }

    /// Load options for the configured policy.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::default().with_unregistered(self.load.unregistered)
    }

    /// Read both tables and build the index.
    pub fn open_index(&self) -> Result<GraphIndex> {
        let graph_path = self
            .tables
            .graph
            .as_ref()
            .ok_or_else(|| SynMeshError::invalid_param("tables.graph", "(unset)", "no graph table"))?;
        let registry_path = self.tables.registry.as_ref().ok_or_else(|| {
            SynMeshError::invalid_param("tables.registry", "(unset)", "no registry table")
        })?;

        log::info!(
            "Loading graph {} and registry {}",
            graph_path.display(),
            registry_path.display()
        );
        let edges = read_graph_path(graph_path, &self.columns.graph)?;
        let cells = read_registry_path(registry_path, &self.columns.registry)?;
        GraphIndex::load_with(edges, cells, self.load_options())
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}

/// Find the config file.
///
/// Search order:
/// 1. `SYNMESH_CONFIG` environment variable (must exist if set)
/// 2. `./synmesh.toml`
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(SynMeshError::Config {
            path,
            message: format!("file named by {} not found", CONFIG_ENV),
        });
    }

    let local = env::current_dir()?.join(CONFIG_FILE);
    Ok(local.exists().then_some(local))
}
