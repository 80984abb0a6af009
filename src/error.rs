//! Error types for synmesh.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

use crate::graph::CellId;

/// Result type alias using [`SynMeshError`].
pub type Result<T> = std::result::Result<T, SynMeshError>;

/// Errors that can occur while loading tables or deriving geometry.
#[derive(Error, Debug)]
pub enum SynMeshError {
    /// A table is malformed: missing column, unparsable value, duplicate id
    /// or an edge referencing an unregistered cell.
    #[error("{table} table, row {row}: {message}")]
    DataFormat {
        /// Which table the problem was found in.
        table: &'static str,
        /// 1-based data row (0 for header problems).
        row: usize,
        /// Description of the problem.
        message: String,
    },

    /// A query referenced a cell id absent from the registry.
    #[error("cell {0} is not in the registry")]
    UnknownCell(CellId),

    /// Non-empty geometry was required but there was nothing to build.
    #[error("no geometry for {context}")]
    EmptyGeometry {
        /// What was being built.
        context: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error loading the configuration file.
    #[error("failed to load config from {path}: {message}")]
    Config {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl SynMeshError {
    /// Create a data format error.
    pub fn data_format(table: &'static str, row: usize, message: impl Into<String>) -> Self {
        SynMeshError::DataFormat {
            table,
            row,
            message: message.into(),
        }
    }

    /// Create an empty geometry error.
    pub fn empty_geometry(context: impl Into<String>) -> Self {
        SynMeshError::EmptyGeometry {
            context: context.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        SynMeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
