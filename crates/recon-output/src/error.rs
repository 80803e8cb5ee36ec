//! Error types for output generation.

use std::path::PathBuf;

use recon_core::{PartitionError, ReconcileError};
use recon_model::ModelError;
use thiserror::Error;

/// Errors that can occur while writing run outputs.
#[derive(Debug, Error)]
pub enum OutputError {
    // === Gate ===
    /// The run still has unacknowledged gaps or oversized partitions.
    #[error(transparent)]
    Blocked(#[from] ReconcileError),

    /// A written partition came out larger than the ceiling.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    // === File System Errors ===
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Encoding Errors ===
    /// Polars failed to build or serialize a frame.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<polars::prelude::PolarsError> for OutputError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;
