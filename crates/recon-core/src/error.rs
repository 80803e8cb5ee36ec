//! Error types for the reconciliation engine.

use recon_model::{ModelError, ValueKind};
use thiserror::Error;

/// Errors raised while configuring the fuzzy matcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Threshold outside `(0, 1]`.
    #[error("match threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Errors raised while building the variable catalogue from metadata sheets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    /// A column the category rule relies on is absent from the sheet.
    #[error("metadata sheet '{sheet}' has no column '{column}'")]
    MissingColumn { sheet: String, column: String },

    /// A forward-filled field starts with a missing value, so there is nothing to inherit.
    #[error("field '{column}' in sheet '{sheet}' starts with a missing value and cannot be forward-filled")]
    ForwardFillLeadingNull { sheet: String, column: String },

    /// The sheet has fewer rows than the rule skips.
    #[error("sheet '{sheet}' has {rows} rows but the rule skips {skip}")]
    SkipRowsExceedSheet { sheet: String, rows: usize, skip: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors raised by the dataset merger, yearly stacking and the sort stage.
///
/// All of these are fail-fast: when one is returned no output table exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    // === Keys ===
    /// Join key absent from one side.
    #[error("join key '{key}' missing from table '{table}'")]
    MissingJoinKey { table: String, key: String },

    /// The key column holds different value kinds on each side.
    #[error("join key '{key}' is {primary} in the primary table but {lookup} in lookup '{lookup_name}'")]
    KeyTypeMismatch {
        key: String,
        lookup_name: String,
        primary: ValueKind,
        lookup: ValueKind,
    },

    /// A key column mixes incompatible kinds within one table.
    #[error("join key '{key}' in table '{table}' mixes value kinds {kinds:?}")]
    MixedKeyKinds {
        table: String,
        key: String,
        kinds: Vec<ValueKind>,
    },

    /// The same key tuple appears more than once in a one-to-one lookup.
    #[error("duplicate join key {key:?} in lookup '{lookup}' (rows {first_row} and {duplicate_row})")]
    DuplicateJoinKey {
        lookup: String,
        key: Vec<String>,
        first_row: usize,
        duplicate_row: usize,
    },

    /// A join declared no key columns.
    #[error("join with lookup '{lookup}' declares no key columns")]
    EmptyJoinKeys { lookup: String },

    // === Schema ===
    /// Yearly editions disagree on their column sets.
    #[error("edition {year} of '{table}' does not match the first edition: missing {missing:?}, extra {extra:?}")]
    SchemaMismatch {
        table: String,
        year: i64,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Nothing to stack.
    #[error("no yearly editions supplied")]
    NoEditions,

    // === Ordering ===
    /// Two rows share the same sort-key tuple where a total order was required.
    #[error("rows {first} and {second} share the sort key {key:?}")]
    AmbiguousSortOrder {
        first: usize,
        second: usize,
        key: Vec<String>,
    },

    /// The repair hook rejected a row.
    #[error("repair of row {row} failed: {message}")]
    Repair { row: usize, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors raised by the chunked partitioner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("max_rows_per_chunk must be greater than zero")]
    InvalidChunkSize,

    /// A partition's estimated size is above the hosting ceiling. Not auto-corrected.
    #[error("partition {number} ({label}) is {size_bytes} bytes, above the {ceiling_bytes}-byte ceiling")]
    PartitionSizeExceeded {
        number: usize,
        label: String,
        size_bytes: u64,
        ceiling_bytes: u64,
    },
}

/// Errors raised while loading or validating [`ReconcileConfig`](crate::ReconcileConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Unified error for a pipeline run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A source the configuration names was not supplied.
    #[error("no table supplied for source '{0}'")]
    MissingSource(String),

    /// Outputs may not be written yet.
    #[error("load blocked: {gaps} unacknowledged reconciliation gap(s), {oversized} oversized partition(s)")]
    LoadBlocked { gaps: usize, oversized: usize },
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
