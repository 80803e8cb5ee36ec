//! Dataset reconciliation engine.
//!
//! Normalizes column names, assembles a variable catalogue from metadata
//! sheets, merges the primary dataset with its lookups, resolves declared
//! variables onto merged columns and partitions the result. Everything here
//! works on in-memory tables; reading and writing files is left to the
//! ingest and output crates.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod metadata;
pub mod normalize;
pub mod partition;
pub mod pipeline;
pub mod reconcile;

pub use config::{OutputConfig, ReconcileConfig, SourceConfig, Sources};
pub use error::{
    AssemblyError, ConfigError, MatchError, MergeError, PartitionError, ReconcileError, Result,
};
pub use matcher::{
    DEFAULT_THRESHOLD, FuzzyMatcher, MatchOutcome, NameScore, OverrideTable, calibrate,
    default_holdout,
};
pub use merge::{
    Cardinality, JoinHow, JoinSpec, NoRepair, RowRepair, apply_repair, merge, merge_all,
    sort_by_keys, stack_years,
};
pub use metadata::{Assembly, CategoryRule, DuplicateDeclaration, assemble_catalogue};
pub use normalize::{normalize, normalize_table_columns, tokens};
pub use partition::{
    DEFAULT_MAX_ROWS_PER_CHUNK, DEFAULT_SIZE_CEILING_BYTES, Partition, SizedRow, check_ceiling,
    file_name, partition, suggest_max_rows,
};
pub use pipeline::{Edition, PartitionSummary, PipelineInputs, PipelineRun, run_pipeline};
pub use reconcile::{Gap, GapKind, GapPolicy, GapReport, Resolved, find_gaps, resolve_catalogue};
