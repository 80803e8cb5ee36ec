//! Source ingestion for the reconciliation pipeline.
//!
//! Reads the delimited files a run configuration names into
//! [`recon_model::Table`]s. Files are checked for size and encoding before
//! parsing, header rows may sit below a preamble, and geometry columns are
//! carried as WKT text.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use recon_core::ReconcileConfig;
//! use recon_ingest::load_inputs;
//!
//! let config = ReconcileConfig::load(Path::new("recon.toml"))?;
//! let inputs = load_inputs(&config)?;
//! ```

mod csv;
mod error;
mod frame;
mod sources;

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV Reading ===
pub use csv::{
    CsvHeaders, MAX_CSV_FILE_SIZE, check_file_size, check_file_size_with_limit, read_csv_schema,
    read_csv_table, validate_dataframe_shape, validate_encoding,
};

// === Conversion ===
pub use frame::{any_to_cell, dataframe_to_table};

// === Sources ===
pub use sources::{load_inputs, read_source};
