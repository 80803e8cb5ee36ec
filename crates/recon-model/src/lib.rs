//! Data model shared by the reconciliation crates.
//!
//! - [`Table`]: raw tabular input, one value per column per row
//! - [`MergedTable`] / [`MergedRow`]: primary rows extended by lookup joins, with
//!   per-row [`Provenance`]
//! - [`VariableRecord`] / [`VariableCatalogue`]: declared variables and the
//!   columns they resolve to

#![deny(unsafe_code)]

pub mod catalogue;
pub mod error;
pub mod merged;
pub mod table;
pub mod value;

pub use catalogue::{Category, Resolution, VariableCatalogue, VariableRecord};
pub use error::{ModelError, Result};
pub use merged::{LookupProvenance, MergedRow, MergedTable, Provenance, rendered_cell_len};
pub use table::{Row, Table};
pub use value::{CellValue, ValueKind, format_numeric};
