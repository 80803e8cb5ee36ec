//! Output generation for reconciliation runs.
//!
//! A run that passes the load gate is written as:
//! - `<stem>_<label>.csv`: one delimited file per partition
//! - `<stem>_catalogue.parquet` and `<stem>_catalogue.csv`: the variable catalogue
//! - `<stem>_gaps.json`: the gap report, including acknowledged gaps
//! - `manifest.json`: every file above with row range, size and SHA-256

mod checksum;
mod error;
mod frame;
mod manifest;
mod writer;

// === Error Types ===
pub use error::{OutputError, Result};

// === Writers ===
pub use writer::{OutputOptions, write_outputs, write_outputs_with_progress};

// === Frames ===
pub use frame::{catalogue_to_frame, rows_to_frame};

// === Manifest ===
pub use checksum::compute_file_sha256;
pub use manifest::{ChecksumMismatch, MANIFEST_FILE, Manifest, ManifestEntry, OutputKind};
