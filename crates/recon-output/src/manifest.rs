//! Run manifest listing every written file with its checksum.

use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checksum::compute_file_sha256;
use crate::error::{OutputError, Result};

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// What an output file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Partition,
    Catalogue,
    GapReport,
}

/// One written file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the output directory.
    pub file: String,
    pub kind: OutputKind,
    /// Partition label, for partition files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Merged-table rows held by the file, for partition files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Range<usize>>,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
    pub dataset: String,
    pub total_rows: usize,
    pub columns: Vec<String>,
    /// Gaps that were present and acknowledged when the outputs were written.
    pub acknowledged_gaps: usize,
    pub files: Vec<ManifestEntry>,
}

/// A file whose current checksum differs from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub file: String,
    pub expected: String,
    pub actual: String,
}

impl Manifest {
    pub fn partitions(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.files.iter().filter(|f| f.kind == OutputKind::Partition)
    }

    /// Reads `manifest.json` from an output directory.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(MANIFEST_FILE);
        let file = File::open(&path).map_err(|source| OutputError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| OutputError::Json { path, source })
    }

    /// Recomputes every listed checksum.
    pub fn verify(&self, directory: &Path) -> Result<Vec<ChecksumMismatch>> {
        let mut mismatches = Vec::new();
        for entry in &self.files {
            let actual = compute_file_sha256(&directory.join(&entry.file))?;
            if actual != entry.sha256 {
                mismatches.push(ChecksumMismatch {
                    file: entry.file.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
        }
        Ok(mismatches)
    }
}
