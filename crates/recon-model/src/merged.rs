//! Rows produced by the dataset merger.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::table::Table;
use crate::value::CellValue;

/// Outcome of one lookup join for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupProvenance {
    /// Name of the lookup table.
    pub lookup: String,
    /// Whether the row's key matched a lookup row.
    pub matched: bool,
    /// Lookup fields that received a non-missing value.
    pub populated: Vec<String>,
    /// Lookup fields left missing (no match, or missing in the lookup row).
    pub missing: Vec<String>,
}

/// Which lookup fields were populated for a row, one entry per applied join.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub lookups: Vec<LookupProvenance>,
}

impl Provenance {
    pub fn is_fully_matched(&self) -> bool {
        self.lookups.iter().all(|l| l.matched)
    }

    pub fn lookup(&self, name: &str) -> Option<&LookupProvenance> {
        self.lookups.iter().find(|l| l.lookup == name)
    }
}

/// A primary row extended with lookup fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MergedRow {
    /// Position of the source row in the primary table.
    pub source_index: usize,
    pub values: Vec<CellValue>,
    pub provenance: Provenance,
}

impl MergedRow {
    /// Byte size of the row rendered as one delimited line, including separators
    /// and the trailing newline.
    pub fn estimated_bytes(&self) -> u64 {
        let cells: u64 = self
            .values
            .iter()
            .map(|v| rendered_cell_len(&v.render()))
            .sum();
        let separators = self.values.len().saturating_sub(1) as u64;
        cells + separators + 1
    }
}

/// Length of a cell once quoted for delimited output.
pub fn rendered_cell_len(rendered: &str) -> u64 {
    let needs_quotes = rendered.contains([',', '"', '\n', '\r']);
    if needs_quotes {
        let quotes = rendered.matches('"').count() as u64;
        rendered.len() as u64 + quotes + 2
    } else {
        rendered.len() as u64
    }
}

/// The unified table produced by merging a primary table with its lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<MergedRow>,
}

impl MergedTable {
    /// Starts a merge chain from the primary table; every row begins with empty
    /// provenance and its own index as `source_index`.
    pub fn from_primary(primary: &Table) -> Self {
        let rows = primary
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| MergedRow {
                source_index: idx,
                values: row.values.clone(),
                provenance: Provenance::default(),
            })
            .collect();
        Self {
            name: primary.name().to_string(),
            columns: primary.columns().to_vec(),
            rows,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| ModelError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.values.get(idx))
    }

    /// Size of the header line once rendered.
    pub fn header_bytes(&self) -> u64 {
        let cells: u64 = self.columns.iter().map(|c| rendered_cell_len(c)).sum();
        cells + self.columns.len().saturating_sub(1) as u64 + 1
    }

    /// Drops provenance, yielding a plain table with the same columns and rows.
    pub fn to_table(&self) -> Result<Table> {
        Table::from_rows(
            self.name.clone(),
            self.columns.iter().cloned(),
            self.rows.iter().map(|r| r.values.clone()),
        )
    }
}
