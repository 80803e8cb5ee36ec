//! In-memory tabular data as handed over by the retrieval layer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::value::{CellValue, ValueKind};

/// One row of a [`Table`]; values are positionally aligned with the table's columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<CellValue>,
}

impl Row {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }
}

/// An ordered sequence of rows with named columns.
///
/// Column names are unique. Every row carries exactly one value per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Result<Self> {
        let name = name.into();
        check_columns(&name, &columns)?;
        Ok(Self {
            name,
            columns,
            rows: Vec::new(),
        })
    }

    /// Builds a table from string-ish columns and rows in one go. Handy in tests
    /// and for small lookup tables.
    pub fn from_rows<C, R>(name: impl Into<String>, columns: C, rows: R) -> Result<Self>
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator<Item = Vec<CellValue>>,
    {
        let mut table = Self::new(name, columns.into_iter().map(Into::into).collect())?;
        for values in rows {
            table.push_row(values)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, values: Vec<CellValue>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(ModelError::RowArity {
                table: self.name.clone(),
                row: self.rows.len(),
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.rows.push(Row::new(values));
        Ok(())
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Index of `column`, or [`ModelError::ColumnNotFound`].
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

    /// Iterates the values of one column in row order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |row| row.values.get(idx))
    }

    /// Kind of the column's non-missing values, if they agree.
    ///
    /// Returns `Ok(None)` for an all-missing column and `Err(kinds)` listing the
    /// conflicting kinds when they cannot be unified.
    pub fn column_kind(&self, idx: usize) -> std::result::Result<Option<ValueKind>, Vec<ValueKind>> {
        let mut seen = BTreeSet::new();
        let mut unified: Option<ValueKind> = None;
        let mut conflict = false;
        for kind in self.column_values(idx).filter_map(CellValue::kind) {
            seen.insert(kind);
            unified = match unified {
                None => Some(kind),
                Some(current) => match current.unify(kind) {
                    Some(next) => Some(next),
                    None => {
                        conflict = true;
                        Some(current)
                    }
                },
            };
        }
        if conflict {
            Err(seen.into_iter().collect())
        } else {
            Ok(unified)
        }
    }

    /// Returns a copy with every column renamed through `rename`.
    ///
    /// Fails if two columns end up with the same name.
    pub fn rename_columns<F>(&self, mut rename: F) -> Result<Table>
    where
        F: FnMut(&str) -> String,
    {
        let columns: Vec<String> = self.columns.iter().map(|c| rename(c)).collect();
        check_columns(&self.name, &columns)?;
        Ok(Self {
            name: self.name.clone(),
            columns,
            rows: self.rows.clone(),
        })
    }

    /// Returns a copy holding only `keep`, in the order given.
    pub fn select(&self, keep: &[String]) -> Result<Table> {
        let indices = keep
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>>>()?;
        let mut out = Table::new(self.name.clone(), keep.to_vec())?;
        for row in &self.rows {
            out.rows.push(Row::new(
                indices.iter().map(|&i| row.values[i].clone()).collect(),
            ));
        }
        Ok(out)
    }

    /// Returns a copy with an extra column filled with `value`.
    pub fn with_constant_column(&self, column: impl Into<String>, value: &CellValue) -> Result<Table> {
        let mut columns = self.columns.clone();
        columns.push(column.into());
        check_columns(&self.name, &columns)?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut values = row.values.clone();
                values.push(value.clone());
                Row::new(values)
            })
            .collect();
        Ok(Self {
            name: self.name.clone(),
            columns,
            rows,
        })
    }

    /// Mutable access to the rows, for stages that rewrite cells in place on
    /// their own copy.
    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    /// Appends all rows of `other`. Column lists must be identical.
    pub fn append(&mut self, other: Table) -> Result<()> {
        if other.columns != self.columns {
            let missing = self
                .columns
                .iter()
                .find(|c| !other.columns.contains(c))
                .or_else(|| other.columns.iter().find(|c| !self.columns.contains(c)))
                .cloned()
                .unwrap_or_default();
            return Err(ModelError::ColumnNotFound {
                table: other.name,
                column: missing,
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

fn check_columns(table: &str, columns: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for column in columns {
        if column.trim().is_empty() {
            return Err(ModelError::EmptyColumnName {
                table: table.to_string(),
            });
        }
        if !seen.insert(column.as_str()) {
            return Err(ModelError::DuplicateColumn {
                table: table.to_string(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}
