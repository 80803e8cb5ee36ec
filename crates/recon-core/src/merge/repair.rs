//! Row-level repair hook run after merging.
//!
//! Geometry fixes (closing rings, dropping degenerate shapes) live with the
//! caller; the merger only hands each row over once.

use recon_model::{MergedRow, MergedTable};

use crate::error::MergeError;

/// Rewrites one merged row in place.
///
/// `columns` is the merged header, so implementations can locate the fields
/// they care about. Returning an error aborts the whole stage.
pub trait RowRepair {
    fn repair(&self, columns: &[String], row: &mut MergedRow) -> Result<(), String>;
}

/// Leaves every row untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepair;

impl RowRepair for NoRepair {
    fn repair(&self, _columns: &[String], _row: &mut MergedRow) -> Result<(), String> {
        Ok(())
    }
}

impl<F> RowRepair for F
where
    F: Fn(&[String], &mut MergedRow) -> Result<(), String>,
{
    fn repair(&self, columns: &[String], row: &mut MergedRow) -> Result<(), String> {
        self(columns, row)
    }
}

/// Returns a copy of `table` with `hook` applied to every row, in order.
pub fn apply_repair(table: &MergedTable, hook: &dyn RowRepair) -> Result<MergedTable, MergeError> {
    let mut repaired = table.clone();
    for (idx, row) in repaired.rows.iter_mut().enumerate() {
        hook.repair(&table.columns, row)
            .map_err(|message| MergeError::Repair { row: idx, message })?;
    }
    Ok(repaired)
}
