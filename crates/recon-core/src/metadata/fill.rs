use recon_model::{CellValue, Table};

use crate::error::AssemblyError;

/// True for missing cells and text that is empty after trimming.
pub fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Missing => true,
        CellValue::Text(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Returns a copy of `table` where blank cells in `column` take the nearest
/// preceding non-blank value.
///
/// A blank first value has nothing to inherit and is an error.
pub fn forward_fill(table: &Table, column: &str) -> Result<Table, AssemblyError> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| AssemblyError::MissingColumn {
            sheet: table.name().to_string(),
            column: column.to_string(),
        })?;

    let mut filled = table.clone();
    let mut last: Option<CellValue> = None;
    let mut inherited = 0usize;
    for row in filled.rows_mut() {
        let cell = &mut row.values[idx];
        if is_blank(cell) {
            match &last {
                Some(value) => {
                    *cell = value.clone();
                    inherited += 1;
                }
                None => {
                    return Err(AssemblyError::ForwardFillLeadingNull {
                        sheet: table.name().to_string(),
                        column: column.to_string(),
                    });
                }
            }
        } else {
            last = Some(cell.clone());
        }
    }

    tracing::trace!(sheet = table.name(), column, inherited, "forward fill");
    Ok(filled)
}
