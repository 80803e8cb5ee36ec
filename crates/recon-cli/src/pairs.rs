//! Labelled name pairs for threshold calibration.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use recon_core::matcher::LabelledPair;
use recon_core::{SourceConfig, normalize_table_columns};
use recon_ingest::read_source;
use recon_model::CellValue;

fn parse_expected(value: &CellValue) -> Option<bool> {
    match value {
        CellValue::Boolean(b) => Some(*b),
        CellValue::Integer(0) => Some(false),
        CellValue::Integer(1) => Some(true),
        CellValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Reads a `declared,candidate,expected` CSV. Header names are matched
/// after normalization; `expected` accepts true/false, yes/no or 1/0.
pub fn read_labelled_pairs(path: &Path) -> Result<Vec<LabelledPair>> {
    let source = SourceConfig {
        name: "pairs".to_string(),
        path: path.to_path_buf(),
        skip_rows: 0,
        year: None,
    };
    let table = read_source(&source, &[])
        .with_context(|| format!("read labelled pairs {}", path.display()))?;
    let table = normalize_table_columns(&table)?;

    let declared = table.require_column("declared")?;
    let candidate = table.require_column("candidate")?;
    let expected = table.require_column("expected")?;

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<LabelledPair> {
            let label = &row.values[expected];
            let expected = parse_expected(label).ok_or_else(|| {
                anyhow!(
                    "row {}: expected must be true or false, got '{}'",
                    i + 1,
                    label.render()
                )
            })?;
            Ok(LabelledPair::new(
                row.values[declared].render(),
                row.values[candidate].render(),
                expected,
            ))
        })
        .collect()
}
