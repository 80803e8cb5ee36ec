//! Conversion from Polars frames to model tables.

use polars::prelude::*;
use recon_core::normalize;
use recon_model::{CellValue, Table};

use crate::error::Result;

/// Converts one Polars value into a cell.
///
/// Nulls and blank strings become [`CellValue::Missing`]. Text in a
/// geometry column becomes [`CellValue::Geometry`] and is passed through
/// as WKT without interpretation.
pub fn any_to_cell(value: AnyValue<'_>, geometry: bool) -> CellValue {
    let text = |s: &str| {
        if s.trim().is_empty() {
            CellValue::Missing
        } else if geometry {
            CellValue::Geometry(s.to_string())
        } else {
            CellValue::Text(s.to_string())
        }
    };

    match value {
        AnyValue::Null => CellValue::Missing,
        AnyValue::Boolean(b) => CellValue::Boolean(b),
        AnyValue::Int8(v) => CellValue::Integer(i64::from(v)),
        AnyValue::Int16(v) => CellValue::Integer(i64::from(v)),
        AnyValue::Int32(v) => CellValue::Integer(i64::from(v)),
        AnyValue::Int64(v) => CellValue::Integer(v),
        AnyValue::UInt8(v) => CellValue::Integer(i64::from(v)),
        AnyValue::UInt16(v) => CellValue::Integer(i64::from(v)),
        AnyValue::UInt32(v) => CellValue::Integer(i64::from(v)),
        AnyValue::UInt64(v) => {
            i64::try_from(v).map_or(CellValue::Float(v as f64), CellValue::Integer)
        }
        AnyValue::Float32(v) => CellValue::Float(f64::from(v)),
        AnyValue::Float64(v) => CellValue::Float(v),
        AnyValue::String(s) => text(s),
        AnyValue::StringOwned(s) => text(s.as_str()),
        other => {
            let rendered = other.to_string();
            let unquoted = rendered
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(&rendered);
            text(unquoted)
        }
    }
}

/// Builds a [`Table`] from a frame, keeping column order and raw header names.
///
/// Columns whose normalized name is in `geometry_columns` hold WKT shapes.
pub fn dataframe_to_table(
    name: &str,
    df: &DataFrame,
    geometry_columns: &[String],
) -> Result<Table> {
    let columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|c| c.as_str().to_string())
        .collect();
    let geometry: Vec<String> = geometry_columns.iter().map(|g| normalize(g)).collect();
    let is_geometry: Vec<bool> = columns
        .iter()
        .map(|c| geometry.contains(&normalize(c)))
        .collect();

    let mut table = Table::new(name, columns)?;
    let frame_columns = df.get_columns();
    for row in 0..df.height() {
        let mut values = Vec::with_capacity(frame_columns.len());
        for (column, geometry) in frame_columns.iter().zip(&is_geometry) {
            values.push(any_to_cell(column.get(row)?, *geometry));
        }
        table.push_row(values)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_to_cell_scalars() {
        assert_eq!(any_to_cell(AnyValue::Null, false), CellValue::Missing);
        assert_eq!(any_to_cell(AnyValue::Int32(41), false), CellValue::Integer(41));
        assert_eq!(any_to_cell(AnyValue::Float64(0.5), false), CellValue::Float(0.5));
        assert_eq!(any_to_cell(AnyValue::Boolean(true), false), CellValue::Boolean(true));
        assert_eq!(any_to_cell(AnyValue::UInt64(u64::MAX), false), CellValue::Float(u64::MAX as f64));
    }

    #[test]
    fn test_any_to_cell_text() {
        assert_eq!(any_to_cell(AnyValue::String("   "), false), CellValue::Missing);
        assert_eq!(
            any_to_cell(AnyValue::String("E01000001"), false),
            CellValue::text("E01000001")
        );
        assert_eq!(
            any_to_cell(AnyValue::String("POINT (1 2)"), true),
            CellValue::Geometry("POINT (1 2)".to_string())
        );
    }

    #[test]
    fn test_dataframe_to_table() {
        let df = df! {
            "LSOA21CD" => ["E01000001", "E01000002"],
            "no2_mean" => [Some(22.4), None],
            "Geometry" => ["POINT (0 0)", "POINT (1 1)"],
        }
        .unwrap();

        let table = dataframe_to_table("ahah", &df, &["geometry".to_string()]).unwrap();
        assert_eq!(table.name(), "ahah");
        assert_eq!(table.columns(), ["LSOA21CD", "no2_mean", "Geometry"]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.value(1, "no2_mean"), Some(&CellValue::Missing));
        assert_eq!(
            table.value(0, "Geometry"),
            Some(&CellValue::Geometry("POINT (0 0)".to_string()))
        );
    }
}
