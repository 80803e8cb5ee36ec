//! Conversion from model tables to Polars frames.

use std::collections::BTreeSet;

use polars::prelude::*;
use recon_model::{CellValue, MergedRow, VariableCatalogue};

use crate::error::Result;

/// Builds a frame of rendered text columns from merged rows.
///
/// Every cell goes through [`CellValue::render`], so the delimited file
/// Polars writes has exactly the bytes the partitioner estimated. Missing
/// values become nulls and are written as empty fields.
pub fn rows_to_frame(columns: &[String], rows: &[MergedRow]) -> Result<DataFrame> {
    let frame_columns = columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|row| {
                    row.values
                        .get(idx)
                        .map(CellValue::render)
                        .filter(|s| !s.is_empty())
                })
                .collect();
            Column::from(Series::new(name.as_str().into(), values))
        })
        .collect::<Vec<_>>();
    Ok(DataFrame::new(frame_columns)?)
}

fn text_column(name: &str, values: impl Iterator<Item = Option<String>>) -> Column {
    Column::from(Series::new(name.into(), values.collect::<Vec<_>>()))
}

/// Builds the catalogue frame.
///
/// Fixed columns come first; each attribute key seen on any record follows
/// as its own column, in key order.
pub fn catalogue_to_frame(catalogue: &VariableCatalogue) -> Result<DataFrame> {
    let records = catalogue.records();

    let mut columns = vec![
        text_column(
            "category",
            records.iter().map(|r| Some(r.category.as_str().to_string())),
        ),
        text_column(
            "declared_name",
            records.iter().map(|r| Some(r.declared_name.clone())),
        ),
        text_column("data_type", records.iter().map(|r| r.data_type.clone())),
        text_column("source", records.iter().map(|r| r.source.clone())),
        text_column(
            "resolved_column",
            records.iter().map(|r| r.resolved_column.clone()),
        ),
        Column::from(Series::new(
            "match_confidence".into(),
            records
                .iter()
                .map(|r| r.match_confidence)
                .collect::<Vec<Option<f64>>>(),
        )),
        text_column(
            "resolution",
            records.iter().map(|r| Some(r.resolution.as_str().to_string())),
        ),
    ];

    let attribute_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.attributes.keys().map(String::as_str))
        .collect();
    for key in attribute_keys {
        columns.push(text_column(
            key,
            records.iter().map(|r| r.attributes.get(key).cloned()),
        ));
    }

    Ok(DataFrame::new(columns)?)
}
