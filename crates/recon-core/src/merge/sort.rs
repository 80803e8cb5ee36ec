use std::cmp::Ordering;

use recon_model::{CellValue, MergedTable};

use crate::error::MergeError;
use crate::normalize::normalize;

/// Stable sort of the merged rows by `keys`, missing values last.
///
/// With `require_total_order`, two rows sharing the full key tuple fail with
/// [`MergeError::AmbiguousSortOrder`], naming their positions in the input.
pub fn sort_by_keys(
    table: &MergedTable,
    keys: &[String],
    require_total_order: bool,
) -> Result<MergedTable, MergeError> {
    let key_idx = keys
        .iter()
        .map(|k| table.require_column(&normalize(k)))
        .collect::<Result<Vec<_>, _>>()?;

    let compare = |a: &[CellValue], b: &[CellValue]| -> Ordering {
        key_idx
            .iter()
            .map(|&i| a[i].sort_cmp(&b[i]))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    };

    let mut order: Vec<usize> = (0..table.rows.len()).collect();
    order.sort_by(|&a, &b| compare(&table.rows[a].values, &table.rows[b].values));

    if require_total_order {
        for pair in order.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if compare(&table.rows[first].values, &table.rows[second].values).is_eq() {
                return Err(MergeError::AmbiguousSortOrder {
                    first,
                    second,
                    key: key_idx
                        .iter()
                        .map(|&i| table.rows[first].values[i].render())
                        .collect(),
                });
            }
        }
    }

    tracing::debug!(table = %table.name, keys = ?keys, rows = order.len(), "sorted rows");
    Ok(MergedTable {
        name: table.name.clone(),
        columns: table.columns.clone(),
        rows: order.into_iter().map(|i| table.rows[i].clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_model::Table;

    fn table() -> MergedTable {
        MergedTable::from_primary(
            &Table::from_rows(
                "t",
                ["area", "year"],
                vec![
                    vec!["b".into(), CellValue::Integer(2022)],
                    vec![CellValue::Missing, CellValue::Integer(2021)],
                    vec!["a".into(), CellValue::Integer(2022)],
                    vec!["b".into(), CellValue::Integer(2021)],
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn sorts_with_missing_last() {
        let sorted = sort_by_keys(&table(), &["area".into(), "year".into()], true).unwrap();
        let order: Vec<usize> = sorted.rows.iter().map(|r| r.source_index).collect();
        assert_eq!(order, vec![2, 3, 0, 1]);
    }

    #[test]
    fn sort_is_stable_without_total_order() {
        let sorted = sort_by_keys(&table(), &["year".into()], false).unwrap();
        let order: Vec<usize> = sorted.rows.iter().map(|r| r.source_index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn ties_fail_when_total_order_required() {
        let err = sort_by_keys(&table(), &["year".into()], true).unwrap_err();
        assert_eq!(
            err,
            MergeError::AmbiguousSortOrder {
                first: 1,
                second: 3,
                key: vec!["2021".to_string()],
            }
        );
    }

    #[test]
    fn unknown_key_is_reported() {
        assert!(matches!(
            sort_by_keys(&table(), &["Region Code".into()], false),
            Err(MergeError::Model(_))
        ));
    }
}
