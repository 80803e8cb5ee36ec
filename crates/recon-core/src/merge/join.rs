//! Key joins between the primary table and lookup tables.

use std::collections::HashMap;

use recon_model::{
    CellValue, LookupProvenance, MergedRow, MergedTable, ModelError, Table, ValueKind,
};
use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::normalize::normalize;

/// Which primary rows survive a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    /// Keep every primary row; unmatched rows get missing lookup fields.
    #[default]
    Left,
    /// Drop primary rows without a lookup match.
    Inner,
}

/// How many lookup rows may share one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// A repeated lookup key is a [`MergeError::DuplicateJoinKey`].
    #[default]
    OneToOne,
    /// Each match emits one output row, in lookup order.
    OneToMany,
}

/// One lookup join as declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSpec {
    /// Source name of the lookup table; also the suffix for colliding columns.
    pub lookup: String,
    pub keys: Vec<String>,
    #[serde(default)]
    pub how: JoinHow,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl JoinSpec {
    pub fn new<K, S>(lookup: impl Into<String>, keys: K) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lookup: lookup.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            how: JoinHow::default(),
            cardinality: Cardinality::default(),
        }
    }

    pub fn inner(mut self) -> Self {
        self.how = JoinHow::Inner;
        self
    }

    pub fn one_to_many(mut self) -> Self {
        self.cardinality = Cardinality::OneToMany;
        self
    }
}

/// Joins `lookup` onto `primary` on the join's keys.
///
/// Output rows follow primary order. Nothing is returned on error, so a
/// duplicate lookup key never produces a partially merged table.
pub fn merge(
    primary: &MergedTable,
    lookup: &Table,
    spec: &JoinSpec,
) -> Result<MergedTable, MergeError> {
    if spec.keys.is_empty() {
        return Err(MergeError::EmptyJoinKeys {
            lookup: spec.lookup.clone(),
        });
    }
    let keys: Vec<String> = spec.keys.iter().map(|k| normalize(k)).collect();

    let mut primary_key_idx = Vec::with_capacity(keys.len());
    let mut lookup_key_idx = Vec::with_capacity(keys.len());
    for key in &keys {
        let p = primary
            .column_index(key)
            .ok_or_else(|| MergeError::MissingJoinKey {
                table: primary.name.clone(),
                key: key.clone(),
            })?;
        let l = lookup
            .column_index(key)
            .ok_or_else(|| MergeError::MissingJoinKey {
                table: lookup.name().to_string(),
                key: key.clone(),
            })?;
        check_key_kinds(primary, p, lookup, l, key, &spec.lookup)?;
        primary_key_idx.push(p);
        lookup_key_idx.push(l);
    }

    let index = index_lookup(lookup, &lookup_key_idx, spec)?;

    // Non-key lookup columns, renamed on collision.
    let mut columns = primary.columns.clone();
    let mut carried = Vec::new();
    for (idx, column) in lookup.columns().iter().enumerate() {
        if lookup_key_idx.contains(&idx) {
            continue;
        }
        let name = if columns.contains(column) {
            format!("{column}_{}", spec.lookup)
        } else {
            column.clone()
        };
        if columns.contains(&name) {
            return Err(MergeError::Model(ModelError::DuplicateColumn {
                table: primary.name.clone(),
                column: name,
            }));
        }
        if &name != column {
            tracing::debug!(lookup = %spec.lookup, column = %column, renamed = %name, "suffixed colliding lookup column");
        }
        columns.push(name.clone());
        carried.push((idx, name));
    }

    let mut rows = Vec::with_capacity(primary.rows.len());
    let mut unmatched = 0usize;
    for row in &primary.rows {
        let matches = join_key(&row.values, &primary_key_idx)
            .and_then(|key| index.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if matches.is_empty() {
            unmatched += 1;
            if spec.how == JoinHow::Inner {
                continue;
            }
            rows.push(extend_row(row, None, &carried, &spec.lookup));
        } else {
            for &lookup_row in matches {
                let values = lookup.rows()[lookup_row].values.as_slice();
                rows.push(extend_row(row, Some(values), &carried, &spec.lookup));
            }
        }
    }

    if unmatched > 0 {
        tracing::warn!(
            lookup = %spec.lookup,
            unmatched,
            how = ?spec.how,
            "primary rows without a lookup match"
        );
    }
    tracing::debug!(
        lookup = %spec.lookup,
        primary_rows = primary.rows.len(),
        output_rows = rows.len(),
        added_columns = carried.len(),
        "merged lookup"
    );

    Ok(MergedTable {
        name: primary.name.clone(),
        columns,
        rows,
    })
}

/// Applies every lookup in order, starting from the plain primary table.
pub fn merge_all<'a, I>(primary: &Table, lookups: I) -> Result<MergedTable, MergeError>
where
    I: IntoIterator<Item = (&'a JoinSpec, &'a Table)>,
{
    let mut merged = MergedTable::from_primary(primary);
    for (spec, lookup) in lookups {
        merged = merge(&merged, lookup, spec)?;
    }
    Ok(merged)
}

fn extend_row(
    row: &MergedRow,
    lookup_values: Option<&[CellValue]>,
    carried: &[(usize, String)],
    lookup: &str,
) -> MergedRow {
    let mut values = row.values.clone();
    let mut populated = Vec::new();
    let mut missing = Vec::new();
    for (idx, name) in carried {
        let value = lookup_values
            .map(|v| v[*idx].clone())
            .unwrap_or(CellValue::Missing);
        if value.is_missing() {
            missing.push(name.clone());
        } else {
            populated.push(name.clone());
        }
        values.push(value);
    }

    let mut provenance = row.provenance.clone();
    provenance.lookups.push(LookupProvenance {
        lookup: lookup.to_string(),
        matched: lookup_values.is_some(),
        populated,
        missing,
    });

    MergedRow {
        source_index: row.source_index,
        values,
        provenance,
    }
}

/// Key tuple of a row, or `None` when any key value is missing.
fn join_key(values: &[CellValue], key_idx: &[usize]) -> Option<Vec<String>> {
    key_idx.iter().map(|&i| values[i].key_repr()).collect()
}

fn index_lookup(
    lookup: &Table,
    key_idx: &[usize],
    spec: &JoinSpec,
) -> Result<HashMap<Vec<String>, Vec<usize>>, MergeError> {
    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    let mut skipped = 0usize;
    for (row_idx, row) in lookup.rows().iter().enumerate() {
        let Some(key) = join_key(&row.values, key_idx) else {
            skipped += 1;
            continue;
        };
        let entry = index.entry(key).or_default();
        if let (Cardinality::OneToOne, Some(&first_row)) = (spec.cardinality, entry.first()) {
            return Err(MergeError::DuplicateJoinKey {
                lookup: spec.lookup.clone(),
                key: key_idx.iter().map(|&i| row.values[i].render()).collect(),
                first_row,
                duplicate_row: row_idx,
            });
        }
        entry.push(row_idx);
    }
    if skipped > 0 {
        tracing::warn!(lookup = %spec.lookup, skipped, "ignored lookup rows with a missing key");
    }
    Ok(index)
}

fn check_key_kinds(
    primary: &MergedTable,
    primary_idx: usize,
    lookup: &Table,
    lookup_idx: usize,
    key: &str,
    lookup_name: &str,
) -> Result<(), MergeError> {
    let primary_kind = unify_kinds(primary.rows.iter().map(|r| &r.values[primary_idx])).map_err(
        |kinds| MergeError::MixedKeyKinds {
            table: primary.name.clone(),
            key: key.to_string(),
            kinds,
        },
    )?;
    let lookup_kind =
        lookup
            .column_kind(lookup_idx)
            .map_err(|kinds| MergeError::MixedKeyKinds {
                table: lookup.name().to_string(),
                key: key.to_string(),
                kinds,
            })?;

    if let (Some(p), Some(l)) = (primary_kind, lookup_kind)
        && p.unify(l).is_none()
    {
        return Err(MergeError::KeyTypeMismatch {
            key: key.to_string(),
            lookup_name: lookup_name.to_string(),
            primary: p,
            lookup: l,
        });
    }
    Ok(())
}

fn unify_kinds<'a>(
    values: impl Iterator<Item = &'a CellValue>,
) -> Result<Option<ValueKind>, Vec<ValueKind>> {
    let mut kinds: Vec<ValueKind> = values.filter_map(CellValue::kind).collect();
    kinds.sort();
    kinds.dedup();
    let mut unified: Option<ValueKind> = None;
    for &kind in &kinds {
        unified = match unified {
            None => Some(kind),
            Some(current) => match current.unify(kind) {
                Some(next) => Some(next),
                None => return Err(kinds),
            },
        };
    }
    Ok(unified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> Table {
        Table::from_rows(
            "ahah",
            ["lsoa21cd", "no2_mean"],
            vec![
                vec!["E01000003".into(), CellValue::Float(11.5)],
                vec!["E01000001".into(), CellValue::Float(12.0)],
                vec![CellValue::Missing, CellValue::Float(9.0)],
                vec!["E01000002".into(), CellValue::Float(14.25)],
            ],
        )
        .unwrap()
    }

    fn lookup() -> Table {
        Table::from_rows(
            "ruc",
            ["lsoa21cd", "rural_urban_class", "no2_mean"],
            vec![
                vec!["E01000001".into(), "Urban".into(), CellValue::Float(1.0)],
                vec!["E01000003".into(), CellValue::Missing, CellValue::Float(2.0)],
                vec![CellValue::Missing, "Rural".into(), CellValue::Float(3.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn left_join_keeps_primary_order_and_flags_unmatched() {
        let merged = merge_all(&primary(), [(&JoinSpec::new("ruc", ["lsoa21cd"]), &lookup())])
            .unwrap();

        assert_eq!(merged.columns, vec!["lsoa21cd", "no2_mean", "rural_urban_class", "no2_mean_ruc"]);
        let order: Vec<usize> = merged.rows.iter().map(|r| r.source_index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);

        let first = merged.rows[0].provenance.lookup("ruc").unwrap();
        assert!(first.matched);
        assert_eq!(first.populated, vec!["no2_mean_ruc"]);
        assert_eq!(first.missing, vec!["rural_urban_class"]);

        // Missing primary key never matches, even though the lookup has a missing-key row.
        assert!(!merged.rows[2].provenance.is_fully_matched());
        assert_eq!(merged.value(2, "rural_urban_class"), Some(&CellValue::Missing));
        assert!(!merged.rows[3].provenance.is_fully_matched());
    }

    #[test]
    fn inner_join_drops_unmatched() {
        let spec = JoinSpec::new("ruc", ["lsoa21cd"]).inner();
        let merged = merge_all(&primary(), [(&spec, &lookup())]).unwrap();
        let order: Vec<usize> = merged.rows.iter().map(|r| r.source_index).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn duplicate_lookup_key_fails() {
        let lookup = Table::from_rows(
            "ruc",
            ["lsoa21cd", "rural_urban_class"],
            vec![
                vec!["E01000001".into(), "Urban".into()],
                vec![" E01000001".into(), "Rural".into()],
            ],
        )
        .unwrap();
        let err = merge_all(&primary(), [(&JoinSpec::new("ruc", ["lsoa21cd"]), &lookup)])
            .unwrap_err();
        assert_eq!(
            err,
            MergeError::DuplicateJoinKey {
                lookup: "ruc".to_string(),
                key: vec![" E01000001".to_string()],
                first_row: 0,
                duplicate_row: 1,
            }
        );
    }

    #[test]
    fn one_to_many_emits_each_match() {
        let lookup = Table::from_rows(
            "pens",
            ["lsoa21cd", "pen_portrait"],
            vec![
                vec!["E01000001".into(), "a".into()],
                vec!["E01000001".into(), "b".into()],
            ],
        )
        .unwrap();
        let spec = JoinSpec::new("pens", ["lsoa21cd"]).one_to_many().inner();
        let merged = merge_all(&primary(), [(&spec, &lookup)]).unwrap();
        let portraits: Vec<String> = merged.rows.iter().map(|r| r.values[2].render()).collect();
        assert_eq!(portraits, vec!["a", "b"]);
        assert!(merged.rows.iter().all(|r| r.source_index == 1));
    }

    #[test]
    fn key_kind_mismatch_is_rejected() {
        let lookup = Table::from_rows(
            "codes",
            ["lsoa21cd", "flag"],
            vec![vec![CellValue::Integer(1), true.into()]],
        )
        .unwrap();
        let err = merge_all(&primary(), [(&JoinSpec::new("codes", ["lsoa21cd"]), &lookup)])
            .unwrap_err();
        assert!(matches!(
            err,
            MergeError::KeyTypeMismatch {
                primary: ValueKind::Text,
                lookup: ValueKind::Integer,
                ..
            }
        ));
    }

    #[test]
    fn missing_key_column_is_rejected() {
        let err = merge_all(&primary(), [(&JoinSpec::new("ruc", ["LAD22CD"]), &lookup())])
            .unwrap_err();
        assert_eq!(
            err,
            MergeError::MissingJoinKey {
                table: "ahah".to_string(),
                key: "lad22cd".to_string(),
            }
        );
    }

    #[test]
    fn provenance_accumulates_across_lookups() {
        let second = Table::from_rows(
            "pens",
            ["lsoa21cd", "pen_portrait"],
            vec![vec!["E01000002".into(), "text".into()]],
        )
        .unwrap();
        let ruc = JoinSpec::new("ruc", ["lsoa21cd"]);
        let pens = JoinSpec::new("pens", ["lsoa21cd"]);
        let lookup = lookup();
        let merged = merge_all(&primary(), [(&ruc, &lookup), (&pens, &second)]).unwrap();

        let last = &merged.rows[3].provenance;
        assert_eq!(last.lookups.len(), 2);
        assert!(!last.lookup("ruc").unwrap().matched);
        assert!(last.lookup("pens").unwrap().matched);
    }
}
