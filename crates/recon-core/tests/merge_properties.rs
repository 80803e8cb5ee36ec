//! Merge and ordering properties.

use std::collections::BTreeMap;

use proptest::prelude::*;
use recon_core::{
    Edition, JoinSpec, MergeError, NoRepair, PipelineInputs, ReconcileConfig, merge_all,
    run_pipeline, sort_by_keys, stack_years,
};
use recon_model::{CellValue, MergedTable, Table};

fn yearly(year: i64, rows: &[(&str, &str, f64)]) -> Table {
    Table::from_rows(
        format!("ahah_{year}"),
        ["region_code", "area_code", "no2_mean"],
        rows.iter()
            .map(|(region, area, value)| vec![(*region).into(), (*area).into(), CellValue::Float(*value)])
            .collect::<Vec<_>>(),
    )
    .unwrap()
}

fn editions() -> (Table, Table) {
    let a = yearly(
        2021,
        &[("E12000007", "E01000002", 20.1), ("E12000001", "E01033000", 9.8), ("E12000007", "E01000001", 22.4)],
    );
    let b = yearly(
        2022,
        &[("E12000007", "E01000001", 21.0), ("E12000007", "E01000002", 19.5), ("E12000001", "E01033000", 9.1)],
    );
    (a, b)
}

#[test]
fn stacked_years_sort_into_a_total_order() {
    let (a, b) = editions();
    let stacked = stack_years([(2021, &a), (2022, &b)], "year").unwrap();
    let keys = ["region_code", "area_code", "year"].map(String::from);
    let sorted = sort_by_keys(&MergedTable::from_primary(&stacked), &keys, true).unwrap();

    let tuples: Vec<(String, String, String)> = sorted
        .rows
        .iter()
        .map(|r| (r.values[0].render(), r.values[1].render(), r.values[3].render()))
        .collect();
    assert_eq!(
        tuples,
        vec![
            ("E12000001".into(), "E01033000".into(), "2021".into()),
            ("E12000001".into(), "E01033000".into(), "2022".into()),
            ("E12000007".into(), "E01000001".into(), "2021".into()),
            ("E12000007".into(), "E01000001".into(), "2022".into()),
            ("E12000007".into(), "E01000002".into(), "2021".into()),
            ("E12000007".into(), "E01000002".into(), "2022".into()),
        ]
    );
    for pair in tuples.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn without_year_the_same_keys_tie() {
    let (a, b) = editions();
    let stacked = stack_years([(2021, &a), (2022, &b)], "year").unwrap();
    let keys = ["region_code", "area_code"].map(String::from);
    let err = sort_by_keys(&MergedTable::from_primary(&stacked), &keys, true).unwrap_err();
    assert!(matches!(err, MergeError::AmbiguousSortOrder { .. }));
}

#[test]
fn pipeline_stacks_and_sorts_editions() {
    let (a, b) = editions();
    let config = ReconcileConfig {
        sort_keys: ["region_code", "area_code", "year"].map(String::from).to_vec(),
        require_total_order: true,
        key_columns: ["region_code", "area_code", "year"].map(String::from).to_vec(),
        allow_list: vec!["no2_mean".to_string()],
        ..ReconcileConfig::default()
    };
    let inputs = PipelineInputs {
        editions: vec![
            Edition { year: Some(2021), table: a },
            Edition { year: Some(2022), table: b },
        ],
        lookups: BTreeMap::new(),
        metadata: BTreeMap::new(),
    };
    let run = run_pipeline(&config, &inputs, &NoRepair).unwrap();
    assert_eq!(run.merged.height(), 6);
    assert_eq!(run.merged.value(0, "year"), Some(&CellValue::Integer(2021)));
    assert!(run.gaps.is_empty());
}

fn key(i: u8) -> CellValue {
    CellValue::text(format!("E0100{i:04}"))
}

proptest! {
    #[test]
    fn prop_left_merge_keeps_every_primary_row_in_order(
        primary_keys in prop::collection::vec(0u8..40, 0..60),
        lookup_keys in prop::collection::btree_set(0u8..40, 0..30),
    ) {
        let primary = Table::from_rows(
            "primary",
            ["lsoa21cd", "value"],
            primary_keys
                .iter()
                .enumerate()
                .map(|(i, k)| vec![key(*k), CellValue::Integer(i as i64)])
                .collect::<Vec<_>>(),
        )
        .unwrap();
        let lookup = Table::from_rows(
            "lookup",
            ["lsoa21cd", "label"],
            lookup_keys
                .iter()
                .map(|k| vec![key(*k), CellValue::text(format!("label {k}"))])
                .collect::<Vec<_>>(),
        )
        .unwrap();

        let merged = merge_all(&primary, [(&JoinSpec::new("lookup", ["lsoa21cd"]), &lookup)]).unwrap();

        prop_assert_eq!(merged.height(), primary_keys.len());
        for (i, row) in merged.rows.iter().enumerate() {
            prop_assert_eq!(row.source_index, i);
            prop_assert_eq!(&row.values[1], &CellValue::Integer(i as i64));
            let matched = lookup_keys.contains(&primary_keys[i]);
            prop_assert_eq!(row.provenance.is_fully_matched(), matched);
            prop_assert_eq!(row.values[2].is_missing(), !matched);
        }
    }

    #[test]
    fn prop_duplicate_lookup_key_never_yields_output(
        primary_keys in prop::collection::vec(0u8..10, 1..20),
        duplicated in 0u8..10,
    ) {
        let primary = Table::from_rows(
            "primary",
            ["lsoa21cd"],
            primary_keys.iter().map(|k| vec![key(*k)]).collect::<Vec<_>>(),
        )
        .unwrap();
        let lookup = Table::from_rows(
            "lookup",
            ["lsoa21cd", "label"],
            vec![
                vec![key(duplicated), "first".into()],
                vec![key(duplicated), "second".into()],
            ],
        )
        .unwrap();

        let result = merge_all(&primary, [(&JoinSpec::new("lookup", ["lsoa21cd"]), &lookup)]);
        let is_duplicate = matches!(result, Err(MergeError::DuplicateJoinKey { .. }));
        prop_assert!(is_duplicate);
    }
}
