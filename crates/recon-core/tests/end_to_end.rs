//! Full pipeline runs over small in-memory datasets.

use std::collections::BTreeMap;

use recon_core::{
    CategoryRule, DEFAULT_THRESHOLD, Edition, GapKind, JoinSpec, NoRepair, PipelineInputs,
    ReconcileConfig, ReconcileError, run_pipeline,
};
use recon_model::{Category, CellValue, Resolution, Table};

fn primary() -> Table {
    Table::from_rows(
        "ahah",
        ["LSOA21CD", "Population Density", "median_age", "IMD_Inc"],
        vec![
            vec!["E01000001".into(), CellValue::Float(5120.5), CellValue::Integer(41), CellValue::Float(0.12)],
            vec!["E01000002".into(), CellValue::Float(830.0), CellValue::Integer(37), CellValue::Float(0.31)],
            vec!["E01000003".into(), CellValue::Float(12.25), CellValue::Integer(52), CellValue::Missing],
        ],
    )
    .unwrap()
}

fn classes() -> Table {
    Table::from_rows(
        "classes",
        ["lsoa21cd", "Rural Urban Class", "pen_portrait"],
        vec![
            vec!["E01000001".into(), "Urban major conurbation".into(), "Cosmopolitan student neighbourhoods".into()],
            vec!["E01000003".into(), "Rural village".into(), "Rural residents".into()],
        ],
    )
    .unwrap()
}

fn socio_sheet() -> Table {
    socio_sheet_declaring("Population Density")
}

fn socio_sheet_declaring(density_name: &str) -> Table {
    Table::from_rows(
        "socio_meta",
        ["Variable Name", "Type", "Description"],
        vec![
            vec![density_name.into(), "float".into(), "Usual residents per km2".into()],
            vec!["Median Age".into(), "integer".into(), CellValue::Missing],
            vec!["Income Score".into(), "float".into(), "IMD income domain score".into()],
        ],
    )
    .unwrap()
}

fn aux_sheet() -> Table {
    Table::from_rows(
        "aux_meta",
        ["name"],
        vec![vec!["rural_urban_class".into()], vec!["pen_portrait".into()]],
    )
    .unwrap()
}

fn config(with_override: bool) -> ReconcileConfig {
    let mut config = ReconcileConfig {
        max_rows_per_chunk: 2,
        key_columns: vec!["lsoa21cd".to_string()],
        sort_keys: vec!["lsoa21cd".to_string()],
        require_total_order: true,
        categories: vec![
            CategoryRule::new(Category::Sociodemographic, "socio_meta")
                .with_rename("Variable Name", "name")
                .with_type_field("type")
                .with_keep("description")
                .with_source("census_2021"),
            CategoryRule::new(Category::Auxiliary, "aux_meta"),
        ],
        joins: vec![JoinSpec::new("classes", ["lsoa21cd"])],
        ..ReconcileConfig::default()
    };
    if with_override {
        config.overrides.insert("Income Score", "imd_inc");
    }
    config
}

fn inputs() -> PipelineInputs {
    PipelineInputs {
        editions: vec![Edition {
            year: None,
            table: primary(),
        }],
        lookups: BTreeMap::from([("classes".to_string(), classes())]),
        metadata: BTreeMap::from([
            ("socio_meta".to_string(), socio_sheet()),
            ("aux_meta".to_string(), aux_sheet()),
        ]),
    }
}

#[test]
fn two_sheet_reconciliation_with_one_override_has_no_gaps() {
    let run = run_pipeline(&config(true), &inputs(), &NoRepair).unwrap();

    assert_eq!(run.catalogue.len(), 5);
    let counts = run.catalogue.resolution_counts();
    assert_eq!(counts.get(&Resolution::Exact), Some(&4));
    assert_eq!(counts.get(&Resolution::Override), Some(&1));
    assert!(run.gaps.is_empty(), "gaps: {:?}", run.gaps);
    run.ensure_loadable(false).unwrap();

    let income = run
        .catalogue
        .get(Category::Sociodemographic, "income_score")
        .unwrap();
    assert_eq!(income.resolved_column.as_deref(), Some("imd_inc"));
    assert_eq!(income.source.as_deref(), Some("census_2021"));
    assert_eq!(
        income.attributes.get("description").map(String::as_str),
        Some("IMD income domain score")
    );

    for record in run.catalogue.records() {
        let column = record.resolved_column.as_deref().unwrap();
        assert!(run.merged.columns.iter().any(|c| c == column));
    }
}

#[test]
fn misspelled_declaration_is_matched_fuzzily() {
    let mut inputs = inputs();
    inputs
        .metadata
        .insert("socio_meta".to_string(), socio_sheet_declaring("Population densty"));
    let run = run_pipeline(&config(true), &inputs, &NoRepair).unwrap();

    let counts = run.catalogue.resolution_counts();
    assert_eq!(counts.get(&Resolution::Exact), Some(&3));
    assert_eq!(counts.get(&Resolution::Fuzzy), Some(&1));
    assert_eq!(counts.get(&Resolution::Override), Some(&1));
    assert!(run.gaps.is_empty(), "gaps: {:?}", run.gaps);

    let density = run
        .catalogue
        .get(Category::Sociodemographic, "population_densty")
        .unwrap();
    assert_eq!(density.resolution, Resolution::Fuzzy);
    assert_eq!(density.resolved_column.as_deref(), Some("population_density"));
    let confidence = density.match_confidence.unwrap();
    assert!(
        (DEFAULT_THRESHOLD..1.0).contains(&confidence),
        "confidence {confidence}"
    );
    run.ensure_loadable(false).unwrap();
}

fn pollutant_run(with_override: bool) -> recon_core::PipelineRun {
    let primary = Table::from_rows(
        "air",
        ["lsoa21cd", "no2_a", "no2_b"],
        vec![vec!["E01000001".into(), CellValue::Float(21.4), CellValue::Float(19.8)]],
    )
    .unwrap();
    let sheet = Table::from_rows("env_meta", ["name"], vec![vec!["no2".into()], vec!["no2_b".into()]])
        .unwrap();
    let mut config = ReconcileConfig {
        key_columns: vec!["lsoa21cd".to_string()],
        categories: vec![CategoryRule::new(Category::Environmental, "env_meta")],
        ..ReconcileConfig::default()
    };
    if with_override {
        config.overrides.insert("no2", "no2_a");
    }
    let inputs = PipelineInputs {
        editions: vec![Edition { year: None, table: primary }],
        lookups: BTreeMap::new(),
        metadata: BTreeMap::from([("env_meta".to_string(), sheet)]),
    };
    run_pipeline(&config, &inputs, &NoRepair).unwrap()
}

#[test]
fn tied_match_blocks_loading_until_overridden() {
    let run = pollutant_run(false);
    let no2 = run.catalogue.get(Category::Environmental, "no2").unwrap();
    assert_eq!(no2.resolution, Resolution::Ambiguous);
    assert_eq!(no2.resolved_column, None);

    let counts = run.gaps.counts();
    assert_eq!(counts.get(&GapKind::AmbiguousMatch), Some(&1));
    assert_eq!(counts.get(&GapKind::UndocumentedColumn), Some(&1));
    assert!(matches!(
        run.ensure_loadable(false),
        Err(ReconcileError::LoadBlocked { gaps: 2, oversized: 0 })
    ));

    let run = pollutant_run(true);
    let no2 = run.catalogue.get(Category::Environmental, "no2").unwrap();
    assert_eq!(no2.resolution, Resolution::Override);
    assert_eq!(no2.resolved_column.as_deref(), Some("no2_a"));
    assert!(run.gaps.is_empty(), "gaps: {:?}", run.gaps);
    run.ensure_loadable(false).unwrap();
}

#[test]
fn merged_rows_keep_primary_order_and_provenance() {
    let run = run_pipeline(&config(true), &inputs(), &NoRepair).unwrap();

    assert_eq!(
        run.merged.columns,
        vec![
            "lsoa21cd",
            "population_density",
            "median_age",
            "imd_inc",
            "rural_urban_class",
            "pen_portrait"
        ]
    );
    let order: Vec<usize> = run.merged.rows.iter().map(|r| r.source_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!(run.merged.rows[0].provenance.is_fully_matched());
    assert!(!run.merged.rows[1].provenance.is_fully_matched());
    assert_eq!(run.merged.value(1, "pen_portrait"), Some(&CellValue::Missing));
}

#[test]
fn partitions_cover_every_row() {
    let run = run_pipeline(&config(true), &inputs(), &NoRepair).unwrap();

    let labels: Vec<&str> = run.partitions.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["001", "002"]);
    assert_eq!(run.partitions[0].range, 0..2);
    assert_eq!(run.partitions[1].range, 2..3);
    assert!(run.size_violations.is_empty());

    let slices = run.partition_slices().unwrap();
    let rebuilt: Vec<_> = slices.iter().flat_map(|p| p.rows.iter().cloned()).collect();
    assert_eq!(rebuilt, run.merged.rows);
}

#[test]
fn missing_override_leaves_a_blocking_gap() {
    let run = run_pipeline(&config(false), &inputs(), &NoRepair).unwrap();

    let counts = run.gaps.counts();
    assert_eq!(counts.get(&GapKind::UnresolvedVariable), Some(&1));
    assert_eq!(counts.get(&GapKind::UndocumentedColumn), Some(&1));
    assert!(matches!(
        run.ensure_loadable(false),
        Err(ReconcileError::LoadBlocked { gaps: 2, oversized: 0 })
    ));
    run.ensure_loadable(true).unwrap();
}

#[test]
fn oversized_partitions_block_even_with_accepted_gaps() {
    let mut config = config(true);
    config.size_ceiling_bytes = 40;
    let run = run_pipeline(&config, &inputs(), &NoRepair).unwrap();

    assert!(!run.size_violations.is_empty());
    assert!(matches!(
        run.ensure_loadable(true),
        Err(ReconcileError::LoadBlocked { gaps: 0, .. })
    ));
}

#[test]
fn missing_lookup_table_is_reported() {
    let mut inputs = inputs();
    inputs.lookups.clear();
    let err = run_pipeline(&config(true), &inputs, &NoRepair).unwrap_err();
    assert!(matches!(err, ReconcileError::MissingSource(name) if name == "classes"));
}

#[test]
fn duplicate_lookup_key_stops_the_run() {
    let mut inputs = inputs();
    let duplicated = Table::from_rows(
        "classes",
        ["lsoa21cd", "rural_urban_class", "pen_portrait"],
        vec![
            vec!["E01000001".into(), "a".into(), "b".into()],
            vec!["E01000001".into(), "c".into(), "d".into()],
        ],
    )
    .unwrap();
    inputs.lookups.insert("classes".to_string(), duplicated);
    let err = run_pipeline(&config(true), &inputs, &NoRepair).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Merge(recon_core::MergeError::DuplicateJoinKey { .. })
    ));
}
