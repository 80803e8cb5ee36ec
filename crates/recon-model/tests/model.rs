//! Tests for recon-model types.

use recon_model::{
    CellValue, Category, MergedTable, Resolution, Table, VariableCatalogue, VariableRecord,
};

#[test]
fn merged_table_round_trips_to_plain_table() {
    let primary = Table::from_rows(
        "ahah_2022",
        ["lsoa21cd", "ah3gp"],
        vec![
            vec![CellValue::text("E01000001"), CellValue::Float(1.25)],
            vec![CellValue::text("E01000002"), CellValue::Missing],
        ],
    )
    .unwrap();

    let merged = MergedTable::from_primary(&primary);
    let back = merged.to_table().unwrap();

    assert_eq!(back.columns(), primary.columns());
    assert_eq!(back.rows(), primary.rows());
}

#[test]
fn resolution_counts_group_records() {
    let mut exact = VariableRecord::new("median_age", Category::Sociodemographic);
    exact.resolution = Resolution::Exact;
    let mut forced = VariableRecord::new("income_score", Category::Sociodemographic);
    forced.resolution = Resolution::Override;
    let pending = VariableRecord::new("pen_portrait", Category::Auxiliary);

    let catalogue: VariableCatalogue = vec![exact, forced, pending].into_iter().collect();
    let counts = catalogue.resolution_counts();

    assert_eq!(counts.get(&Resolution::Exact), Some(&1));
    assert_eq!(counts.get(&Resolution::Override), Some(&1));
    assert_eq!(counts.get(&Resolution::Pending), Some(&1));
    assert_eq!(catalogue.by_category(Category::Sociodemographic).count(), 2);
}

#[test]
fn catalogue_serializes_with_lowercase_enums() {
    let record = VariableRecord::new("env_no2_mean", Category::Environmental)
        .with_type("float")
        .with_attribute("year", "2022");
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["category"], "environmental");
    assert_eq!(json["resolution"], "pending");
    assert_eq!(json["attributes"]["year"], "2022");
}
