//! Loading a configured run from files on disk.

use std::fs;
use std::path::Path;

use recon_core::{NoRepair, ReconcileConfig, run_pipeline};
use recon_ingest::{IngestError, load_inputs};
use recon_model::{Category, CellValue, Resolution};
use tempfile::TempDir;

const CONFIG: &str = r#"
key_columns = ["LSOA21CD"]
geometry_columns = ["geometry"]
sort_keys = ["lsoa21cd"]
require_total_order = true

[overrides]
"Income Score" = "imd_inc"

[[categories]]
category = "sociodemographic"
sheet = "socio_meta"
type_field = "type"
keep = ["description"]
source = "census_2021"
[categories.rename]
"Variable Name" = "name"

[[categories]]
category = "auxiliary"
sheet = "aux_meta"

[[joins]]
lookup = "classes"
keys = ["lsoa21cd"]

[[sources.primary]]
name = "ahah"
path = "data/ahah.csv"
skip_rows = 1

[[sources.lookups]]
name = "classes"
path = "data/classes.csv"

[[sources.metadata]]
name = "socio_meta"
path = "meta/socio.csv"

[[sources.metadata]]
name = "aux_meta"
path = "meta/aux.csv"
"#;

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "recon.toml", CONFIG);
    write(
        dir.path(),
        "data/ahah.csv",
        "Access to Healthy Assets and Hazards (extract)\n\
         LSOA21CD,Population Density,median_age,IMD_Inc,geometry\n\
         E01000003,12.25,52,,POINT (3 3)\n\
         E01000001,5120.5,41,0.12,POINT (1 1)\n\
         E01000002,830.0,37,0.31,POINT (2 2)\n",
    );
    write(
        dir.path(),
        "data/classes.csv",
        "lsoa21cd,Rural Urban Class,pen_portrait\n\
         E01000001,Urban major conurbation,Cosmopolitan student neighbourhoods\n\
         E01000003,Rural village,Rural residents\n",
    );
    write(
        dir.path(),
        "meta/socio.csv",
        "Variable Name,Type,Description\n\
         Population Density,float,\"Usual residents per km2, mid-year\"\n\
         Median Age,integer,\n\
         Income Score,float,IMD income domain score\n",
    );
    write(dir.path(), "meta/aux.csv", "name\nrural_urban_class\npen_portrait\n");
    dir
}

#[test]
fn test_load_inputs_reads_every_source() {
    let dir = workspace();
    let config = ReconcileConfig::load(&dir.path().join("recon.toml")).unwrap();
    let inputs = load_inputs(&config).unwrap();

    assert_eq!(inputs.editions.len(), 1);
    let primary = &inputs.editions[0].table;
    assert_eq!(primary.name(), "ahah");
    assert_eq!(primary.height(), 3);
    assert_eq!(primary.value(0, "IMD_Inc"), Some(&CellValue::Missing));
    assert_eq!(primary.value(1, "median_age"), Some(&CellValue::Integer(41)));
    assert_eq!(
        primary.value(1, "geometry"),
        Some(&CellValue::Geometry("POINT (1 1)".to_string()))
    );
    assert_eq!(inputs.lookups["classes"].height(), 2);
    assert_eq!(
        inputs.metadata["socio_meta"].value(0, "Description"),
        Some(&CellValue::text("Usual residents per km2, mid-year"))
    );
}

#[test]
fn test_loaded_sources_reconcile_without_gaps() {
    let dir = workspace();
    let config = ReconcileConfig::load(&dir.path().join("recon.toml")).unwrap();
    let inputs = load_inputs(&config).unwrap();
    let run = run_pipeline(&config, &inputs, &NoRepair).unwrap();

    assert!(run.gaps.is_empty(), "gaps: {:?}", run.gaps);
    assert_eq!(run.catalogue.len(), 5);
    assert_eq!(
        run.catalogue.resolution_counts().get(&Resolution::Override),
        Some(&1)
    );
    let age = run.catalogue.get(Category::Sociodemographic, "median_age").unwrap();
    assert_eq!(age.data_type.as_deref(), Some("integer"));

    let codes: Vec<String> = run
        .merged
        .rows
        .iter()
        .map(|r| r.values[0].render())
        .collect();
    assert_eq!(codes, vec!["E01000001", "E01000002", "E01000003"]);
}

#[test]
fn test_missing_source_file_is_reported() {
    let dir = workspace();
    fs::remove_file(dir.path().join("data/classes.csv")).unwrap();
    let config = ReconcileConfig::load(&dir.path().join("recon.toml")).unwrap();

    let err = load_inputs(&config).unwrap_err();
    assert!(matches!(err, IngestError::FileNotFound { path } if path.ends_with("classes.csv")));
}

#[test]
fn test_header_only_source_is_rejected() {
    let dir = workspace();
    write(dir.path(), "meta/aux.csv", "name\n");
    let config = ReconcileConfig::load(&dir.path().join("recon.toml")).unwrap();

    let err = load_inputs(&config).unwrap_err();
    assert!(matches!(err, IngestError::EmptyDataFrame { .. }));
}
