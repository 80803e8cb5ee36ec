//! Integration tests for labelled pair loading.

use std::io::Write;

use recon_cli::pairs::read_labelled_pairs;
use recon_core::matcher::{LabelledPair, calibrate};
use tempfile::NamedTempFile;

fn create_temp_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn test_read_labelled_pairs() {
    let file = create_temp_csv(
        "Declared,Candidate,Expected\n\
         Median Age,median_age,true\n\
         Population Density,pop_density,yes\n\
         Income Score,imd_inc,no\n",
    );

    let pairs = read_labelled_pairs(file.path()).unwrap();

    assert_eq!(
        pairs,
        vec![
            LabelledPair::new("Median Age", "median_age", true),
            LabelledPair::new("Population Density", "pop_density", true),
            LabelledPair::new("Income Score", "imd_inc", false),
        ]
    );
}

#[test]
fn test_read_labelled_pairs_rejects_bad_label() {
    let file = create_temp_csv("declared,candidate,expected\nMedian Age,median_age,perhaps\n");

    let err = read_labelled_pairs(file.path()).unwrap_err();
    assert!(err.to_string().contains("row 1"));
}

#[test]
fn test_read_labelled_pairs_requires_columns() {
    let file = create_temp_csv("declared,candidate\nMedian Age,median_age\n");

    assert!(read_labelled_pairs(file.path()).is_err());
}

#[test]
fn test_identical_names_calibrate_cleanly() {
    let file = create_temp_csv(
        "declared,candidate,expected\n\
         Median Age,median_age,true\n\
         Income Score,imd_inc,false\n",
    );
    let pairs = read_labelled_pairs(file.path()).unwrap();

    let report = calibrate(&pairs, 0.9);
    assert!(report.is_clean());
    assert_eq!(report.true_positives, 1);
    assert_eq!(report.true_negatives, 1);
}
