//! Threshold calibration over labelled name pairs.

use serde::{Deserialize, Serialize};

use super::score_names;

/// A declared name, a candidate column, and whether they refer to the same variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledPair {
    pub declared: String,
    pub candidate: String,
    pub expected: bool,
}

impl LabelledPair {
    pub fn new(declared: impl Into<String>, candidate: impl Into<String>, expected: bool) -> Self {
        Self {
            declared: declared.into(),
            candidate: candidate.into(),
            expected,
        }
    }
}

/// A pair the threshold classified wrongly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Misclassified {
    pub pair: LabelledPair,
    pub score: f64,
}

/// Confusion counts for one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub threshold: f64,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub misclassified: Vec<Misclassified>,
}

impl CalibrationReport {
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Fraction classified correctly; 1.0 for an empty pair set.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        (self.true_positives + self.true_negatives) as f64 / total as f64
    }

    pub fn is_clean(&self) -> bool {
        self.misclassified.is_empty()
    }
}

/// Classifies every pair with `score >= threshold` and tallies the result.
pub fn calibrate(pairs: &[LabelledPair], threshold: f64) -> CalibrationReport {
    let mut report = CalibrationReport {
        threshold,
        true_positives: 0,
        true_negatives: 0,
        false_positives: 0,
        false_negatives: 0,
        misclassified: Vec::new(),
    };

    for pair in pairs {
        let score = score_names(&pair.declared, &pair.candidate).score;
        let accepted = score >= threshold;
        match (accepted, pair.expected) {
            (true, true) => report.true_positives += 1,
            (false, false) => report.true_negatives += 1,
            (true, false) => report.false_positives += 1,
            (false, true) => report.false_negatives += 1,
        }
        if accepted != pair.expected {
            tracing::debug!(
                declared = %pair.declared,
                candidate = %pair.candidate,
                score,
                expected = pair.expected,
                "misclassified pair"
            );
            report.misclassified.push(Misclassified {
                pair: pair.clone(),
                score,
            });
        }
    }
    report
}

/// Runs [`calibrate`] for each threshold, in the order given.
pub fn sweep(pairs: &[LabelledPair], thresholds: &[f64]) -> Vec<CalibrationReport> {
    thresholds.iter().map(|&t| calibrate(pairs, t)).collect()
}

/// Held-out pairs drawn from real sheet/column disagreements: renamed headers,
/// plural and typo variants that should match, and near neighbours that must not.
pub fn default_holdout() -> Vec<LabelledPair> {
    vec![
        LabelledPair::new("Household  Income ", "household_income", true),
        LabelledPair::new("NO2 (mean)", "no2_mean", true),
        LabelledPair::new("pm10_mean", "pm10_means", true),
        LabelledPair::new("Median Age", "median_ages", true),
        LabelledPair::new("Population density", "population_densty", true),
        LabelledPair::new("pm10_mean", "pm25_mean", false),
        LabelledPair::new("Income Score", "imd_inc", false),
        LabelledPair::new("green_space_access", "blue_space_access", false),
    ]
}
