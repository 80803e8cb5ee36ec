//! Similarity scoring between a declared variable name and a column name.
//!
//! Uses Jaro-Winkler similarity on normalized names as the base, with
//! multiplicative adjustments for digit and token disagreement.

use std::collections::BTreeSet;

use rapidfuzz::distance::jaro_winkler;

use crate::normalize::{digit_runs, normalize, tokens};

/// Applied when the names carry different digit runs (`pm10` vs `pm25`).
pub const DIGIT_MISMATCH_PENALTY: f64 = 0.8;
/// Applied when the names share no token at all.
pub const TOKEN_NO_OVERLAP_PENALTY: f64 = 0.6;

/// Score for a single declared-name / column pair.
#[derive(Debug, Clone, PartialEq)]
pub struct NameScore {
    /// Final score in `[0, 1]`.
    pub score: f64,
    /// True when the normalized names are identical.
    pub exact: bool,
    /// Breakdown of score components for review output.
    pub explanation: Vec<ScoreComponent>,
}

impl NameScore {
    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        self.explanation
            .iter()
            .map(|c| format!("{}: {:.0}%", c.name, c.value * 100.0))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A component contributing to the final score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComponent {
    pub name: &'static str,
    /// Base similarity, or the multiplier applied for an adjustment.
    pub value: f64,
    pub description: String,
}

/// Scores `candidate` as a match for `declared`.
pub fn score_names(declared: &str, candidate: &str) -> NameScore {
    let left = normalize(declared);
    let right = normalize(candidate);

    if left == right {
        return NameScore {
            score: 1.0,
            exact: true,
            explanation: vec![ScoreComponent {
                name: "Exact match",
                value: 1.0,
                description: format!("'{declared}' and '{candidate}' normalize to '{left}'"),
            }],
        };
    }

    let base = jaro_winkler::similarity(left.chars(), right.chars());
    let mut components = vec![ScoreComponent {
        name: "Name similarity",
        value: base,
        description: format!("'{left}' vs '{right}'"),
    }];
    let mut score = base;

    let left_digits = digit_runs(&left);
    let right_digits = digit_runs(&right);
    if left_digits != right_digits {
        score *= DIGIT_MISMATCH_PENALTY;
        components.push(ScoreComponent {
            name: "Digit mismatch",
            value: DIGIT_MISMATCH_PENALTY,
            description: format!("{left_digits:?} vs {right_digits:?}"),
        });
    }

    let left_tokens: BTreeSet<String> = tokens(&left).into_iter().collect();
    let right_tokens: BTreeSet<String> = tokens(&right).into_iter().collect();
    if left_tokens.is_disjoint(&right_tokens) {
        score *= TOKEN_NO_OVERLAP_PENALTY;
        components.push(ScoreComponent {
            name: "No shared token",
            value: TOKEN_NO_OVERLAP_PENALTY,
            description: "names share no '_'-separated token".to_string(),
        });
    }

    NameScore {
        score: score.clamp(0.0, 1.0),
        exact: false,
        explanation: components,
    }
}
