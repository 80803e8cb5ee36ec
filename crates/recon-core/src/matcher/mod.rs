//! Fuzzy matching of declared variable names onto dataset columns.
//!
//! The matcher scores a declared name against every candidate column with
//! [`score_names`], keeps the best one when it clears the acceptance
//! threshold, and flags ties instead of silently resolving them. An
//! [`OverrideTable`] short-circuits scoring for names a reviewer has pinned.
//!
//! # Example
//!
//! ```
//! use recon_core::matcher::{FuzzyMatcher, MatchOutcome, OverrideTable};
//!
//! let overrides: OverrideTable = [("Income Score", "imd_inc")].into_iter().collect();
//! let matcher = FuzzyMatcher::new(0.9).unwrap().with_overrides(overrides);
//! let columns = ["median_age", "imd_inc"];
//!
//! assert!(matches!(matcher.match_name("Median Age", columns), MatchOutcome::Matched { .. }));
//! assert_eq!(
//!     matcher.match_name("Income Score", columns).matched(),
//!     Some(("imd_inc", 1.0))
//! );
//! ```

mod calibrate;
mod overrides;
mod score;

use std::cmp::Ordering;

pub use calibrate::{
    CalibrationReport, LabelledPair, Misclassified, calibrate, default_holdout, sweep,
};
pub use overrides::OverrideTable;
pub use score::{
    DIGIT_MISMATCH_PENALTY, NameScore, ScoreComponent, TOKEN_NO_OVERLAP_PENALTY, score_names,
};

use crate::error::MatchError;

/// Default acceptance threshold, validated against [`default_holdout`].
pub const DEFAULT_THRESHOLD: f64 = 0.90;
/// Scores closer than this are treated as tied.
pub const TIE_EPSILON: f64 = 1e-9;

/// Result of matching one declared name.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Forced by the override table; scoring was skipped.
    Override { column: String },
    /// Single best candidate at or above the threshold.
    Matched { column: String, score: NameScore },
    /// Several candidates share the top score. `chosen` is the lexicographically
    /// first and is provisional until a reviewer adds an override.
    Ambiguous {
        chosen: String,
        tied: Vec<String>,
        score: f64,
    },
    /// Nothing reached the threshold; `best` is the closest candidate, if any.
    NoMatch { best: Option<(String, f64)> },
}

impl MatchOutcome {
    /// The matched column and its score. Overrides report a score of 1.0.
    pub fn matched(&self) -> Option<(&str, f64)> {
        match self {
            Self::Override { column } => Some((column, 1.0)),
            Self::Matched { column, score } => Some((column, score.score)),
            Self::Ambiguous { chosen, score, .. } => Some((chosen, *score)),
            Self::NoMatch { .. } => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }
}

/// Deterministic fuzzy matcher with an acceptance threshold and override table.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    threshold: f64,
    overrides: OverrideTable,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            overrides: OverrideTable::default(),
        }
    }
}

impl FuzzyMatcher {
    /// Creates a matcher. The threshold must lie in `(0, 1]`.
    pub fn new(threshold: f64) -> Result<Self, MatchError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(MatchError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            overrides: OverrideTable::default(),
        })
    }

    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Scores every candidate, best first. Equal scores are ordered by name.
    pub fn rank<I, S>(&self, declared: &str, candidates: I) -> Vec<(String, NameScore)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = candidates
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        names.sort();
        names.dedup();

        let mut ranked: Vec<(String, NameScore)> = names
            .into_iter()
            .map(|name| {
                let score = score_names(declared, &name);
                (name, score)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }

    /// Matches one declared name against the candidate columns.
    pub fn match_name<I, S>(&self, declared: &str, candidates: I) -> MatchOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(forced) = self.overrides.get(declared) {
            tracing::debug!(declared, column = forced, "override applied");
            return MatchOutcome::Override {
                column: forced.to_string(),
            };
        }

        let ranked = self.rank(declared, candidates);
        let Some((best_name, best_score)) = ranked.first() else {
            return MatchOutcome::NoMatch { best: None };
        };
        let best = best_score.score;

        if best < self.threshold {
            tracing::debug!(
                declared,
                best = %best_name,
                score = best,
                threshold = self.threshold,
                "no candidate above threshold"
            );
            return MatchOutcome::NoMatch {
                best: Some((best_name.clone(), best)),
            };
        }

        let tied: Vec<String> = ranked
            .iter()
            .take_while(|(_, s)| (best - s.score).abs() <= TIE_EPSILON)
            .map(|(name, _)| name.clone())
            .collect();

        if tied.len() > 1 {
            tracing::warn!(
                declared,
                candidates = ?tied,
                score = best,
                "ambiguous match needs an override"
            );
            return MatchOutcome::Ambiguous {
                chosen: tied[0].clone(),
                tied,
                score: best,
            };
        }

        MatchOutcome::Matched {
            column: best_name.clone(),
            score: best_score.clone(),
        }
    }
}
