//! Catalogue resolution against the merged columns and gap detection.
//!
//! Problems found here are collected into a [`GapReport`] rather than failing
//! the run; the caller decides whether the report blocks loading.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use recon_model::{Category, Resolution, VariableCatalogue};
use serde::{Deserialize, Serialize};

use crate::matcher::{FuzzyMatcher, MatchOutcome};
use crate::metadata::DuplicateDeclaration;
use crate::normalize::normalize;

/// Columns exempt from needing a catalogue record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapPolicy {
    pub key_columns: Vec<String>,
    /// Intentionally undocumented columns (geometry, helper fields).
    pub allow_list: Vec<String>,
}

impl GapPolicy {
    pub fn is_exempt(&self, column: &str) -> bool {
        let column = normalize(column);
        self.key_columns
            .iter()
            .chain(&self.allow_list)
            .any(|c| normalize(c) == column)
    }
}

/// A catalogue after matching, with the matcher outcome for each record.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub catalogue: VariableCatalogue,
    outcomes: Vec<MatchOutcome>,
}

impl Resolved {
    /// Wraps a catalogue whose records were resolved elsewhere.
    pub fn from_catalogue(catalogue: VariableCatalogue) -> Self {
        Self {
            catalogue,
            outcomes: Vec::new(),
        }
    }

    /// Matcher outcome for the record at `index`, when matching ran here.
    pub fn outcome(&self, index: usize) -> Option<&MatchOutcome> {
        self.outcomes.get(index)
    }
}

/// Matches every record's declared name against `columns`.
///
/// Records end up with a `resolved_column` that is a real column or `None`.
/// Override targets may use the raw header spelling and are stored as the
/// merged column they normalize to. An override pointing at a column the
/// dataset lacks leaves the record unresolved, and so does an ambiguous tie.
pub fn resolve_catalogue(
    catalogue: &VariableCatalogue,
    columns: &[String],
    matcher: &FuzzyMatcher,
) -> Resolved {
    let mut resolved = catalogue.clone();
    let mut outcomes = Vec::with_capacity(catalogue.len());

    for record in resolved.records_mut() {
        let outcome = matcher.match_name(&record.declared_name, columns);
        let (column, confidence, resolution) = match &outcome {
            MatchOutcome::Override { column } => match find_column(columns, column) {
                Some(real) => (Some(real.to_string()), Some(1.0), Resolution::Override),
                None => {
                    tracing::warn!(
                        declared_name = %record.declared_name,
                        column = %column,
                        "override points at a column the dataset does not have"
                    );
                    (None, None, Resolution::Unresolved)
                }
            },
            MatchOutcome::Matched { column, score } => {
                let resolution = if score.exact {
                    Resolution::Exact
                } else {
                    tracing::debug!(
                        declared_name = %record.declared_name,
                        column = %column,
                        score = score.score,
                        explanation = %score.explain(),
                        "fuzzy match accepted"
                    );
                    Resolution::Fuzzy
                };
                (Some(column.clone()), Some(score.score), resolution)
            }
            MatchOutcome::Ambiguous { .. } => (None, None, Resolution::Ambiguous),
            MatchOutcome::NoMatch { .. } => (None, None, Resolution::Unresolved),
        };
        record.resolved_column = column;
        record.match_confidence = confidence;
        record.resolution = resolution;
        outcomes.push(outcome);
    }

    let counts = resolved.resolution_counts();
    tracing::info!(
        records = resolved.len(),
        exact = counts.get(&Resolution::Exact).copied().unwrap_or(0),
        fuzzy = counts.get(&Resolution::Fuzzy).copied().unwrap_or(0),
        overrides = counts.get(&Resolution::Override).copied().unwrap_or(0),
        ambiguous = counts.get(&Resolution::Ambiguous).copied().unwrap_or(0),
        unresolved = counts.get(&Resolution::Unresolved).copied().unwrap_or(0),
        "resolved catalogue"
    );

    Resolved {
        catalogue: resolved,
        outcomes,
    }
}

/// Looks `target` up among `columns`, verbatim first and then by normalized name.
fn find_column<'a>(columns: &'a [String], target: &str) -> Option<&'a str> {
    if let Some(column) = columns.iter().find(|c| *c == target) {
        return Some(column);
    }
    let target = normalize(target);
    columns
        .iter()
        .find(|c| normalize(c) == target)
        .map(String::as_str)
}

/// Kind of reconciliation gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// A data column no record resolves to.
    UndocumentedColumn,
    /// A record without a column.
    UnresolvedVariable,
    /// A record whose top candidates tied.
    AmbiguousMatch,
    /// A record pointing at a column the dataset does not have.
    StaleResolution,
    /// Several records resolve to the same column.
    DuplicateResolution,
    /// A record declared more than once in the metadata.
    DuplicateDeclaration,
}

impl GapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UndocumentedColumn => "undocumented_column",
            Self::UnresolvedVariable => "unresolved_variable",
            Self::AmbiguousMatch => "ambiguous_match",
            Self::StaleResolution => "stale_resolution",
            Self::DuplicateResolution => "duplicate_resolution",
            Self::DuplicateDeclaration => "duplicate_declaration",
        }
    }
}

impl fmt::Display for GapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciliation problem for manual review.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gap {
    pub kind: GapKind,
    pub category: Option<Category>,
    pub declared_name: Option<String>,
    pub column: Option<String>,
    pub detail: String,
}

impl From<&DuplicateDeclaration> for Gap {
    fn from(dup: &DuplicateDeclaration) -> Self {
        Gap {
            kind: GapKind::DuplicateDeclaration,
            category: Some(dup.category),
            declared_name: Some(dup.declared_name.clone()),
            column: None,
            detail: format!("declared again in sheet '{}' row {}", dup.sheet, dup.row),
        }
    }
}

/// Every gap found in one run, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    gaps: Vec<Gap>,
}

impl GapReport {
    pub fn new(mut gaps: Vec<Gap>) -> Self {
        gaps.sort();
        gaps.dedup();
        Self { gaps }
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn of_kind(&self, kind: GapKind) -> impl Iterator<Item = &Gap> {
        self.gaps.iter().filter(move |g| g.kind == kind)
    }

    pub fn counts(&self) -> BTreeMap<GapKind, usize> {
        let mut counts = BTreeMap::new();
        for gap in &self.gaps {
            *counts.entry(gap.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Checks the resolved catalogue against the dataset columns.
///
/// Every non-exempt column needs exactly one record, and every record needs a
/// real column.
pub fn find_gaps(resolved: &Resolved, columns: &[String], policy: &GapPolicy) -> Vec<Gap> {
    let present: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
    let mut gaps = Vec::new();
    let mut claims: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (idx, record) in resolved.catalogue.records().iter().enumerate() {
        let outcome = resolved.outcome(idx);
        match &record.resolved_column {
            Some(column) if present.contains(column.as_str()) => {
                claims
                    .entry(column.as_str())
                    .or_default()
                    .push(record.declared_name.as_str());
            }
            Some(column) => gaps.push(Gap {
                kind: GapKind::StaleResolution,
                category: Some(record.category),
                declared_name: Some(record.declared_name.clone()),
                column: Some(column.clone()),
                detail: "resolved column is not in the dataset".to_string(),
            }),
            None if record.resolution == Resolution::Ambiguous => {
                let (column, detail) = match outcome {
                    Some(MatchOutcome::Ambiguous { chosen, tied, score }) => (
                        Some(chosen.clone()),
                        format!("tied at {score:.3} between {}", tied.join(", ")),
                    ),
                    _ => (None, "tied candidates".to_string()),
                };
                gaps.push(Gap {
                    kind: GapKind::AmbiguousMatch,
                    category: Some(record.category),
                    declared_name: Some(record.declared_name.clone()),
                    column,
                    detail,
                });
            }
            None => {
                let (column, detail) = match outcome {
                    Some(MatchOutcome::NoMatch {
                        best: Some((best, score)),
                    }) => (
                        Some(best.clone()),
                        format!("closest candidate scored {score:.3}"),
                    ),
                    Some(MatchOutcome::Override { column }) => (
                        Some(column.clone()),
                        "override target is not in the dataset".to_string(),
                    ),
                    _ => (None, "no candidate columns".to_string()),
                };
                gaps.push(Gap {
                    kind: GapKind::UnresolvedVariable,
                    category: Some(record.category),
                    declared_name: Some(record.declared_name.clone()),
                    column,
                    detail,
                });
            }
        }
    }

    for (column, names) in &claims {
        if names.len() > 1 {
            gaps.push(Gap {
                kind: GapKind::DuplicateResolution,
                category: None,
                declared_name: None,
                column: Some(column.to_string()),
                detail: format!("claimed by {}", names.join(", ")),
            });
        }
    }

    for column in columns {
        if policy.is_exempt(column) || claims.contains_key(column.as_str()) {
            continue;
        }
        gaps.push(Gap {
            kind: GapKind::UndocumentedColumn,
            category: None,
            declared_name: None,
            column: Some(column.clone()),
            detail: "no catalogue record resolves to this column".to_string(),
        });
    }

    for gap in &gaps {
        tracing::warn!(
            kind = %gap.kind,
            declared_name = gap.declared_name.as_deref().unwrap_or(""),
            column = gap.column.as_deref().unwrap_or(""),
            detail = %gap.detail,
            "reconciliation gap"
        );
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{DEFAULT_THRESHOLD, OverrideTable, score_names};
    use recon_model::VariableRecord;

    fn columns() -> Vec<String> {
        ["lsoa21cd", "population_density", "median_age", "imd_inc"]
            .map(String::from)
            .to_vec()
    }

    fn catalogue() -> VariableCatalogue {
        ["population_density", "median_age", "income_score"]
            .into_iter()
            .map(|n| VariableRecord::new(n, Category::Sociodemographic))
            .collect()
    }

    fn policy() -> GapPolicy {
        GapPolicy {
            key_columns: vec!["lsoa21cd".to_string()],
            allow_list: Vec::new(),
        }
    }

    #[test]
    fn unmatched_record_and_orphan_column_are_both_gaps() {
        let resolved = resolve_catalogue(&catalogue(), &columns(), &FuzzyMatcher::default());
        let report = GapReport::new(find_gaps(&resolved, &columns(), &policy()));

        let kinds: Vec<GapKind> = report.gaps().iter().map(|g| g.kind).collect();
        assert_eq!(kinds, vec![GapKind::UndocumentedColumn, GapKind::UnresolvedVariable]);
        assert_eq!(report.gaps()[0].column.as_deref(), Some("imd_inc"));
        assert_eq!(report.gaps()[1].declared_name.as_deref(), Some("income_score"));
    }

    #[test]
    fn override_closes_all_gaps() {
        let overrides: OverrideTable = [("Income Score", "imd_inc")].into_iter().collect();
        let matcher = FuzzyMatcher::default().with_overrides(overrides);
        let resolved = resolve_catalogue(&catalogue(), &columns(), &matcher);

        assert!(find_gaps(&resolved, &columns(), &policy()).is_empty());
        let income = resolved
            .catalogue
            .get(Category::Sociodemographic, "income_score")
            .unwrap();
        assert_eq!(income.resolution, Resolution::Override);
        assert_eq!(income.resolved_column.as_deref(), Some("imd_inc"));
    }

    #[test]
    fn dangling_override_stays_unresolved() {
        let overrides: OverrideTable = [("income_score", "imd_income")].into_iter().collect();
        let matcher = FuzzyMatcher::default().with_overrides(overrides);
        let resolved = resolve_catalogue(&catalogue(), &columns(), &matcher);
        let income = resolved
            .catalogue
            .get(Category::Sociodemographic, "income_score")
            .unwrap();
        assert_eq!(income.resolved_column, None);

        let gaps = find_gaps(&resolved, &columns(), &policy());
        let unresolved: Vec<&Gap> = gaps
            .iter()
            .filter(|g| g.kind == GapKind::UnresolvedVariable)
            .collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].column.as_deref(), Some("imd_income"));
    }

    #[test]
    fn near_miss_name_resolves_as_fuzzy() {
        let catalogue: VariableCatalogue = ["population_densty", "median_age"]
            .into_iter()
            .map(|n| VariableRecord::new(n, Category::Sociodemographic))
            .collect();
        let columns: Vec<String> = ["lsoa21cd", "population_density", "median_age"]
            .map(String::from)
            .to_vec();
        let resolved = resolve_catalogue(&catalogue, &columns, &FuzzyMatcher::default());

        let density = resolved
            .catalogue
            .get(Category::Sociodemographic, "population_densty")
            .unwrap();
        assert_eq!(density.resolution, Resolution::Fuzzy);
        assert_eq!(density.resolved_column.as_deref(), Some("population_density"));
        let expected = score_names("population_densty", "population_density").score;
        assert_eq!(density.match_confidence, Some(expected));
        assert!(expected >= DEFAULT_THRESHOLD && expected < 1.0, "got {expected}");
        assert!(matches!(
            resolved.outcome(0),
            Some(MatchOutcome::Matched { column, .. }) if column == "population_density"
        ));

        assert!(find_gaps(&resolved, &columns, &policy()).is_empty());
    }

    #[test]
    fn tied_candidates_stay_unresolved_until_overridden() {
        let catalogue: VariableCatalogue = [VariableRecord::new("no2", Category::Environmental)]
            .into_iter()
            .collect();
        let columns: Vec<String> = ["no2_a", "no2_b"].map(String::from).to_vec();

        let resolved = resolve_catalogue(&catalogue, &columns, &FuzzyMatcher::default());
        let record = &resolved.catalogue.records()[0];
        assert_eq!(record.resolution, Resolution::Ambiguous);
        assert_eq!(record.resolved_column, None);
        assert_eq!(record.match_confidence, None);

        let report = GapReport::new(find_gaps(&resolved, &columns, &GapPolicy::default()));
        let gaps: Vec<(GapKind, Option<&str>)> = report
            .gaps()
            .iter()
            .map(|g| (g.kind, g.column.as_deref()))
            .collect();
        assert_eq!(
            gaps,
            vec![
                (GapKind::UndocumentedColumn, Some("no2_a")),
                (GapKind::UndocumentedColumn, Some("no2_b")),
                (GapKind::AmbiguousMatch, Some("no2_a")),
            ]
        );
        let ambiguous = report.of_kind(GapKind::AmbiguousMatch).next().unwrap();
        assert!(ambiguous.detail.contains("no2_a, no2_b"), "{}", ambiguous.detail);

        let overrides: OverrideTable = [("no2", "no2_a")].into_iter().collect();
        let matcher = FuzzyMatcher::default().with_overrides(overrides);
        let resolved = resolve_catalogue(&catalogue, &columns, &matcher);
        assert_eq!(resolved.catalogue.records()[0].resolution, Resolution::Override);
        let gaps = find_gaps(&resolved, &columns, &GapPolicy::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, GapKind::UndocumentedColumn);
        assert_eq!(gaps[0].column.as_deref(), Some("no2_b"));
    }

    #[test]
    fn override_may_name_the_raw_header() {
        let overrides: OverrideTable = [("Income Score", "IMD_Inc")].into_iter().collect();
        let matcher = FuzzyMatcher::default().with_overrides(overrides);
        let resolved = resolve_catalogue(&catalogue(), &columns(), &matcher);

        let income = resolved
            .catalogue
            .get(Category::Sociodemographic, "income_score")
            .unwrap();
        assert_eq!(income.resolution, Resolution::Override);
        assert_eq!(income.resolved_column.as_deref(), Some("imd_inc"));
        assert!(find_gaps(&resolved, &columns(), &policy()).is_empty());
    }

    #[test]
    fn two_records_on_one_column_are_flagged() {
        let catalogue: VariableCatalogue = [
            VariableRecord::new("median_age", Category::Sociodemographic),
            VariableRecord::new("median_age", Category::Auxiliary),
        ]
        .into_iter()
        .collect();
        let columns = vec!["median_age".to_string()];
        let resolved = resolve_catalogue(&catalogue, &columns, &FuzzyMatcher::default());
        let gaps = find_gaps(&resolved, &columns, &GapPolicy::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, GapKind::DuplicateResolution);
    }

    #[test]
    fn stale_resolution_is_reported() {
        let mut record = VariableRecord::new("no2_mean", Category::Environmental);
        record.resolved_column = Some("no2_mean".to_string());
        record.resolution = Resolution::Exact;
        let resolved = Resolved::from_catalogue([record].into_iter().collect());
        let gaps = find_gaps(&resolved, &["so2_mean".to_string()], &GapPolicy::default());
        let kinds: BTreeSet<GapKind> = gaps.iter().map(|g| g.kind).collect();
        assert!(kinds.contains(&GapKind::StaleResolution));
        assert!(kinds.contains(&GapKind::UndocumentedColumn));
    }

    #[test]
    fn allow_list_suppresses_undocumented_columns() {
        let policy = GapPolicy {
            key_columns: vec!["LSOA21CD".to_string()],
            allow_list: vec!["geometry".to_string()],
        };
        let resolved = Resolved::from_catalogue(VariableCatalogue::new());
        let columns = vec!["lsoa21cd".to_string(), "geometry".to_string()];
        assert!(find_gaps(&resolved, &columns, &policy).is_empty());
    }

    #[test]
    fn gap_report_counts_by_kind() {
        let dup = DuplicateDeclaration {
            category: Category::Auxiliary,
            declared_name: "pen_portrait".to_string(),
            sheet: "aux_meta".to_string(),
            row: 3,
        };
        let report = GapReport::new(vec![Gap::from(&dup), Gap::from(&dup)]);
        assert_eq!(report.len(), 1);
        assert_eq!(report.counts().get(&GapKind::DuplicateDeclaration), Some(&1));
        insta::assert_snapshot!(report.gaps()[0].detail.as_str(), @"declared again in sheet 'aux_meta' row 3");
    }
}
