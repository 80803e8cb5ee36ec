//! Column-name canonicalization.
//!
//! Every header that enters the pipeline goes through [`normalize`] so that
//! `"Household  Income "`, `"household income"` and `"HOUSEHOLD_INCOME"` all
//! name the same column.

use recon_model::{ModelError, Table};

/// Canonical form of a raw column name.
///
/// Applied in order: whitespace runs collapse to one space, the ends are
/// trimmed, the text is lower-cased, spaces become underscores and parenthesis
/// characters are removed. Any other character passes through unchanged.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace(' ', "_")
        .replace(['(', ')'], "")
}

/// Non-empty `_`-separated tokens of the normalized name.
pub fn tokens(name: &str) -> Vec<String> {
    normalize(name)
        .split('_')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Digit runs of a name, in order (`"pm2_5_2019"` gives `["2", "5", "2019"]`).
pub fn digit_runs(name: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for ch in name.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Returns a copy of `table` whose headers are normalized.
///
/// Two headers that collapse to the same canonical name are reported as
/// [`ModelError::DuplicateColumn`] instead of one silently shadowing the other.
pub fn normalize_table_columns(table: &Table) -> Result<Table, ModelError> {
    let renamed = table.rename_columns(normalize)?;
    for (raw, canonical) in table.columns().iter().zip(renamed.columns()) {
        if raw != canonical {
            tracing::trace!(table = table.name(), raw = %raw, canonical = %canonical, "normalized column");
        }
    }
    Ok(renamed)
}
