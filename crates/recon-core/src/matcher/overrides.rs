use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

/// Manual `declared_name -> forced_column` table consulted before fuzzy scoring.
///
/// Keys are stored normalized so `"Income Score"` and `"income_score"` address
/// the same entry. Forced columns are kept verbatim here; catalogue resolution
/// accepts them in raw header or normalized spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct OverrideTable {
    entries: BTreeMap<String, String>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an override. Returns the previous forced column, if any.
    pub fn insert(
        &mut self,
        declared_name: &str,
        forced_column: impl Into<String>,
    ) -> Option<String> {
        self.entries
            .insert(normalize(declared_name), forced_column.into())
    }

    pub fn get(&self, declared_name: &str) -> Option<&str> {
        self.entries
            .get(&normalize(declared_name))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for OverrideTable {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<OverrideTable> for BTreeMap<String, String> {
    fn from(table: OverrideTable) -> Self {
        table.entries
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (declared, forced) in iter {
            table.insert(declared.as_ref(), forced);
        }
        table
    }
}
