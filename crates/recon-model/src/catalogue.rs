//! Variable catalogue types.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Thematic category a declared variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sociodemographic,
    Environmental,
    Outcomes,
    Auxiliary,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Sociodemographic,
        Category::Environmental,
        Category::Outcomes,
        Category::Auxiliary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sociodemographic => "sociodemographic",
            Self::Environmental => "environmental",
            Self::Outcomes => "outcomes",
            Self::Auxiliary => "auxiliary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a record's `resolved_column` was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Not yet matched against a dataset.
    #[default]
    Pending,
    /// Normalized names are identical.
    Exact,
    /// Accepted fuzzy match above the threshold.
    Fuzzy,
    /// Forced by the override table.
    Override,
    /// Tied top candidates; left unresolved until overridden.
    Ambiguous,
    /// No candidate reached the threshold.
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Exact | Self::Fuzzy | Self::Override)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Override => "override",
            Self::Ambiguous => "ambiguous",
            Self::Unresolved => "unresolved",
        }
    }
}

/// One declared dataset variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    /// Canonical identifier (normalized, category prefix applied).
    pub declared_name: String,
    pub category: Category,
    pub data_type: Option<String>,
    /// Publisher or dataset the variable comes from.
    pub source: Option<String>,
    /// Column in the reconciled dataset, or `None` when unmatched.
    pub resolved_column: Option<String>,
    pub match_confidence: Option<f64>,
    pub resolution: Resolution,
    /// Extra descriptive fields kept by the category rule (description, links, year).
    pub attributes: BTreeMap<String, String>,
}

impl VariableRecord {
    pub fn new(declared_name: impl Into<String>, category: Category) -> Self {
        Self {
            declared_name: declared_name.into(),
            category,
            data_type: None,
            source: None,
            resolved_column: None,
            match_confidence: None,
            resolution: Resolution::Pending,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> (Category, &str) {
        (self.category, self.declared_name.as_str())
    }
}

/// Variable records, unique by `(declared_name, category)`, in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableCatalogue {
    records: Vec<VariableRecord>,
    #[serde(skip)]
    keys: BTreeSet<(Category, String)>,
}

impl VariableCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record. A record with the same key is rejected and handed back.
    pub fn insert(&mut self, record: VariableRecord) -> Result<(), VariableRecord> {
        let key = (record.category, record.declared_name.clone());
        if !self.keys.insert(key) {
            return Err(record);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn contains(&self, category: Category, declared_name: &str) -> bool {
        self.keys.contains(&(category, declared_name.to_string()))
    }

    pub fn get(&self, category: Category, declared_name: &str) -> Option<&VariableRecord> {
        self.records
            .iter()
            .find(|r| r.category == category && r.declared_name == declared_name)
    }

    pub fn records(&self) -> &[VariableRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut VariableRecord> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &VariableRecord> {
        self.records.iter().filter(move |r| r.category == category)
    }

    /// Counts records per resolution method.
    pub fn resolution_counts(&self) -> BTreeMap<Resolution, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.resolution).or_insert(0) += 1;
        }
        counts
    }

    /// Rebuilds the key index after deserialization.
    pub fn reindex(&mut self) {
        self.keys = self
            .records
            .iter()
            .map(|r| (r.category, r.declared_name.clone()))
            .collect();
    }
}

impl FromIterator<VariableRecord> for VariableCatalogue {
    /// Collects records, keeping the first of any duplicate keys.
    fn from_iter<I: IntoIterator<Item = VariableRecord>>(iter: I) -> Self {
        let mut catalogue = Self::new();
        for record in iter {
            let _ = catalogue.insert(record);
        }
        catalogue
    }
}
