//! Declarative per-category extraction rules.

use std::collections::BTreeMap;

use recon_model::Category;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

fn default_name_field() -> String {
    "name".to_string()
}

/// How to turn one category's metadata sheet into variable records.
///
/// Field names refer to headers after normalization and renaming, so a rule
/// written against `"Variable Name"` and one written against `variable_name`
/// behave the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    pub category: Category,
    /// Source name of the sheet this rule reads.
    pub sheet: String,
    /// Leading data rows to drop (sub-headers, notes) before extraction.
    #[serde(default)]
    pub skip_rows: usize,
    /// Source header to target field.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Extra fields copied into the record's attributes.
    #[serde(default)]
    pub keep: Vec<String>,
    /// Fields whose gaps inherit the previous non-missing value.
    #[serde(default)]
    pub forward_fill: Vec<String>,
    /// Prepended to the raw name before normalization.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_name_field")]
    pub name_field: String,
    #[serde(default)]
    pub type_field: Option<String>,
    #[serde(default)]
    pub source_field: Option<String>,
    /// Source recorded on every record when no `source_field` is given.
    #[serde(default)]
    pub source: Option<String>,
}

impl CategoryRule {
    pub fn new(category: Category, sheet: impl Into<String>) -> Self {
        Self {
            category,
            sheet: sheet.into(),
            skip_rows: 0,
            rename: BTreeMap::new(),
            keep: Vec::new(),
            forward_fill: Vec::new(),
            prefix: None,
            name_field: default_name_field(),
            type_field: None,
            source_field: None,
            source: None,
        }
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_type_field(mut self, field: impl Into<String>) -> Self {
        self.type_field = Some(field.into());
        self
    }

    pub fn with_keep(mut self, field: impl Into<String>) -> Self {
        self.keep.push(field.into());
        self
    }

    pub fn with_forward_fill(mut self, field: impl Into<String>) -> Self {
        self.forward_fill.push(field.into());
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Maps a normalized header to its target field.
    pub(crate) fn target_field(&self, header: &str) -> String {
        self.rename
            .iter()
            .find(|(from, _)| normalize(from) == header)
            .map(|(_, to)| normalize(to))
            .unwrap_or_else(|| header.to_string())
    }

    /// Every field the rule reads, normalized and deduplicated, name field first.
    pub(crate) fn required_fields(&self) -> Vec<String> {
        let mut fields = vec![normalize(&self.name_field)];
        let optional = self
            .type_field
            .iter()
            .chain(self.source_field.iter())
            .chain(self.keep.iter())
            .chain(self.forward_fill.iter());
        for field in optional {
            let field = normalize(field);
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    /// Builds the declared name from a raw sheet value.
    pub fn declared_name(&self, raw: &str) -> String {
        match &self.prefix {
            Some(prefix) => normalize(&format!("{prefix}{raw}")),
            None => normalize(raw),
        }
    }
}
