//! Run configuration loaded from TOML.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MatchError};
use crate::matcher::{DEFAULT_THRESHOLD, FuzzyMatcher, OverrideTable};
use crate::merge::JoinSpec;
use crate::metadata::CategoryRule;
use crate::normalize::normalize;
use crate::partition::{DEFAULT_MAX_ROWS_PER_CHUNK, DEFAULT_SIZE_CEILING_BYTES};
use crate::reconcile::GapPolicy;

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS_PER_CHUNK
}

fn default_ceiling() -> u64 {
    DEFAULT_SIZE_CEILING_BYTES
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_year_column() -> String {
    "year".to_string()
}

fn default_stem() -> String {
    "reconciled".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// One input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Name the rest of the configuration refers to.
    pub name: String,
    pub path: PathBuf,
    /// Lines above the header row.
    #[serde(default)]
    pub skip_rows: usize,
    /// Edition year, for yearly primary datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
}

/// Input files grouped by role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sources {
    /// Editions of the primary dataset. Several editions need a year each.
    #[serde(default)]
    pub primary: Vec<SourceConfig>,
    #[serde(default)]
    pub lookups: Vec<SourceConfig>,
    #[serde(default)]
    pub metadata: Vec<SourceConfig>,
}

impl Sources {
    pub fn all(&self) -> impl Iterator<Item = &SourceConfig> {
        self.primary
            .iter()
            .chain(&self.lookups)
            .chain(&self.metadata)
    }
}

/// Where and under which name outputs are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// File stem for partitions and the catalogue.
    #[serde(default = "default_stem")]
    pub stem: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            stem: default_stem(),
        }
    }
}

/// Everything one reconciliation run needs besides the tables themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    #[serde(default = "default_max_rows")]
    pub max_rows_per_chunk: usize,
    #[serde(default = "default_ceiling")]
    pub size_ceiling_bytes: u64,
    #[serde(default = "default_threshold")]
    pub match_threshold: f64,
    /// Declared name to forced column.
    #[serde(default)]
    pub overrides: OverrideTable,
    #[serde(default)]
    pub key_columns: Vec<String>,
    /// Columns allowed to exist without a catalogue record.
    #[serde(default)]
    pub allow_list: Vec<String>,
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    #[serde(default)]
    pub sort_keys: Vec<String>,
    #[serde(default)]
    pub require_total_order: bool,
    /// Columns holding WKT shapes; never need a catalogue record.
    #[serde(default)]
    pub geometry_columns: Vec<String>,
    #[serde(default = "default_year_column")]
    pub year_column: String,
    #[serde(default)]
    pub sources: Sources,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_rows_per_chunk: default_max_rows(),
            size_ceiling_bytes: default_ceiling(),
            match_threshold: default_threshold(),
            overrides: OverrideTable::default(),
            key_columns: Vec::new(),
            allow_list: Vec::new(),
            categories: Vec::new(),
            joins: Vec::new(),
            sort_keys: Vec::new(),
            require_total_order: false,
            geometry_columns: Vec::new(),
            year_column: default_year_column(),
            sources: Sources::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ReconcileConfig {
    /// Parses and validates a TOML document. Relative paths are left as written.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file; relative source and output paths resolve against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!(path = %path.display(), sources = config.sources.all().count(), "loaded config");
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let sources = self
            .sources
            .primary
            .iter_mut()
            .chain(&mut self.sources.lookups)
            .chain(&mut self.sources.metadata);
        for source in sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        if self.output.directory.is_relative() {
            self.output.directory = base.join(&self.output.directory);
        }
    }

    /// Rejects settings no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rows_per_chunk == 0 {
            return Err(invalid("max_rows_per_chunk must be greater than zero"));
        }
        if self.size_ceiling_bytes == 0 {
            return Err(invalid("size_ceiling_bytes must be greater than zero"));
        }
        if !(self.match_threshold > 0.0 && self.match_threshold <= 1.0) {
            return Err(invalid(format!(
                "match_threshold must be in (0, 1], got {}",
                self.match_threshold
            )));
        }

        let mut categories = BTreeSet::new();
        for rule in &self.categories {
            if !categories.insert(rule.category) {
                return Err(invalid(format!(
                    "more than one rule for category '{}'",
                    rule.category
                )));
            }
        }

        for join in &self.joins {
            if join.keys.is_empty() || join.keys.iter().any(|k| normalize(k).is_empty()) {
                return Err(invalid(format!(
                    "join with lookup '{}' has no usable key columns",
                    join.lookup
                )));
            }
        }

        let mut names = BTreeSet::new();
        for source in self.sources.all() {
            if !names.insert(source.name.as_str()) {
                return Err(invalid(format!("source name '{}' is used twice", source.name)));
            }
        }

        let primary = &self.sources.primary;
        if primary.len() > 1 {
            let mut years = BTreeSet::new();
            for edition in primary {
                match edition.year {
                    Some(year) if years.insert(year) => {}
                    Some(year) => {
                        return Err(invalid(format!("edition year {year} is listed twice")));
                    }
                    None => {
                        return Err(invalid(format!(
                            "primary source '{}' needs a year when several editions are given",
                            edition.name
                        )));
                    }
                }
            }
        }

        if !self.sources.lookups.is_empty() {
            for join in &self.joins {
                if !self.sources.lookups.iter().any(|s| s.name == join.lookup) {
                    return Err(invalid(format!(
                        "join refers to unknown lookup source '{}'",
                        join.lookup
                    )));
                }
            }
        }
        if !self.sources.metadata.is_empty() {
            for rule in &self.categories {
                if !self.sources.metadata.iter().any(|s| s.name == rule.sheet) {
                    return Err(invalid(format!(
                        "category '{}' reads unknown metadata source '{}'",
                        rule.category, rule.sheet
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn matcher(&self) -> Result<FuzzyMatcher, MatchError> {
        Ok(FuzzyMatcher::new(self.match_threshold)?.with_overrides(self.overrides.clone()))
    }

    /// Key columns plus the allow-list and geometry columns.
    pub fn gap_policy(&self) -> GapPolicy {
        GapPolicy {
            key_columns: self.key_columns.iter().map(|k| normalize(k)).collect(),
            allow_list: self
                .allow_list
                .iter()
                .chain(&self.geometry_columns)
                .map(|c| normalize(c))
                .collect(),
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
