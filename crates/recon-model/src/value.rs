//! Typed cell values.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell in a [`Table`](crate::Table) or [`MergedRow`](crate::MergedRow).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Shape in well-known text form. Never interpreted by the core.
    Geometry(String),
}

/// The kind of a non-missing cell. Used for join-key compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Boolean,
    Geometry,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Geometry => "geometry",
        }
    }

    /// Widens two kinds seen in the same column. Integers and floats mix to float;
    /// any other mix has no common kind.
    pub fn unify(self, other: ValueKind) -> Option<ValueKind> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Self::Integer, Self::Float) | (Self::Float, Self::Integer) => Some(Self::Float),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Missing => None,
            Self::Text(_) => Some(ValueKind::Text),
            Self::Integer(_) => Some(ValueKind::Integer),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Boolean(_) => Some(ValueKind::Boolean),
            Self::Geometry(_) => Some(ValueKind::Geometry),
        }
    }

    /// Renders the value the way it is written to delimited output.
    ///
    /// Missing values render as an empty string. Floats drop trailing zeros
    /// (`40.0` renders as `40`).
    pub fn render(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(value) | Self::Geometry(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => format_numeric(*value),
            Self::Boolean(value) => value.to_string(),
        }
    }

    /// Canonical key form for hashing in joins. Returns `None` for missing values,
    /// which never match anything.
    pub fn key_repr(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Text(value) => Some(value.trim().to_string()),
            other => Some(other.render()),
        }
    }

    /// Total ordering used by the sort stage. Missing values sort after everything
    /// else; numbers compare numerically across integer and float.
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Greater,
            (_, Self::Missing) => Ordering::Less,
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) | (Self::Geometry(a), Self::Geometry(b)) => a.cmp(b),
            (a, b) => kind_rank(a).cmp(&kind_rank(b)),
        }
    }
}

fn kind_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Boolean(_) => 0,
        CellValue::Integer(_) | CellValue::Float(_) => 1,
        CellValue::Text(_) => 2,
        CellValue::Geometry(_) => 3,
        CellValue::Missing => 4,
    }
}

/// Formats a float without trailing zeros after the decimal point.
pub fn format_numeric(value: f64) -> String {
    let s = format!("{value}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() || trimmed == "-" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        s
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}
