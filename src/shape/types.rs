use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// One record of a query result: field name → scalar.
pub type RawRow = Map<String, Value>;

/// Value key of the default (empty) config and of histogram/pie output.
pub const DEFAULT_VALUE_KEY: &str = "value";
/// Axis key of the default (empty) config.
pub const DEFAULT_LABEL_KEY: &str = "label";
/// Axis key of histogram and pie output.
pub const NAME_KEY: &str = "name";
/// Base name of the synthesized 1-based sequence axis.
pub const INDEX_KEY: &str = "index";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Area,
}

impl ChartKind {
    /// Kinds plotting series over an x domain; these may pivot and are x-ordered.
    pub fn plots_series(self) -> bool { !matches!(self, ChartKind::Pie) }

    /// Kinds that degrade to a category frequency histogram when no numeric field exists.
    pub fn counts_categories(self) -> bool { matches!(self, ChartKind::Bar | ChartKind::Pie) }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
        }
    }
}

impl Display for ChartKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ChartKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "pie" => Ok(ChartKind::Pie),
            "area" => Ok(ChartKind::Area),
            other => Err(AppError::user("unknown_chart_kind".to_string(), format!("unknown chart kind '{}'", other))),
        }
    }
}

/// Fields of each row plotted as value series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataKeys {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    /// Series beyond primary/secondary (extra numeric columns, or categories past the
    /// first two after a pivot).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<String>,
}

impl DataKeys {
    pub fn primary(key: impl Into<String>) -> Self {
        Self { primary: key.into(), secondary: None, additional: Vec::new() }
    }

    /// All series keys in plotting order.
    pub fn series(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str())
            .chain(self.secondary.as_deref())
            .chain(self.additional.iter().map(String::as_str))
    }
}

/// Canonical shaped output handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataConfig {
    /// Rows in plotted order.
    pub data: Vec<RawRow>,
    pub data_keys: DataKeys,
    pub x_axis_key: String,
}

impl Default for ChartDataConfig {
    fn default() -> Self {
        Self { data: Vec::new(), data_keys: DataKeys::primary(DEFAULT_VALUE_KEY), x_axis_key: DEFAULT_LABEL_KEY.to_string() }
    }
}

/// Keys suggested by the caller (e.g. a conversational flow). Used on the already-wide
/// path when present in the result; an absent hinted key triggers fallback search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeHints {
    #[serde(default)]
    pub x_axis_key: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub secondary_key: Option<String>,
}

impl ShapeHints {
    pub fn is_empty(&self) -> bool {
        self.x_axis_key.is_none() && self.primary_key.is_none() && self.secondary_key.is_none()
    }
}
