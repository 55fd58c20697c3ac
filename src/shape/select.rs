//! Axis & series selection for already-wide rows, plus the rule helpers the other
//! stages use for their own candidate chains.
//!
//! Every "try A, else B, else C" choice is written as an ordered slice of rules; the
//! first rule producing a candidate wins.

use serde_json::Value;
use tracing::debug;

use super::classify::FieldClasses;
use super::types::{ChartDataConfig, DataKeys, RawRow, ShapeHints, INDEX_KEY};

/// A predicate over a field name.
pub(crate) type FieldRule<'a> = &'a dyn Fn(&str) -> bool;

/// A rule that may produce a field name on its own.
pub(crate) type KeyRule<'a> = &'a dyn Fn() -> Option<String>;

/// First candidate accepted by the earliest rule that accepts any candidate.
pub(crate) fn pick<'c>(candidates: &'c [String], rules: &[FieldRule<'_>]) -> Option<&'c String> {
    rules.iter().find_map(|rule| candidates.iter().find(|c| rule(c.as_str())))
}

/// Result of the earliest rule that yields a key.
pub(crate) fn first_some(rules: &[KeyRule<'_>]) -> Option<String> {
    rules.iter().find_map(|rule| rule())
}

/// Case-insensitive substring match against any of `tokens`.
pub(crate) fn name_has_token(name: &str, tokens: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    tokens.iter().any(|t| lower.contains(t))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XAxis {
    Field(String),
    /// Synthesized 1-based sequence under the given key.
    Index(String),
}

impl XAxis {
    pub(crate) fn key(&self) -> &str {
        match self {
            XAxis::Field(k) | XAxis::Index(k) => k,
        }
    }

    pub(crate) fn field(&self) -> Option<&str> {
        match self {
            XAxis::Field(k) => Some(k),
            XAxis::Index(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub keys: DataKeys,
    pub x_axis: XAxis,
}

impl Selection {
    /// Build the config from wide rows, adding the synthesized index when needed.
    pub(crate) fn apply(self, rows: Vec<RawRow>) -> ChartDataConfig {
        let data = match &self.x_axis {
            XAxis::Field(_) => rows,
            XAxis::Index(key) => rows
                .into_iter()
                .enumerate()
                .map(|(i, mut row)| {
                    row.insert(key.clone(), Value::from(i as u64 + 1));
                    row
                })
                .collect(),
        };
        ChartDataConfig { data, data_keys: self.keys, x_axis_key: self.x_axis.key().to_string() }
    }
}

/// Choose primary/secondary/additional series and the x axis for wide rows.
/// `None` means no usable key exists (a hinted key was absent and nothing of the same
/// class can stand in for it).
pub(crate) fn select_wide(classes: &FieldClasses, hints: &ShapeHints) -> Option<Selection> {
    // A hinted x axis present in the result is never a series, even when numeric
    let reserved_x = hints.x_axis_key.as_deref().filter(|k| classes.contains(k));
    let numeric: Vec<String> = classes.numeric.iter().filter(|f| Some(f.as_str()) != reserved_x).cloned().collect();

    let primary = select_primary(classes, &numeric, hints, reserved_x)?;
    let secondary = select_secondary(&numeric, hints, &primary);
    let x_axis = select_x_axis(classes, hints, &primary, secondary.as_deref())?;
    let additional: Vec<String> = numeric
        .iter()
        .filter(|f| **f != primary && Some(*f) != secondary.as_ref() && x_axis.field() != Some(f.as_str()))
        .cloned()
        .collect();
    debug!(target: "querychart::shape", primary=%primary, secondary=?secondary, additional=?additional, x=%x_axis.key(), "wide selection");
    Some(Selection { keys: DataKeys { primary, secondary, additional }, x_axis })
}

fn select_primary(classes: &FieldClasses, numeric: &[String], hints: &ShapeHints, reserved_x: Option<&str>) -> Option<String> {
    let first_numeric = || numeric.first().cloned();
    let free = |f: &&String| Some(f.as_str()) != reserved_x;
    match hints.primary_key.as_deref() {
        Some(hinted) if numeric.iter().any(|f| f == hinted) => Some(hinted.to_string()),
        Some(hinted) => {
            debug!(target: "querychart::shape", "hinted primary '{}' unusable; searching numeric fields", hinted);
            first_some(&[&first_numeric])
        }
        None => first_some(&[
            &first_numeric,
            &|| classes.fields.get(1).filter(free).cloned(),
            &|| classes.fields.iter().find(free).cloned(),
        ]),
    }
}

fn select_secondary(numeric: &[String], hints: &ShapeHints, primary: &str) -> Option<String> {
    first_some(&[
        &|| hints.secondary_key.clone().filter(|k| k != primary && numeric.contains(k)),
        &|| numeric.iter().find(|f| f.as_str() != primary).cloned(),
    ])
}

fn select_x_axis(classes: &FieldClasses, hints: &ShapeHints, primary: &str, secondary: Option<&str>) -> Option<XAxis> {
    let categorical_other = || classes.categorical.iter().find(|f| f.as_str() != primary).cloned();
    match hints.x_axis_key.as_deref() {
        Some(hinted) if classes.contains(hinted) && hinted != primary && Some(hinted) != secondary => {
            Some(XAxis::Field(hinted.to_string()))
        }
        Some(hinted) => {
            debug!(target: "querychart::shape", "hinted x axis '{}' unusable; searching categorical fields", hinted);
            first_some(&[&categorical_other]).map(XAxis::Field)
        }
        None => Some(categorical_other().map(XAxis::Field).unwrap_or_else(|| XAxis::Index(index_key(classes)))),
    }
}

/// `index`, prefixed with underscores until it does not clash with a result field.
fn index_key(classes: &FieldClasses) -> String {
    let mut key = INDEX_KEY.to_string();
    while classes.contains(&key) {
        key.insert(0, '_');
    }
    key
}

#[cfg(test)]
#[path = "select_tests.rs"]
mod select_tests;
