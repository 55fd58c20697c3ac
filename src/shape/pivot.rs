//! Long/grouped detection and long → wide pivot.
//!
//! Rows shaped like `{month, type, count}` (one row per x value × category) are turned
//! into one row per x value with one column per category. Categories keep first-seen
//! order; a category missing from an x group is filled with 0.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::classify::FieldClasses;
use super::select::{name_has_token, pick, FieldRule};
use super::types::{ChartDataConfig, DataKeys, RawRow};
use super::values;

pub(crate) const TEMPORAL_TOKENS: &[&str] = &["month", "date", "time", "year", "day", "week", "quarter"];
pub(crate) const GROUPING_TOKENS: &[&str] = &["type", "category", "status", "group", "name"];

/// Category label used when a row has no value in the grouping field.
pub(crate) const UNKNOWN_CATEGORY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PivotPlan {
    pub x: String,
    pub group: String,
    pub value: String,
}

/// Decide whether rows are long/grouped: at least two categorical fields and at least
/// one numeric field.
pub(crate) fn detect(classes: &FieldClasses, sample: &RawRow) -> Option<PivotPlan> {
    if classes.categorical.len() < 2 || classes.numeric.is_empty() {
        return None;
    }
    let is_temporal: FieldRule = &|f| {
        sample.get(f).and_then(values::temporal_ms).is_some() || name_has_token(f, TEMPORAL_TOKENS)
    };
    let x = pick(&classes.categorical, &[is_temporal, &|_| true])?.clone();

    let rest: Vec<String> = classes.categorical.iter().filter(|f| **f != x).cloned().collect();
    let group = pick(&rest, &[&|f| name_has_token(f, GROUPING_TOKENS), &|_| true])?.clone();

    let value = classes.numeric.first()?.clone();
    debug!(target: "querychart::shape", x=%x, group=%group, value=%value, "long/grouped rows detected");
    Some(PivotPlan { x, group, value })
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pivoted {
    pub rows: Vec<RawRow>,
    /// Distinct categories in first-seen order.
    pub categories: Vec<String>,
    pub x: String,
}

impl Pivoted {
    /// The first two categories become primary/secondary; the rest are additional series.
    pub(crate) fn into_config(self) -> ChartDataConfig {
        let mut cats = self.categories.into_iter();
        let primary = cats.next().unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        let secondary = cats.next();
        let additional: Vec<String> = cats.collect();
        ChartDataConfig { data: self.rows, data_keys: DataKeys { primary, secondary, additional }, x_axis_key: self.x }
    }
}

struct Group {
    x_value: Value,
    cells: HashMap<String, Value>,
}

pub(crate) fn pivot(rows: &[RawRow], plan: &PivotPlan) -> Pivoted {
    let mut groups: Vec<Group> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut categories: Vec<String> = Vec::new();

    for row in rows {
        let x_value = row.get(&plan.x).cloned().unwrap_or(Value::Null);
        // JSON text keeps 1 and "1" (or null and "null") in separate groups
        let x_key = x_value.to_string();
        let mut category = row
            .get(&plan.group)
            .and_then(values::label_of)
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        if category == plan.x {
            // keep the axis column intact
            category = format!("{} ({})", category, plan.group);
        }
        let value = row.get(&plan.value).and_then(values::numeric_value).unwrap_or_else(values::zero);

        if !categories.contains(&category) {
            categories.push(category.clone());
        }
        let gi = *group_index.entry(x_key).or_insert_with(|| {
            groups.push(Group { x_value, cells: HashMap::new() });
            groups.len() - 1
        });
        // duplicate (x, category) pairs: last row wins
        groups[gi].cells.insert(category, value);
    }

    let rows: Vec<RawRow> = groups
        .into_iter()
        .map(|mut g| {
            let mut out = RawRow::new();
            out.insert(plan.x.clone(), g.x_value);
            for cat in &categories {
                out.insert(cat.clone(), g.cells.remove(cat).unwrap_or_else(values::zero));
            }
            out
        })
        .collect();
    debug!(target: "querychart::shape", groups=rows.len(), categories=categories.len(), "pivoted long rows to wide");
    Pivoted { rows, categories, x: plan.x.clone() }
}

#[cfg(test)]
#[path = "pivot_tests.rs"]
mod pivot_tests;
