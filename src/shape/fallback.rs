//! Degenerate-input handling: category frequency histogram for rows without any
//! numeric field.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::classify::FieldClasses;
use super::select::{name_has_token, pick};
use super::types::{ChartDataConfig, DataKeys, RawRow, DEFAULT_VALUE_KEY, NAME_KEY};
use super::values;
use super::pivot::UNKNOWN_CATEGORY;

/// Count occurrences of each distinct value of the best categorical field.
/// Output is `[{name, value: count}]` in first-seen order.
pub(crate) fn frequency_histogram(rows: &[RawRow], classes: &FieldClasses) -> ChartDataConfig {
    let field = pick(
        &classes.categorical,
        &[
            &|f| name_has_token(f, &["value"]),
            &|f| name_has_token(f, &["name"]),
            &|f| name_has_token(f, &["category"]),
        ],
    )
    .or_else(|| classes.categorical.last());
    let Some(field) = field else {
        return ChartDataConfig::default();
    };

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in rows {
        let label = row.get(field).and_then(values::label_of).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        let n = counts.entry(label.clone()).or_insert(0);
        if *n == 0 {
            order.push(label);
        }
        *n += 1;
    }
    debug!(target: "querychart::shape", field=%field, buckets=order.len(), "no numeric field; counting categories");

    let data = order
        .into_iter()
        .map(|name| {
            let count = counts.get(&name).copied().unwrap_or(0);
            let mut out = RawRow::new();
            out.insert(NAME_KEY.to_string(), Value::String(name));
            out.insert(DEFAULT_VALUE_KEY.to_string(), Value::from(count));
            out
        })
        .collect();
    ChartDataConfig { data, data_keys: DataKeys::primary(DEFAULT_VALUE_KEY), x_axis_key: NAME_KEY.to_string() }
}
