//! Chart-kind adaptation of the generic config.
//!
//! Line/area/bar keep the generic shape; `conform` only guarantees that every row
//! carries the axis and every series key. Pie is rebuilt as `{name, value}` slices.

use serde_json::Value;
use tracing::debug;

use super::classify::FieldClasses;
use super::select::{first_some, select_wide};
use super::types::{ChartDataConfig, DataKeys, RawRow, ShapeHints, DEFAULT_VALUE_KEY, NAME_KEY};
use super::values;

/// Field names that label a pie slice, after a literal `label` field. Matched exactly.
const PIE_LABEL_NAMES: &[&str] = &["name", "category", "status", "type"];

/// Fill series keys missing or null in a row with 0 and a missing axis value with null.
pub(crate) fn conform(config: &mut ChartDataConfig) {
    let series: Vec<String> = config.data_keys.series().map(str::to_string).collect();
    let mut patched = 0usize;
    for row in config.data.iter_mut() {
        if !row.contains_key(&config.x_axis_key) {
            row.insert(config.x_axis_key.clone(), Value::Null);
            patched += 1;
        }
        for key in &series {
            if row.get(key).map_or(true, Value::is_null) {
                row.insert(key.clone(), values::zero());
                patched += 1;
            }
        }
    }
    if patched > 0 {
        debug!(target: "querychart::shape", patched, "coerced missing series/axis cells");
    }
}

/// Pie slices: `{name: <label or "Slice N">, value: <primary numeric>}`.
pub(crate) fn to_pie(rows: &[RawRow], classes: &FieldClasses, hints: &ShapeHints) -> ChartDataConfig {
    let Some(selection) = select_wide(classes, hints) else {
        return ChartDataConfig::default();
    };
    let value_key = selection.keys.primary;
    let x_axis = selection.x_axis.field().map(str::to_string);

    let not_value = |f: &str| f != value_key;
    let named = |name: &str| classes.fields.iter().find(|f| f.as_str() == name && not_value(f.as_str())).cloned();

    let label_key = first_some(&[
        &|| std::iter::once("label").chain(PIE_LABEL_NAMES.iter().copied()).find_map(&named),
        &|| x_axis.clone().filter(|x| not_value(x.as_str())),
        &|| classes.categorical.iter().find(|f| not_value(f.as_str())).cloned(),
    ]);
    debug!(target: "querychart::shape", value=%value_key, label=?label_key, "pie slices");

    let data = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let name = label_key
                .as_ref()
                .and_then(|k| row.get(k))
                .and_then(values::label_of)
                .unwrap_or_else(|| format!("Slice {}", i + 1));
            let value = row.get(&value_key).and_then(values::numeric_value).unwrap_or_else(values::zero);
            let mut out = RawRow::new();
            out.insert(NAME_KEY.to_string(), Value::String(name));
            out.insert(DEFAULT_VALUE_KEY.to_string(), value);
            out
        })
        .collect();
    ChartDataConfig { data, data_keys: DataKeys::primary(DEFAULT_VALUE_KEY), x_axis_key: NAME_KEY.to_string() }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod adapter_tests;
