//! Left-to-right ordering of shaped rows by their x-axis value.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::debug;

use super::types::RawRow;
use super::values;

/// Pairwise x-axis comparison: nulls last, dates by instant, then strings
/// lexicographically, then numbers numerically, otherwise by string representation.
pub fn compare_axis_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        (true, true) => return Ordering::Equal,
        _ => {}
    }
    if let (Some(x), Some(y)) = (values::temporal_ms(a), values::temporal_ms(b)) {
        return x.cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => x.to_string().cmp(&y.to_string()),
        },
        _ => values::value_to_string(a).cmp(&values::value_to_string(b)),
    }
}

/// How a whole column is ordered. Picking one mode per column keeps the sort a total
/// order even when the pairwise rules above would disagree across mixed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisMode {
    Temporal,
    Lexicographic,
    Numeric,
    Textual,
}

fn axis_mode<'a>(vals: impl Iterator<Item = &'a Value> + Clone) -> AxisMode {
    if vals.clone().all(|v| values::temporal_ms(v).is_some()) {
        AxisMode::Temporal
    } else if vals.clone().all(Value::is_string) {
        AxisMode::Lexicographic
    } else if vals.clone().all(Value::is_number) {
        AxisMode::Numeric
    } else {
        AxisMode::Textual
    }
}

fn compare_in_mode(mode: AxisMode, a: &Value, b: &Value) -> Ordering {
    match mode {
        AxisMode::Temporal => values::temporal_ms(a).cmp(&values::temporal_ms(b)),
        AxisMode::Lexicographic => a.as_str().cmp(&b.as_str()),
        AxisMode::Numeric => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (x, y) => x.is_none().cmp(&y.is_none()),
        },
        AxisMode::Textual => values::value_to_string(a).cmp(&values::value_to_string(b)),
    }
}

/// Stable sort of `rows` by `x_key`. Rows with a null or missing x value go last in
/// their original order.
pub fn sort_by_axis(rows: &mut [RawRow], x_key: &str) {
    let present = rows.iter().filter_map(|r| r.get(x_key)).filter(|v| !v.is_null());
    let mode = axis_mode(present);
    debug!(target: "querychart::shape", x=%x_key, mode=?mode, rows=rows.len(), "ordering rows by x axis");
    rows.sort_by(|ra, rb| {
        let a = ra.get(x_key).filter(|v| !v.is_null());
        let b = rb.get(x_key).filter(|v| !v.is_null());
        match (a, b) {
            (Some(a), Some(b)) => compare_in_mode(mode, a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}
