//!
//! querychart shaping engine
//! -------------------------
//! Turns an arbitrary, schema-less query result into a `ChartDataConfig` for one of
//! the four chart kinds. Nothing about the columns is known up front; everything is
//! inferred from the first row.
//!
//! Pipeline (all pure, never fails):
//! 1. normalize rows (bare scalars become `{label, value}` records)
//! 2. classify the sample row into numeric-like / categorical-like fields
//! 3. no numeric field on bar/pie → category frequency histogram
//! 4. pie → `{name, value}` slices
//! 5. line/area/bar → pivot long/grouped rows, or select axis/series on wide rows,
//!    then coerce missing series cells and order rows by x
//!
//! Anything that cannot be shaped yields the default empty config
//! (`data: []`, `dataKeys: {primary: "value"}`, `xAxisKey: "label"`).

use serde_json::Value;
use tracing::debug;

mod adapter;
pub mod classify;
mod fallback;
pub mod order;
mod pivot;
mod select;
mod types;
pub mod values;

pub use classify::{FieldClass, FieldClasses};
pub use order::compare_axis_values;
pub use types::{
    ChartDataConfig, ChartKind, DataKeys, RawRow, ShapeHints, DEFAULT_LABEL_KEY, DEFAULT_VALUE_KEY, INDEX_KEY, NAME_KEY,
};

/// Shape `rows` for `kind` with no caller hints.
pub fn shape(rows: &[Value], kind: ChartKind) -> ChartDataConfig {
    shape_with_hints(rows, kind, &ShapeHints::default())
}

/// Shape `rows` for `kind`, honoring `hints` on already-wide rows.
pub fn shape_with_hints(rows: &[Value], kind: ChartKind, hints: &ShapeHints) -> ChartDataConfig {
    let rows = values::normalize_rows(rows);
    let classes = classify::classify(&rows);
    if classes.is_empty() {
        debug!(target: "querychart::shape", rows=rows.len(), "nothing to shape; default config");
        return ChartDataConfig::default();
    }
    if classes.numeric.is_empty() && kind.counts_categories() {
        return fallback::frequency_histogram(&rows, &classes);
    }
    if !kind.plots_series() {
        return adapter::to_pie(&rows, &classes, hints);
    }

    let mut config = match pivot::detect(&classes, &rows[0]) {
        Some(plan) => {
            if !hints.is_empty() {
                debug!(target: "querychart::shape", hints=?hints, "hints ignored for long/grouped rows");
            }
            pivot::pivot(&rows, &plan).into_config()
        }
        None => match select::select_wide(&classes, hints) {
            Some(selection) => selection.apply(rows),
            None => {
                debug!(target: "querychart::shape", kind=%kind, "no usable axis/series keys; default config");
                return ChartDataConfig::default();
            }
        },
    };
    adapter::conform(&mut config);
    order::sort_by_axis(&mut config.data, &config.x_axis_key);
    config
}

#[cfg(test)]
#[path = "shape_tests.rs"]
mod shape_tests;
