//! Scalar helpers shared by the shaping stages: numeric coercion, label rendering,
//! temporal parsing and row normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};

use super::types::{RawRow, DEFAULT_LABEL_KEY, DEFAULT_VALUE_KEY};

/// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

const MONTHS: [(&str, &str); 12] = [
    ("jan", "january"),
    ("feb", "february"),
    ("mar", "march"),
    ("apr", "april"),
    ("may", "may"),
    ("jun", "june"),
    ("jul", "july"),
    ("aug", "august"),
    ("sep", "september"),
    ("oct", "october"),
    ("nov", "november"),
    ("dec", "december"),
];

/// Turn collaborator rows into records. Objects pass through; bare scalars are
/// wrapped as `{label: "Item N", value: <scalar>}`.
pub fn normalize_rows(rows: &[Value]) -> Vec<RawRow> {
    rows.iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Object(m) => m.clone(),
            other => {
                let mut m = Map::new();
                m.insert(DEFAULT_LABEL_KEY.to_string(), Value::String(format!("Item {}", i + 1)));
                m.insert(DEFAULT_VALUE_KEY.to_string(), other.clone());
                m
            }
        })
        .collect()
}

/// Parse a value as a number: JSON numbers, or non-empty strings that parse to a finite f64.
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() { return None; }
    // f64::from_str accepts "inf"/"nan"; only finite values count
    t.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[inline]
pub fn is_numeric_like(v: &Value) -> bool { as_number(v).is_some() }

/// Numeric JSON value for `v`. JSON numbers are returned untouched so integer
/// payloads stay integers; numeric strings are converted.
pub fn numeric_value(v: &Value) -> Option<Value> {
    match v {
        Value::Number(_) => Some(v.clone()),
        Value::String(s) => parse_number(s).and_then(number_from_f64),
        _ => None,
    }
}

fn number_from_f64(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        Some(Value::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}

#[inline]
pub fn zero() -> Value { Value::from(0) }

/// String representation used for grouping keys and lexicographic comparison.
#[inline]
pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        _ => v.to_string(),
    }
}

/// Display label for a value; `None` for null and blank strings.
pub fn label_of(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => Some(value_to_string(other)),
    }
}

/// Epoch milliseconds for string values that read as a date; numbers never do.
pub fn temporal_ms(v: &Value) -> Option<i64> {
    match v {
        Value::String(s) => parse_temporal_ms(s),
        _ => None,
    }
}

/// Accepts RFC 3339, ISO date-times with `T` or space, `YYYY-MM-DD`, `YYYY/MM/DD`,
/// `MM/DD/YYYY`, `YYYY-MM`, bare four-digit years and English month names with an
/// optional year. Values without a timezone are taken as UTC.
pub fn parse_temporal_ms(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() { return None; }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(utc_ms(ndt));
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            return day_ms(nd);
        }
    }
    if let Some(ms) = parse_year_month(s) { return Some(ms); }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).and_then(day_ms);
    }
    parse_month_name(s)
}

fn utc_ms(ndt: NaiveDateTime) -> i64 {
    DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc).timestamp_millis()
}

fn day_ms(nd: NaiveDate) -> Option<i64> {
    nd.and_hms_opt(0, 0, 0).map(utc_ms)
}

// YYYY-MM
fn parse_year_month(s: &str) -> Option<i64> {
    let (y, m) = s.split_once('-')?;
    if y.len() != 4 || m.is_empty() || m.len() > 2 { return None; }
    if !y.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) { return None; }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1).and_then(day_ms)
}

// "Jan", "January", "Jan 2024", "2024 Jan", "Jan-2024"; year defaults to 1970
fn parse_month_name(s: &str) -> Option<i64> {
    let lower = s.to_ascii_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == '-' || c == '/' || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() || tokens.len() > 2 { return None; }
    let mut month: Option<u32> = None;
    let mut year: Option<i32> = None;
    for t in tokens {
        if let Some(idx) = MONTHS.iter().position(|(short, long)| t == *short || t == *long || (t.len() >= 3 && long.starts_with(t))) {
            if month.replace(idx as u32 + 1).is_some() { return None; }
        } else if t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()) {
            if year.replace(t.parse().ok()?).is_some() { return None; }
        } else {
            return None;
        }
    }
    NaiveDate::from_ymd_opt(year.unwrap_or(1970), month?, 1).and_then(day_ms)
}

#[cfg(test)]
#[path = "values_tests.rs"]
mod values_tests;
