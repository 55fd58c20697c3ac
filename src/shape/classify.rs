//! Schema classification from a single sample row.

use serde_json::Value;

use super::types::RawRow;
use super::values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Numeric,
    Categorical,
}

impl FieldClass {
    pub fn of(v: &Value) -> Self {
        if values::is_numeric_like(v) { FieldClass::Numeric } else { FieldClass::Categorical }
    }
}

/// Field names of the sample row split by class; every list keeps the row's field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldClasses {
    pub fields: Vec<String>,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FieldClasses {
    pub fn of(sample: &RawRow) -> Self {
        let mut out = FieldClasses::default();
        for (name, v) in sample.iter() {
            out.fields.push(name.clone());
            match FieldClass::of(v) {
                FieldClass::Numeric => out.numeric.push(name.clone()),
                FieldClass::Categorical => out.categorical.push(name.clone()),
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn is_numeric(&self, field: &str) -> bool { self.numeric.iter().any(|f| f == field) }

    pub fn contains(&self, field: &str) -> bool { self.fields.iter().any(|f| f == field) }
}

/// Classify the first row of `rows`; an empty row set yields empty lists.
pub fn classify(rows: &[RawRow]) -> FieldClasses {
    rows.first().map(FieldClasses::of).unwrap_or_default()
}
