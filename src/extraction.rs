//! Turning heterogeneous records into clean numeric samples.
//!
//! Every analyzer reads its inputs through this module so that the rules for
//! what counts as a number are identical everywhere:
//!
//! - finite numbers are kept
//! - strings that parse (after trimming) to a finite number are kept when
//!   [`EngineConfig::accept_numeric_strings`] is set
//! - booleans, nulls, missing fields, empty strings, NaN and ±∞ are dropped
//!
//! Dropped rows are counted and reported, never silently discarded. A field
//! whose every row is dropped fails with [`AnalysisError::NonNumericField`].

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::{AnalysisError, AnalysisResult};

/// A single cell value in a record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    /// JSON null or an explicitly absent value
    Null,
    /// Boolean flag
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Free text
    Text(String),
}

impl FieldValue {
    /// Coerce to a finite number according to the extraction rules.
    pub fn to_finite(&self, accept_numeric_strings: bool) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            FieldValue::Text(s) if accept_numeric_strings => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    /// Label used when this value is a grouping key; `None` for null.
    pub fn as_group_label(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Number(v) => Some(v.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// A flat record: field name to value. Fields not named by an analysis are ignored.
pub type Record = BTreeMap<String, FieldValue>;

/// Build a [`Record`] from `(field, value)` pairs.
///
/// ```rust
/// use analytics_engine::extraction::{record, FieldValue};
///
/// let row = record([("revenue", FieldValue::from(12.5)), ("region", "EU".into())]);
/// assert_eq!(row["revenue"], FieldValue::Number(12.5));
/// ```
pub fn record<K, I>(fields: I) -> Record
where
    K: Into<String>,
    I: IntoIterator<Item = (K, FieldValue)>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// A single numeric field extracted from a set of records.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ExtractedSample {
    /// Finite values in record order
    pub values: Vec<f64>,
    /// Records whose value was missing or non-numeric
    pub dropped_rows: usize,
}

/// Two fields extracted with pairwise-complete deletion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ExtractedPairs {
    /// First field's values
    pub x: Vec<f64>,
    /// Second field's values, aligned with `x`
    pub y: Vec<f64>,
    /// Records where either field was missing or non-numeric
    pub dropped_rows: usize,
}

/// A labeled sample compared against other groups.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Group {
    /// Group label
    pub label: String,
    /// Observations
    pub values: Vec<f64>,
}

impl Group {
    /// Create a group from a label and values.
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

fn field_value(record: &Record, field: &str, accept_numeric_strings: bool) -> Option<f64> {
    record
        .get(field)
        .and_then(|value| value.to_finite(accept_numeric_strings))
}

/// Extract one numeric field from every record.
pub fn extract_sample(
    records: &[Record],
    field: &str,
    config: &EngineConfig,
) -> AnalysisResult<ExtractedSample> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| field_value(r, field, config.accept_numeric_strings))
        .collect();
    let dropped_rows = records.len() - values.len();

    if values.is_empty() {
        return Err(AnalysisError::NonNumericField {
            field: field.to_string(),
            dropped_rows,
        });
    }
    if dropped_rows > 0 {
        log::warn!(
            "Dropped {} of {} rows with non-numeric '{}'",
            dropped_rows,
            records.len(),
            field
        );
    }

    Ok(ExtractedSample {
        values,
        dropped_rows,
    })
}

/// Extract two fields, keeping only rows where both are numeric.
///
/// Fails with [`AnalysisError::NonNumericField`] naming the first field that
/// has no numeric value in any row, or the pair if no row has both.
pub fn extract_pairs(
    records: &[Record],
    x_field: &str,
    y_field: &str,
    config: &EngineConfig,
) -> AnalysisResult<ExtractedPairs> {
    let accept = config.accept_numeric_strings;
    let mut x = Vec::with_capacity(records.len());
    let mut y = Vec::with_capacity(records.len());
    let mut x_seen = false;
    let mut y_seen = false;

    for r in records {
        let xv = field_value(r, x_field, accept);
        let yv = field_value(r, y_field, accept);
        x_seen |= xv.is_some();
        y_seen |= yv.is_some();
        if let (Some(xv), Some(yv)) = (xv, yv) {
            x.push(xv);
            y.push(yv);
        }
    }
    let dropped_rows = records.len() - x.len();

    if x.is_empty() {
        let field = match (x_seen, y_seen) {
            (false, _) => x_field.to_string(),
            (true, false) => y_field.to_string(),
            (true, true) => format!("{}/{}", x_field, y_field),
        };
        return Err(AnalysisError::NonNumericField {
            field,
            dropped_rows,
        });
    }
    if dropped_rows > 0 {
        log::warn!(
            "Dropped {} of {} rows incomplete for ('{}', '{}')",
            dropped_rows,
            records.len(),
            x_field,
            y_field
        );
    }

    Ok(ExtractedPairs { x, y, dropped_rows })
}

/// Coerce an inline list of values, counting the entries that were dropped.
pub fn coerce_values(
    values: &[FieldValue],
    name: &str,
    config: &EngineConfig,
) -> AnalysisResult<ExtractedSample> {
    let clean: Vec<f64> = values
        .iter()
        .filter_map(|v| v.to_finite(config.accept_numeric_strings))
        .collect();
    let dropped_rows = values.len() - clean.len();
    if clean.is_empty() {
        return Err(AnalysisError::NonNumericField {
            field: name.to_string(),
            dropped_rows,
        });
    }
    Ok(ExtractedSample {
        values: clean,
        dropped_rows,
    })
}

/// Partition records into groups by a categorical key.
///
/// Groups appear in first-seen order. Rows with a null or missing key, or a
/// non-numeric value, are dropped and counted.
///
/// # Returns
/// The groups and the number of dropped rows
pub fn partition_by_field(
    records: &[Record],
    value_field: &str,
    group_field: &str,
    config: &EngineConfig,
) -> AnalysisResult<(Vec<Group>, usize)> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut dropped_rows = 0;

    for r in records {
        let label = r.get(group_field).and_then(FieldValue::as_group_label);
        let value = field_value(r, value_field, config.accept_numeric_strings);
        match (label, value) {
            (Some(label), Some(value)) => {
                let slot = *index.entry(label.clone()).or_insert_with(|| {
                    groups.push(Group::new(label, Vec::new()));
                    groups.len() - 1
                });
                groups[slot].values.push(value);
            }
            _ => dropped_rows += 1,
        }
    }

    if groups.is_empty() {
        return Err(AnalysisError::NonNumericField {
            field: value_field.to_string(),
            dropped_rows,
        });
    }
    if dropped_rows > 0 {
        log::warn!(
            "Dropped {} rows while grouping '{}' by '{}'",
            dropped_rows,
            value_field,
            group_field
        );
    }

    Ok((groups, dropped_rows))
}
