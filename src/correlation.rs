//! Pairwise-complete Pearson correlation matrices over record fields.
//!
//! Each unordered pair of fields is computed from the rows where *both*
//! fields are numeric, so different cells may rest on different sample
//! sizes; the effective n of every cell is reported alongside the
//! coefficient. Every pair is computed once and mirrored, which makes the
//! matrix exactly symmetric.
//!
//! Degenerate cells are never coerced to a number: a field with zero variance
//! yields `NaN` with [`CellStatus::ZeroVariance`], and a pair with fewer than
//! two complete rows yields `NaN` with [`CellStatus::InsufficientSample`].

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::distributions::student_t_sf;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::extraction::Record;
use crate::math_utils::{has_zero_variance, pearson};

/// Outcome of a single matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CellStatus {
    /// Coefficient computed
    Ok,
    /// At least one field is constant over the complete rows
    ZeroVariance,
    /// Fewer than two complete rows
    InsufficientSample,
}

/// One cell of the correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CorrelationCell {
    /// Pearson r in [-1, 1]; NaN unless `status` is `Ok`
    pub coefficient: f64,
    /// Two-sided p-value for H₀: ρ = 0; NaN when n < 3 or the cell is degenerate
    pub p_value: f64,
    /// Complete rows used for this pair
    pub n: usize,
    /// Cell outcome
    pub status: CellStatus,
}

impl CorrelationCell {
    fn undefined(n: usize, status: CellStatus) -> Self {
        Self {
            coefficient: f64::NAN,
            p_value: f64::NAN,
            n,
            status,
        }
    }
}

/// Square correlation matrix indexed in `fields` order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CorrelationMatrix {
    /// Field names, row and column order
    pub fields: Vec<String>,
    /// Pearson coefficients
    pub coefficients: Vec<Vec<f64>>,
    /// Effective sample size per cell
    pub sample_sizes: Vec<Vec<usize>>,
    /// Two-sided p-values per cell
    pub p_values: Vec<Vec<f64>>,
    /// Outcome per cell
    pub statuses: Vec<Vec<CellStatus>>,
    /// Rows where each field is non-numeric, in `fields` order
    pub dropped_rows: Vec<usize>,
    /// Records examined
    pub n_records: usize,
}

impl CorrelationMatrix {
    /// Cell at row `i`, column `j`.
    pub fn cell(&self, i: usize, j: usize) -> Option<CorrelationCell> {
        Some(CorrelationCell {
            coefficient: *self.coefficients.get(i)?.get(j)?,
            p_value: self.p_values[i][j],
            n: self.sample_sizes[i][j],
            status: self.statuses[i][j],
        })
    }

    /// Coefficient for a pair of fields by name.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.fields.iter().position(|f| f == a)?;
        let j = self.fields.iter().position(|f| f == b)?;
        Some(self.coefficients[i][j])
    }

    /// Number of fields.
    pub fn dimension(&self) -> usize {
        self.fields.len()
    }
}

/// Correlation matrix with the default configuration.
///
/// # Example
/// ```rust
/// use analytics_engine::correlation::correlation_matrix;
/// use analytics_engine::extraction::{record, FieldValue};
///
/// let rows = vec![
///     record([("a", FieldValue::from(1.0)), ("b", FieldValue::from(2.0))]),
///     record([("a", FieldValue::from(2.0)), ("b", FieldValue::from(4.1))]),
///     record([("a", FieldValue::from(3.0)), ("b", FieldValue::from(5.9))]),
/// ];
/// let matrix = correlation_matrix(&rows, &["a", "b"]).unwrap();
/// assert_eq!(matrix.coefficients[0][1], matrix.coefficients[1][0]);
/// assert_eq!(matrix.coefficients[0][0], 1.0);
/// ```
pub fn correlation_matrix<S: AsRef<str>>(
    records: &[Record],
    fields: &[S],
) -> AnalysisResult<CorrelationMatrix> {
    correlation_matrix_with_config(records, fields, &EngineConfig::default())
}

/// Correlation matrix over `fields` using pairwise-complete deletion.
///
/// # Errors
/// * `InvalidParameter` when `fields` is empty, contains an empty name or a duplicate
/// * `NonNumericField` when a field has no numeric value in any record
pub fn correlation_matrix_with_config<S: AsRef<str>>(
    records: &[Record],
    fields: &[S],
    config: &EngineConfig,
) -> AnalysisResult<CorrelationMatrix> {
    let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
    validate_fields(&fields)?;

    let accept = config.accept_numeric_strings;
    let columns: Vec<Vec<Option<f64>>> = fields
        .iter()
        .map(|field| {
            records
                .iter()
                .map(|r| r.get(field).and_then(|v| v.to_finite(accept)))
                .collect()
        })
        .collect();

    let mut dropped_rows = Vec::with_capacity(fields.len());
    for (field, column) in fields.iter().zip(&columns) {
        let dropped = column.iter().filter(|v| v.is_none()).count();
        if dropped == column.len() {
            return Err(AnalysisError::NonNumericField {
                field: field.clone(),
                dropped_rows: dropped,
            });
        }
        if dropped > 0 {
            log::warn!(
                "Field '{}' is non-numeric in {} of {} rows",
                field,
                dropped,
                records.len()
            );
        }
        dropped_rows.push(dropped);
    }

    let k = fields.len();
    let pairs: Vec<(usize, usize)> = (0..k).flat_map(|i| (i..k).map(move |j| (i, j))).collect();

    #[cfg(feature = "parallel")]
    let cells: Vec<CorrelationCell> = {
        use rayon::prelude::*;
        pairs
            .par_iter()
            .map(|&(i, j)| compute_cell(&columns[i], &columns[j], i == j))
            .collect::<AnalysisResult<Vec<_>>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let cells: Vec<CorrelationCell> = pairs
        .iter()
        .map(|&(i, j)| compute_cell(&columns[i], &columns[j], i == j))
        .collect::<AnalysisResult<Vec<_>>>()?;

    let mut coefficients = vec![vec![f64::NAN; k]; k];
    let mut p_values = vec![vec![f64::NAN; k]; k];
    let mut sample_sizes = vec![vec![0usize; k]; k];
    let mut statuses = vec![vec![CellStatus::Ok; k]; k];

    for (&(i, j), cell) in pairs.iter().zip(&cells) {
        if cell.status != CellStatus::Ok {
            log::warn!(
                "Correlation ('{}', '{}') is undefined: {:?} (n={})",
                fields[i],
                fields[j],
                cell.status,
                cell.n
            );
        }
        for (a, b) in [(i, j), (j, i)] {
            coefficients[a][b] = cell.coefficient;
            p_values[a][b] = cell.p_value;
            sample_sizes[a][b] = cell.n;
            statuses[a][b] = cell.status;
        }
    }

    log::debug!(
        "Correlation matrix over {} fields, {} records, {} cells",
        k,
        records.len(),
        pairs.len()
    );

    Ok(CorrelationMatrix {
        fields,
        coefficients,
        sample_sizes,
        p_values,
        statuses,
        dropped_rows,
        n_records: records.len(),
    })
}

fn validate_fields(fields: &[String]) -> AnalysisResult<()> {
    if fields.is_empty() {
        return Err(AnalysisError::invalid("fields", "at least one field is required"));
    }
    let mut seen = BTreeSet::new();
    for field in fields {
        if field.trim().is_empty() {
            return Err(AnalysisError::invalid("fields", "field names must be non-empty"));
        }
        if !seen.insert(field.as_str()) {
            return Err(AnalysisError::invalid(
                "fields",
                format!("duplicate field '{}'", field),
            ));
        }
    }
    Ok(())
}

fn compute_cell(
    a: &[Option<f64>],
    b: &[Option<f64>],
    diagonal: bool,
) -> AnalysisResult<CorrelationCell> {
    let (x, y): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(xa, yb)| Some(((*xa)?, (*yb)?)))
        .unzip();
    let n = x.len();

    if n < 2 {
        return Ok(CorrelationCell::undefined(n, CellStatus::InsufficientSample));
    }

    let coefficient = if diagonal {
        if has_zero_variance(&x) {
            return Ok(CorrelationCell::undefined(n, CellStatus::ZeroVariance));
        }
        1.0
    } else {
        let r = pearson(&x, &y)?;
        if r.degenerate {
            return Ok(CorrelationCell::undefined(n, CellStatus::ZeroVariance));
        }
        r.coefficient
    };

    Ok(CorrelationCell {
        coefficient,
        p_value: correlation_p_value(coefficient, n)?,
        n,
        status: CellStatus::Ok,
    })
}

/// Two-sided p-value for H₀: ρ = 0 via t = r√(n−2)/√(1−r²), df = n−2.
///
/// NaN for n < 3, where the test has no degrees of freedom.
pub fn correlation_p_value(r: f64, n: usize) -> AnalysisResult<f64> {
    if n < 3 || r.is_nan() {
        return Ok(f64::NAN);
    }
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return Ok(0.0);
    }
    let df = (n - 2) as f64;
    let t = r.abs() * df.sqrt() / one_minus_r2.sqrt();
    Ok((2.0 * student_t_sf(t, df)?).min(1.0))
}
