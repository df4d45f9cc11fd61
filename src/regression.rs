//! Ordinary least-squares simple linear regression with inference statistics.
//!
//! The fit centers the data before accumulating sums so large offsets in x do
//! not cancel catastrophically. Inference uses the residual variance with
//! n−2 degrees of freedom.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::distributions::{student_t_sf, t_critical};
use crate::errors::{
    validate_all_finite, validate_confidence_level, validate_sample_size, AnalysisError,
    AnalysisResult,
};
use crate::extraction::{extract_pairs, Record};
use crate::math_utils::{centered_cross_product, float_ops, max_abs, mean, sum_of_squares};

const OPERATION: &str = "linear regression";

/// A two-sided interval around an estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ConfidenceInterval {
    /// Confidence level in percent
    pub confidence_level: f64,
    /// Lower bound
    pub lower_bound: f64,
    /// Upper bound
    pub upper_bound: f64,
}

impl ConfidenceInterval {
    /// Symmetric interval `estimate ± margin`.
    pub fn symmetric(estimate: f64, margin: f64, confidence_level: f64) -> Self {
        Self {
            confidence_level,
            lower_bound: estimate - margin,
            upper_bound: estimate + margin,
        }
    }

    /// Whether `value` lies inside the closed interval.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound && value <= self.upper_bound
    }
}

/// Least-squares line without inference, shared with the forecast engine.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OlsFit {
    pub slope: f64,
    pub intercept: f64,
    pub mean_x: f64,
    /// Σ(xᵢ−x̄)²
    pub sxx: f64,
    /// Σ(yᵢ−ȳ)²
    pub tss: f64,
    /// Σeᵢ²
    pub rss: f64,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// Fit y = β₀ + β₁x by least squares. Needs n ≥ 2 and non-constant x.
pub(crate) fn ols_fit(x: &[f64], y: &[f64]) -> AnalysisResult<OlsFit> {
    if x.len() != y.len() {
        return Err(AnalysisError::invalid(
            "paired series",
            format!("length mismatch: {} vs {}", x.len(), y.len()),
        ));
    }
    validate_sample_size(x, 2, OPERATION)?;
    validate_all_finite(x, "x")?;
    validate_all_finite(y, "y")?;

    let sxx = sum_of_squares(x);
    if float_ops::is_zero_sum_of_squares(sxx, max_abs(x), x.len()) {
        return Err(AnalysisError::degenerate(
            OPERATION,
            "predictor has zero variance (all x values equal)",
        ));
    }

    let mean_x = mean(x);
    let mean_y = mean(y);
    let slope = centered_cross_product(x, y) / sxx;
    let intercept = mean_y - slope * mean_x;

    let fitted: Vec<f64> = x.iter().map(|xi| intercept + slope * xi).collect();
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
    let rss = residuals.iter().map(|e| e * e).sum();
    let tss = sum_of_squares(y);

    Ok(OlsFit {
        slope,
        intercept,
        mean_x,
        sxx,
        tss,
        rss,
        fitted,
        residuals,
    })
}

/// Results of a simple linear regression.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RegressionResult {
    /// Estimated slope β₁
    pub slope: f64,
    /// Estimated intercept β₀
    pub intercept: f64,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Standard error of the slope
    pub standard_error: f64,
    /// Standard error of the intercept
    pub intercept_standard_error: f64,
    /// Residual standard error √(RSS/(n−2))
    pub residual_standard_error: f64,
    /// t statistic for H₀: β₁ = 0
    pub t_statistic: f64,
    /// Two-sided p-value for H₀: β₁ = 0
    pub p_value: f64,
    /// Residual degrees of freedom (n−2)
    pub df: usize,
    /// Confidence interval for the slope
    pub confidence_interval: ConfidenceInterval,
    /// Number of complete pairs used
    pub n: usize,
    /// Rows dropped during extraction
    pub dropped_rows: usize,
    /// Fitted values, aligned with the input pairs
    pub fitted: Vec<f64>,
    /// Residuals yᵢ − ŷᵢ
    pub residuals: Vec<f64>,
}

impl RegressionResult {
    /// Point prediction at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit an OLS line to paired samples and compute inference statistics.
///
/// # Arguments
/// * `x`, `y` - Paired observations of equal length (n ≥ 3)
/// * `confidence_level` - Confidence level for the slope interval, in percent
///
/// # Errors
/// * `InsufficientSample` when n < 3
/// * `DegenerateInput` when x is constant, or when y is constant but the fit
///   is not exact
/// * `InvalidParameter` for a confidence level outside (0, 100)
///
/// # Example
/// ```rust
/// use analytics_engine::regression::fit_simple_linear_regression;
///
/// let x = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = [3.0, 5.0, 7.0, 9.0, 11.0];
/// let fit = fit_simple_linear_regression(&x, &y, 95.0).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.intercept - 1.0).abs() < 1e-12);
/// ```
pub fn fit_simple_linear_regression(
    x: &[f64],
    y: &[f64],
    confidence_level: f64,
) -> AnalysisResult<RegressionResult> {
    validate_confidence_level(confidence_level)?;
    validate_sample_size(x, 3, OPERATION)?;
    let fit = ols_fit(x, y)?;

    let n = x.len();
    let df = n - 2;

    // R² is undefined for constant y unless the line fits exactly.
    let rss_is_zero = float_ops::is_zero_sum_of_squares(fit.rss, max_abs(y), n);
    let tss_is_zero = float_ops::is_zero_sum_of_squares(fit.tss, max_abs(y), n);
    let r_squared = if tss_is_zero {
        if !rss_is_zero {
            return Err(AnalysisError::degenerate(
                OPERATION,
                "response has zero variance but residuals are non-zero",
            ));
        }
        1.0
    } else if rss_is_zero {
        1.0
    } else {
        (1.0 - fit.rss / fit.tss).clamp(0.0, 1.0)
    };

    let residual_variance = if rss_is_zero { 0.0 } else { fit.rss / df as f64 };
    let residual_standard_error = residual_variance.sqrt();
    let standard_error = residual_standard_error / fit.sxx.sqrt();
    let intercept_standard_error =
        residual_standard_error * (1.0 / n as f64 + fit.mean_x * fit.mean_x / fit.sxx).sqrt();

    let (t_statistic, p_value) = if tss_is_zero {
        // Exact horizontal fit: no evidence against β₁ = 0.
        (0.0, 1.0)
    } else if standard_error > 0.0 {
        let t = fit.slope / standard_error;
        (t, 2.0 * student_t_sf(t.abs(), df as f64)?)
    } else {
        (f64::INFINITY.copysign(fit.slope), 0.0)
    };

    let margin = t_critical(confidence_level, df as f64)? * standard_error;
    let confidence_interval = ConfidenceInterval::symmetric(fit.slope, margin, confidence_level);

    log::debug!(
        "OLS fit n={} slope={:.6} intercept={:.6} r2={:.6} p={:.3e}",
        n,
        fit.slope,
        fit.intercept,
        r_squared,
        p_value
    );

    Ok(RegressionResult {
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared,
        standard_error,
        intercept_standard_error,
        residual_standard_error,
        t_statistic,
        p_value,
        df,
        confidence_interval,
        n,
        dropped_rows: 0,
        fitted: fit.fitted,
        residuals: fit.residuals,
    })
}

/// Regress `y_field` on `x_field` across records, dropping incomplete rows.
pub fn regression_from_records(
    records: &[Record],
    x_field: &str,
    y_field: &str,
    confidence_level: f64,
    config: &EngineConfig,
) -> AnalysisResult<RegressionResult> {
    validate_confidence_level(confidence_level)?;
    let pairs = extract_pairs(records, x_field, y_field, config)?;
    let mut result = fit_simple_linear_regression(&pairs.x, &pairs.y, confidence_level)?;
    result.dropped_rows = pairs.dropped_rows;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{record, FieldValue};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_perfect_linear_fit() {
        let x: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|xi| 2.0 * xi + 1.0).collect();

        let fit = fit_simple_linear_regression(&x, &y, 95.0).unwrap();
        assert_approx_eq!(fit.slope, 2.0, 1e-12);
        assert_approx_eq!(fit.intercept, 1.0, 1e-12);
        assert_approx_eq!(fit.r_squared, 1.0, 1e-12);
        assert!(fit.p_value < 1e-10);
        assert_eq!(fit.n, 8);
        assert_eq!(fit.df, 6);
        for residual in &fit.residuals {
            assert_approx_eq!(*residual, 0.0, 1e-10);
        }
    }

    #[test]
    fn test_noisy_fit_against_reference_values() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.1, 3.9, 6.2, 7.8, 9.9];
        let fit = fit_simple_linear_regression(&x, &y, 95.0).unwrap();

        assert_approx_eq!(fit.slope, 1.95, 1e-12);
        assert_approx_eq!(fit.intercept, 0.13, 1e-12);
        // RSS = 0.083, TSS = 38.108, Sxx = 10
        assert_approx_eq!(fit.r_squared, 1.0 - 0.083 / 38.108, 1e-10);
        let se = (0.083_f64 / 3.0).sqrt() / 10.0_f64.sqrt();
        assert_approx_eq!(fit.standard_error, se, 1e-12);
        assert_approx_eq!(fit.t_statistic, 1.95 / se, 1e-8);
        let margin = 3.182446305284263 * se;
        assert_approx_eq!(fit.confidence_interval.lower_bound, 1.95 - margin, 1e-8);
        assert_approx_eq!(fit.confidence_interval.upper_bound, 1.95 + margin, 1e-8);
        assert!(fit.p_value < 1e-4);
    }

    #[test]
    fn test_constant_x_is_degenerate() {
        let x = [5.0, 5.0, 5.0, 5.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        assert!(matches!(
            fit_simple_linear_regression(&x, &y, 95.0),
            Err(AnalysisError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_predictor_at_large_offset() {
        // Epoch microseconds one millisecond apart.
        let x: Vec<f64> = (0..5).map(|i| 1.7e15 + 1000.0 * i as f64).collect();
        let y = [1.0, 2.1, 2.9, 4.2, 5.0];
        let fit = fit_simple_linear_regression(&x, &y, 95.0).unwrap();
        assert_approx_eq!(fit.slope, 0.00101, 1e-12);
        assert!(fit.r_squared > 0.99);
        assert!(fit.p_value < 0.01);
    }

    #[test]
    fn test_constant_y_is_exact_horizontal_fit() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [7.0, 7.0, 7.0, 7.0];
        let fit = fit_simple_linear_regression(&x, &y, 95.0).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 1.0);
        assert_eq!(fit.t_statistic, 0.0);
        assert_eq!(fit.p_value, 1.0);
    }

    #[test]
    fn test_insufficient_sample() {
        assert!(matches!(
            fit_simple_linear_regression(&[1.0, 2.0], &[1.0, 3.0], 95.0),
            Err(AnalysisError::InsufficientSample { required: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_length_mismatch_and_bad_level() {
        assert!(matches!(
            fit_simple_linear_regression(&[1.0, 2.0, 3.0], &[1.0, 2.0], 95.0),
            Err(AnalysisError::InvalidParameter { .. })
        ));
        assert!(matches!(
            fit_simple_linear_regression(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0], 100.0),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_regression_from_records_reports_dropped_rows() {
        let records = vec![
            record([("ad_spend", FieldValue::from(1.0)), ("revenue", FieldValue::from(3.0))]),
            record([("ad_spend", FieldValue::from(2.0)), ("revenue", FieldValue::from(5.0))]),
            record([("ad_spend", FieldValue::Null), ("revenue", FieldValue::from(6.0))]),
            record([("ad_spend", FieldValue::from(3.0)), ("revenue", FieldValue::from(7.0))]),
            record([("ad_spend", "4".into()), ("revenue", FieldValue::from(9.0))]),
        ];
        let fit =
            regression_from_records(&records, "ad_spend", "revenue", 95.0, &EngineConfig::default())
                .unwrap();
        assert_eq!(fit.n, 4);
        assert_eq!(fit.dropped_rows, 1);
        assert_approx_eq!(fit.slope, 2.0, 1e-12);
        assert_approx_eq!(fit.predict(10.0), 21.0, 1e-10);
    }
}
