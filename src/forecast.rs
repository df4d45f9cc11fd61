//! Linear-trend forecasting with prediction intervals.
//!
//! History is treated as equally spaced observations at x = 0..n−1. An OLS
//! trend is fitted and extended h steps ahead; each projection carries the
//! prediction interval for a single future observation,
//!
//! ```text
//! ŷ(h) ± crit · s · √(1 + 1/n + (x_h − x̄)² / Σ(xᵢ − x̄)²),   x_h = n − 1 + h
//! ```
//!
//! where `s` is the residual standard error with n−2 degrees of freedom and
//! `crit` is the Student t quantile (or the normal quantile once the residual
//! degrees of freedom reach [`EngineConfig::normal_approximation_min_df`]).
//!
//! Every call is a pure function of its inputs: repeating a call reproduces
//! bit-identical output.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::distributions::{t_critical, z_critical};
use crate::errors::{validate_confidence_level, AnalysisError, AnalysisResult};
use crate::extraction::{extract_sample, Record};
use crate::math_utils::max_abs;
use crate::regression::ols_fit;

const OPERATION: &str = "forecast";

/// How the prediction intervals were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum IntervalMethod {
    /// Student t quantile with n−2 degrees of freedom
    StudentT,
    /// Normal quantile (large residual degrees of freedom)
    Normal,
    /// No residual degrees of freedom (n = 2); bounds are omitted
    Unavailable,
}

/// A single projected period.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ForecastPoint {
    /// 1-based position in the combined history-plus-forecast series
    pub period: usize,
    /// Steps beyond the last observation (1-based)
    pub horizon: usize,
    /// Trend projection
    pub projected_value: f64,
    /// Lower prediction bound
    pub lower_bound: Option<f64>,
    /// Upper prediction bound
    pub upper_bound: Option<f64>,
    /// Display score in [0, 100]: 100 minus the interval half-width as a
    /// percentage of |projected value|. Not a probability.
    pub confidence: f64,
}

/// Results of a trend forecast.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ForecastResult {
    /// Projections in chronological order
    pub points: Vec<ForecastPoint>,
    /// Trend slope per period
    pub slope: f64,
    /// Trend value at the first observation
    pub intercept: f64,
    /// Residual standard error used for the intervals (after flooring)
    pub residual_standard_error: f64,
    /// Historical observations used
    pub n: usize,
    /// Confidence level in percent
    pub confidence_level: f64,
    /// Interval method
    pub interval_method: IntervalMethod,
    /// Rows dropped during extraction
    pub dropped_rows: usize,
}

/// Forecast with the default configuration.
///
/// # Example
/// ```rust
/// use analytics_engine::forecast::forecast;
///
/// let result = forecast(&[10.0, 20.0, 30.0, 40.0], 1, 95.0).unwrap();
/// let next = &result.points[0];
/// assert_eq!(next.period, 5);
/// assert!((next.projected_value - 50.0).abs() < 1e-9);
/// assert!(next.lower_bound.unwrap() < 50.0 && next.upper_bound.unwrap() > 50.0);
/// ```
pub fn forecast(values: &[f64], periods: usize, confidence_level: f64) -> AnalysisResult<ForecastResult> {
    forecast_with_config(values, periods, confidence_level, &EngineConfig::default())
}

/// Project a linear trend `periods` steps past the end of `values`.
///
/// # Errors
/// * `InvalidParameter` for a confidence level outside (0, 100), `periods`
///   of zero or above [`EngineConfig::max_forecast_periods`], or non-finite values
/// * `InsufficientSample` for fewer than two observations
pub fn forecast_with_config(
    values: &[f64],
    periods: usize,
    confidence_level: f64,
    config: &EngineConfig,
) -> AnalysisResult<ForecastResult> {
    validate_confidence_level(confidence_level)?;
    validate_periods(periods, config)?;
    if values.len() < 2 {
        return Err(AnalysisError::InsufficientSample {
            operation: OPERATION.to_string(),
            required: 2,
            actual: values.len(),
        });
    }

    let n = values.len();
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let fit = ols_fit(&x, values)?;
    let df = n - 2;

    let (interval_method, critical, residual_standard_error) = if df == 0 {
        (IntervalMethod::Unavailable, None, 0.0)
    } else {
        // A perfect fit still gets a band at the data's rounding scale.
        let floor = f64::EPSILON.sqrt() * max_abs(values);
        let se = (fit.rss / df as f64).sqrt().max(floor);
        if df >= config.normal_approximation_min_df {
            (IntervalMethod::Normal, Some(z_critical(confidence_level)?), se)
        } else {
            (
                IntervalMethod::StudentT,
                Some(t_critical(confidence_level, df as f64)?),
                se,
            )
        }
    };

    let points = (1..=periods)
        .map(|h| {
            let x_h = (n - 1 + h) as f64;
            let projected_value = fit.intercept + fit.slope * x_h;
            match critical {
                Some(crit) => {
                    let leverage = 1.0 + 1.0 / n as f64 + (x_h - fit.mean_x).powi(2) / fit.sxx;
                    let half_width = crit * residual_standard_error * leverage.sqrt();
                    ForecastPoint {
                        period: n + h,
                        horizon: h,
                        projected_value,
                        lower_bound: Some(projected_value - half_width),
                        upper_bound: Some(projected_value + half_width),
                        confidence: display_confidence(projected_value, half_width),
                    }
                }
                None => ForecastPoint {
                    period: n + h,
                    horizon: h,
                    projected_value,
                    lower_bound: None,
                    upper_bound: None,
                    confidence: 0.0,
                },
            }
        })
        .collect();

    log::debug!(
        "Forecast n={} periods={} slope={:.6} se={:.3e} method={:?}",
        n,
        periods,
        fit.slope,
        residual_standard_error,
        interval_method
    );

    Ok(ForecastResult {
        points,
        slope: fit.slope,
        intercept: fit.intercept,
        residual_standard_error,
        n,
        confidence_level,
        interval_method,
        dropped_rows: 0,
    })
}

/// Forecast a numeric field read from records in order, skipping non-numeric rows.
pub fn forecast_from_records(
    records: &[Record],
    field: &str,
    periods: usize,
    confidence_level: f64,
    config: &EngineConfig,
) -> AnalysisResult<ForecastResult> {
    validate_confidence_level(confidence_level)?;
    validate_periods(periods, config)?;
    let sample = extract_sample(records, field, config)?;
    let mut result = forecast_with_config(&sample.values, periods, confidence_level, config)?;
    result.dropped_rows = sample.dropped_rows;
    Ok(result)
}

fn validate_periods(periods: usize, config: &EngineConfig) -> AnalysisResult<()> {
    if periods == 0 {
        return Err(AnalysisError::invalid("periods", "must be at least 1"));
    }
    if periods > config.max_forecast_periods {
        return Err(AnalysisError::invalid(
            "periods",
            format!(
                "{} exceeds the limit of {}",
                periods, config.max_forecast_periods
            ),
        ));
    }
    Ok(())
}

fn display_confidence(projected_value: f64, half_width: f64) -> f64 {
    let relative = half_width / projected_value.abs().max(f64::MIN_POSITIVE);
    (100.0 - 100.0 * relative).clamp(0.0, 100.0)
}
