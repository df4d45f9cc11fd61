//! Descriptive statistics shared by every analyzer.
//!
//! Variance, standard deviation and covariance use the sample (n−1)
//! correction throughout. Functions that need at least two observations fail
//! with [`AnalysisError::InsufficientSample`] instead of returning NaN.

use crate::errors::{validate_sample_size, AnalysisError, AnalysisResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numerical tolerances.
pub mod constants {
    /// Deviations within this many machine epsilons of the data magnitude
    /// are rounding noise.
    pub const ZERO_VARIANCE_ULPS: f64 = 64.0;
}

/// Safe floating-point helpers.
pub mod float_ops {
    use super::constants::ZERO_VARIANCE_ULPS;

    /// True when a centred sum of squares is zero relative to the magnitude of
    /// the data it was computed from.
    ///
    /// `scale` is the largest absolute value in the data. The sum counts as
    /// zero when it is no larger than n·(k·ε·scale)², the size rounding alone
    /// can produce.
    #[inline]
    pub fn is_zero_sum_of_squares(sum_of_squares: f64, scale: f64, n: usize) -> bool {
        let noise = ZERO_VARIANCE_ULPS * f64::EPSILON * scale;
        sum_of_squares <= (noise * noise * n as f64).max(f64::MIN_POSITIVE)
    }
}

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sum of squared deviations from the mean.
pub fn sum_of_squares(data: &[f64]) -> f64 {
    let m = mean(data);
    data.iter().map(|x| (x - m) * (x - m)).sum()
}

/// Sample variance (divides by n−1).
pub fn sample_variance(data: &[f64]) -> AnalysisResult<f64> {
    validate_sample_size(data, 2, "sample variance")?;
    Ok(sum_of_squares(data) / (data.len() - 1) as f64)
}

/// Sample standard deviation (square root of [`sample_variance`]).
pub fn sample_std_dev(data: &[f64]) -> AnalysisResult<f64> {
    sample_variance(data).map(f64::sqrt)
}

/// Sample covariance of two equal-length series.
pub fn covariance(x: &[f64], y: &[f64]) -> AnalysisResult<f64> {
    check_paired(x, y)?;
    Ok(centered_cross_product(x, y) / (x.len() - 1) as f64)
}

/// Σ(xᵢ−x̄)(yᵢ−ȳ)
pub(crate) fn centered_cross_product(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = mean(x);
    let mean_y = mean(y);
    x.iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum()
}

/// Largest absolute value in the slice (0 for an empty slice).
pub(crate) fn max_abs(data: &[f64]) -> f64 {
    data.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// True when the sample has no spread beyond rounding noise.
pub fn has_zero_variance(data: &[f64]) -> bool {
    float_ops::is_zero_sum_of_squares(sum_of_squares(data), max_abs(data), data.len())
}

fn check_paired(x: &[f64], y: &[f64]) -> AnalysisResult<()> {
    if x.len() != y.len() {
        return Err(AnalysisError::invalid(
            "paired series",
            format!("length mismatch: {} vs {}", x.len(), y.len()),
        ));
    }
    validate_sample_size(x, 2, "covariance")
}

/// Pearson correlation coefficient with an explicit degeneracy flag.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PearsonCorrelation {
    /// Correlation in [-1, 1], or NaN when degenerate
    pub coefficient: f64,
    /// Either series had zero variance
    pub degenerate: bool,
    /// Number of pairs used
    pub n: usize,
}

/// Pearson correlation: cov(x, y) / (sd(x)·sd(y)).
///
/// When either series has zero variance the coefficient is NaN and
/// `degenerate` is set; it is never coerced to 0. The coefficient is clamped
/// to [-1, 1] to absorb rounding.
pub fn pearson(x: &[f64], y: &[f64]) -> AnalysisResult<PearsonCorrelation> {
    check_paired(x, y)?;
    let n = x.len();

    if has_zero_variance(x) || has_zero_variance(y) {
        return Ok(PearsonCorrelation {
            coefficient: f64::NAN,
            degenerate: true,
            n,
        });
    }

    let sxy = centered_cross_product(x, y);
    let sxx = sum_of_squares(x);
    let syy = sum_of_squares(y);
    let r = (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0);

    Ok(PearsonCorrelation {
        coefficient: r,
        degenerate: false,
        n,
    })
}

/// Summary statistics of one sample.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SampleSummary {
    /// Effective sample size
    pub n: usize,
    /// Sample mean
    pub mean: f64,
    /// Sample variance (n−1)
    pub variance: f64,
    /// Sample standard deviation
    pub std_dev: f64,
}

impl SampleSummary {
    /// Summarise a sample of at least two observations.
    pub fn from_sample(data: &[f64]) -> AnalysisResult<Self> {
        let variance = sample_variance(data)?;
        Ok(Self {
            n: data.len(),
            mean: mean(data),
            variance,
            std_dev: variance.sqrt(),
        })
    }
}
