//! # Engine Configuration
//!
//! Knobs shared by every analyzer: the default confidence level, how field
//! values are coerced to numbers, and limits on forecast horizons.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{validate_confidence_level, AnalysisResult};

/// Configuration for controlling engine-wide analysis behavior
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EngineConfig {
    /// Confidence level (percent) used when an option omits one
    pub default_confidence_level: f64,
    /// Residual degrees of freedom from which forecast intervals use the
    /// normal quantile instead of Student's t
    pub normal_approximation_min_df: usize,
    /// Upper limit on the number of forecast periods per call
    pub max_forecast_periods: usize,
    /// Coerce numeric strings such as `"12.5"` to numbers during extraction
    pub accept_numeric_strings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_confidence_level: 95.0,
            normal_approximation_min_df: 1000,
            max_forecast_periods: 10_000,
            accept_numeric_strings: true,
        }
    }
}

impl EngineConfig {
    /// Strict configuration: only native numbers count as numeric values
    pub fn strict() -> Self {
        Self {
            accept_numeric_strings: false,
            ..Self::default()
        }
    }

    /// Resolve an optional confidence level against the configured default
    /// and validate it.
    pub fn resolve_confidence_level(&self, level: Option<f64>) -> AnalysisResult<f64> {
        let level = level.unwrap_or(self.default_confidence_level);
        validate_confidence_level(level)?;
        Ok(level)
    }
}
