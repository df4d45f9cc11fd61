//! Error types and validation functions for the analysis engine.
//!
//! Every failure the engine can produce is a deterministic validation failure:
//! the same inputs always yield the same error, and no error is ever partial or
//! retryable. Callers map [`AnalysisError::kind`] to whatever user-facing
//! surface they expose (for example HTTP 400 for every kind).

use thiserror::Error;

/// Error taxonomy for all analysis operations.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnalysisError {
    /// Missing required option, out-of-range level, or unknown selector.
    #[error("Invalid parameter: {parameter} ({reason})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Constraint that was violated
        reason: String,
    },

    /// Effective sample size below the statistical minimum.
    #[error("Insufficient sample for {operation}: need at least {required} observations, got {actual}")]
    InsufficientSample {
        /// Computation that rejected the sample
        operation: String,
        /// Minimum required observations
        required: usize,
        /// Observations remaining after filtering
        actual: usize,
    },

    /// Zero variance where a ratio would divide by zero.
    #[error("Degenerate input for {operation}: {reason}")]
    DegenerateInput {
        /// Computation that detected the degeneracy
        operation: String,
        /// What made the input degenerate
        reason: String,
    },

    /// No row of a required field coerced to a finite number.
    #[error("Field '{field}' has no numeric values ({dropped_rows} rows dropped)")]
    NonNumericField {
        /// Field name
        field: String,
        /// Rows examined and dropped
        dropped_rows: usize,
    },
}

impl AnalysisError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidParameter { .. } => "invalid-parameter",
            AnalysisError::InsufficientSample { .. } => "insufficient-sample",
            AnalysisError::DegenerateInput { .. } => "degenerate-input",
            AnalysisError::NonNumericField { .. } => "non-numeric-field",
        }
    }

    pub(crate) fn invalid(parameter: &str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(operation: &str, reason: impl Into<String>) -> Self {
        AnalysisError::DegenerateInput {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Validates that a sample has enough observations.
///
/// # Example
/// ```rust
/// use analytics_engine::errors::validate_sample_size;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_sample_size(&data, 2, "variance").is_ok());
/// assert!(validate_sample_size(&data, 5, "variance").is_err());
/// ```
pub fn validate_sample_size(data: &[f64], min_required: usize, operation: &str) -> AnalysisResult<()> {
    if data.len() < min_required {
        Err(AnalysisError::InsufficientSample {
            operation: operation.to_string(),
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates a confidence level expressed in percent.
///
/// The level must lie in the open interval (0, 100); NaN is rejected.
///
/// # Example
/// ```rust
/// use analytics_engine::errors::validate_confidence_level;
///
/// assert!(validate_confidence_level(95.0).is_ok());
/// assert!(validate_confidence_level(0.0).is_err());
/// assert!(validate_confidence_level(150.0).is_err());
/// ```
pub fn validate_confidence_level(level: f64) -> AnalysisResult<()> {
    if level.is_nan() || level <= 0.0 || level >= 100.0 {
        return Err(AnalysisError::invalid(
            "confidence_level",
            format!("{} is outside the open interval (0, 100)", level),
        ));
    }
    Ok(())
}

/// Validates that a parameter value is finite.
pub fn validate_finite(value: f64, name: &str) -> AnalysisResult<()> {
    if !value.is_finite() {
        Err(AnalysisError::invalid(name, format!("{} is not finite", value)))
    } else {
        Ok(())
    }
}

/// Validates that every value in a slice is finite.
///
/// Record-based entry points drop non-finite values during extraction; this
/// guards the slice-based entry points, which take samples as given.
///
/// # Example
/// ```rust
/// use analytics_engine::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "sample1").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "sample1").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> AnalysisResult<()> {
    if let Some((i, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(AnalysisError::invalid(
            name,
            format!("non-finite value {} at index {}", value, i),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sample_size_sufficient() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(validate_sample_size(&data, 3, "test_operation").is_ok());
        assert!(validate_sample_size(&data, 5, "test_operation").is_ok());
    }

    #[test]
    fn test_validate_sample_size_insufficient() {
        let data = vec![1.0, 2.0];
        match validate_sample_size(&data, 5, "regression") {
            Err(AnalysisError::InsufficientSample {
                operation,
                required,
                actual,
            }) => {
                assert_eq!(operation, "regression");
                assert_eq!(required, 5);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected InsufficientSample error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_confidence_level_bounds() {
        assert!(validate_confidence_level(50.0).is_ok());
        assert!(validate_confidence_level(99.9).is_ok());
        assert!(validate_confidence_level(0.0001).is_ok());

        for bad in [0.0, 100.0, 150.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    validate_confidence_level(bad),
                    Err(AnalysisError::InvalidParameter { .. })
                ),
                "level {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite(1.0, "mu0").is_ok());
        assert!(validate_finite(f64::NAN, "mu0").is_err());
        assert!(validate_finite(f64::NEG_INFINITY, "mu0").is_err());
    }

    #[test]
    fn test_validate_all_finite() {
        assert!(validate_all_finite(&[], "empty").is_ok());
        match validate_all_finite(&[1.0, 2.0, f64::INFINITY], "values") {
            Err(AnalysisError::InvalidParameter { parameter, reason }) => {
                assert_eq!(parameter, "values");
                assert!(reason.contains("index 2"));
            }
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(AnalysisError::invalid("x", "y").kind(), "invalid-parameter");
        assert_eq!(AnalysisError::degenerate("x", "y").kind(), "degenerate-input");
        let err = AnalysisError::InsufficientSample {
            operation: "anova".to_string(),
            required: 2,
            actual: 1,
        };
        assert_eq!(err.kind(), "insufficient-sample");
        let err = AnalysisError::NonNumericField {
            field: "revenue".to_string(),
            dropped_rows: 4,
        };
        assert_eq!(err.kind(), "non-numeric-field");
    }

    #[test]
    fn test_error_display_formatting() {
        let err = AnalysisError::InsufficientSample {
            operation: "regression".to_string(),
            required: 3,
            actual: 2,
        };
        let message = format!("{}", err);
        assert!(message.contains("Insufficient sample"));
        assert!(message.contains("regression"));
        assert!(message.contains('3'));
        assert!(message.contains('2'));

        let err = AnalysisError::NonNumericField {
            field: "revenue".to_string(),
            dropped_rows: 7,
        };
        let message = format!("{}", err);
        assert!(message.contains("revenue"));
        assert!(message.contains('7'));
    }
}
