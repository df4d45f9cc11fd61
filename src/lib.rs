//! # Analytics Engine
//!
//! Stateless statistical analysis over tabular records.
//!
//! This crate turns loosely typed rows (JSON-like records) into clean numeric
//! samples and runs classical inference on them. Every entry point is a pure,
//! synchronous function of its inputs: there is no shared state, no I/O and no
//! retry logic, so independent calls can run on any thread without coordination.
//!
//! ## Key Features
//!
//! - **Regression**: ordinary least squares with slope inference and residuals
//! - **ANOVA**: one-way analysis of variance with effect size
//! - **Hypothesis Tests**: one- and two-sample t-tests (Welch or pooled) and z-tests
//! - **Correlation Matrices**: pairwise-complete Pearson coefficients with per-cell n
//! - **Forecasting**: linear-trend projections with prediction intervals
//! - **Typed Failures**: degenerate or undersized input is an error, never a NaN in a success value
//!
//! ## Quick Start
//!
//! ```rust
//! use analytics_engine::{analyze, AnalysisOptions, AnalysisOutcome};
//! use analytics_engine::extraction::{record, FieldValue};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let history: Vec<_> = [12.0, 14.5, 15.1, 17.8, 19.2]
//!         .iter()
//!         .map(|v| record([("revenue", FieldValue::from(*v))]))
//!         .collect();
//!
//!     let options = AnalysisOptions {
//!         field: Some("revenue".to_string()),
//!         periods: Some(3),
//!         ..Default::default()
//!     };
//!
//!     if let AnalysisOutcome::Forecast(result) = analyze("forecast", &history, &options)? {
//!         for point in &result.points {
//!             println!(
//!                 "period {}: {:.2} [{:?}, {:?}]",
//!                 point.period, point.projected_value, point.lower_bound, point.upper_bound
//!             );
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! [`analyze`] dispatches to one analyzer module. Analyzers depend only on the
//! shared numeric core ([`math_utils`], [`distributions`], [`extraction`]) and
//! can be called directly with slices when the data is already numeric.
//!
//! ## Cargo Features
//!
//! - `serde` (default): `Serialize`/`Deserialize` for options, records and results
//! - `parallel`: compute correlation-matrix cells with rayon

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod analyzer;
pub mod config;
pub mod distributions;
pub mod errors;
pub mod extraction;
pub mod math_utils;

// Analysis methods
pub mod anova;
pub mod correlation;
pub mod forecast;
pub mod hypothesis;
pub mod regression;

// Re-exports for convenience - main public API
pub use analyzer::{
    analyze, analyze_with_config, AnalysisOptions, AnalysisOutcome, AnalysisType, GroupSpec,
    SampleSource,
};
pub use config::EngineConfig;
pub use errors::{AnalysisError, AnalysisResult};
pub use extraction::{FieldValue, Group, Record};

// Analyzer exports
pub use anova::{one_way_anova, AnovaResult, GroupStatistics};
pub use correlation::{
    correlation_matrix, correlation_matrix_with_config, CellStatus, CorrelationCell,
    CorrelationMatrix,
};
pub use forecast::{
    forecast, forecast_from_records, forecast_with_config, ForecastPoint, ForecastResult,
    IntervalMethod,
};
pub use hypothesis::{
    hypothesis_test, Alternative, HypothesisTestOptions, HypothesisTestResult, TestDistribution,
    TestType,
};
pub use regression::{
    fit_simple_linear_regression, regression_from_records, ConfidenceInterval, RegressionResult,
};
