//! # Analysis Dispatcher
//!
//! [`analyze`] is the single entry point used by request-handling layers. It
//! selects one analyzer from a string selector, reads the options that
//! analyzer needs from a flat [`AnalysisOptions`], pulls numeric samples out
//! of the supplied records and returns the typed result wrapped in an
//! [`AnalysisOutcome`].
//!
//! | selector               | required options                                   |
//! |------------------------|----------------------------------------------------|
//! | `regression`           | `x_field`, `y_field`                               |
//! | `anova`                | `groups`, or `value_field` + `group_field`         |
//! | `hypothesis-test`      | `sample1` (`sample2` for two-sample tests)         |
//! | `correlation-matrix`   | `fields`                                           |
//! | `forecast`             | `field`, `periods`                                 |
//!
//! Missing options and unknown selectors fail with
//! [`AnalysisError::InvalidParameter`]. The dispatcher holds no state; every
//! call is independent.
//!
//! ## Usage Example
//!
//! ```rust
//! use analytics_engine::analyzer::{analyze, AnalysisOptions, AnalysisOutcome};
//! use analytics_engine::extraction::{record, FieldValue};
//!
//! let data: Vec<_> = (1..=6)
//!     .map(|i| record([("spend", FieldValue::from(i as f64)), ("sales", FieldValue::from(3.0 * i as f64 + 2.0))]))
//!     .collect();
//! let options = AnalysisOptions {
//!     x_field: Some("spend".into()),
//!     y_field: Some("sales".into()),
//!     ..Default::default()
//! };
//!
//! match analyze("regression", &data, &options).unwrap() {
//!     AnalysisOutcome::Regression(fit) => assert!((fit.slope - 3.0).abs() < 1e-9),
//!     other => panic!("unexpected outcome {:?}", other),
//! }
//! ```

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::anova::{one_way_anova, AnovaResult};
use crate::config::EngineConfig;
use crate::correlation::{correlation_matrix_with_config, CorrelationMatrix};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::extraction::{
    coerce_values, extract_sample, partition_by_field, ExtractedSample, FieldValue, Group, Record,
};
use crate::forecast::{forecast_from_records, ForecastResult};
use crate::hypothesis::{
    hypothesis_test, Alternative, HypothesisTestOptions, HypothesisTestResult, TestType,
};
use crate::regression::{regression_from_records, RegressionResult};

/// Analysis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AnalysisType {
    /// Simple linear regression
    Regression,
    /// One-way analysis of variance
    Anova,
    /// t-test or z-test on means
    HypothesisTest,
    /// Pairwise Pearson correlation matrix
    CorrelationMatrix,
    /// Linear-trend forecast
    Forecast,
}

impl AnalysisType {
    /// Every selector, in documentation order.
    pub const ALL: [AnalysisType; 5] = [
        AnalysisType::Regression,
        AnalysisType::Anova,
        AnalysisType::HypothesisTest,
        AnalysisType::CorrelationMatrix,
        AnalysisType::Forecast,
    ];

    /// Wire name of the selector.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Regression => "regression",
            AnalysisType::Anova => "anova",
            AnalysisType::HypothesisTest => "hypothesis-test",
            AnalysisType::CorrelationMatrix => "correlation-matrix",
            AnalysisType::Forecast => "forecast",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                AnalysisError::invalid("analysis_type", format!("unknown analysis type '{}'", s))
            })
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a hypothesis-test sample comes from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum SampleSource {
    /// Name of a field to extract from the records
    Field(String),
    /// Values given inline
    Values(Vec<FieldValue>),
}

impl From<&str> for SampleSource {
    fn from(field: &str) -> Self {
        SampleSource::Field(field.to_string())
    }
}

impl From<Vec<f64>> for SampleSource {
    fn from(values: Vec<f64>) -> Self {
        SampleSource::Values(values.into_iter().map(FieldValue::from).collect())
    }
}

/// A caller-partitioned ANOVA group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GroupSpec {
    /// Group label
    pub label: String,
    /// Raw group values, coerced like record fields
    pub values: Vec<FieldValue>,
}

impl GroupSpec {
    /// Group of native numbers.
    pub fn new(label: impl Into<String>, values: &[f64]) -> Self {
        Self {
            label: label.into(),
            values: values.iter().copied().map(FieldValue::from).collect(),
        }
    }
}

/// Options for every analysis type; each analysis reads only its own fields.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct AnalysisOptions {
    /// Regression predictor field
    pub x_field: Option<String>,
    /// Regression response field
    pub y_field: Option<String>,
    /// Pre-partitioned ANOVA groups
    pub groups: Option<Vec<GroupSpec>>,
    /// ANOVA value field when grouping records by `group_field`
    pub value_field: Option<String>,
    /// ANOVA categorical key field
    pub group_field: Option<String>,
    /// First hypothesis-test sample
    pub sample1: Option<SampleSource>,
    /// Second hypothesis-test sample
    pub sample2: Option<SampleSource>,
    /// `"one-sample"` or `"two-sample"`; inferred from `sample2` when absent
    pub test_type: Option<String>,
    /// `"two-sided"`, `"greater"` or `"less"`
    pub alternative: Option<String>,
    /// Confidence level in percent; the configured default when absent
    pub confidence_level: Option<f64>,
    /// Hypothesized mean or mean difference
    pub mu0: Option<f64>,
    /// Pooled-variance two-sample test
    pub equal_variance: Option<bool>,
    /// Known population standard deviation (one-sample z-test)
    pub population_std_dev: Option<f64>,
    /// Known population standard deviations (two-sample z-test)
    pub population_std_devs: Option<(f64, f64)>,
    /// Correlation-matrix fields, in output order
    pub fields: Option<Vec<String>>,
    /// Forecast field
    pub field: Option<String>,
    /// Forecast horizon
    pub periods: Option<usize>,
}

/// Result of one dispatched analysis.
///
/// Serialized as `{"analysisType": ..., "result": {...}}` with camelCase
/// result fields. Non-finite statistics (an infinite F or t) become `null`
/// in JSON.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "analysisType", content = "result", rename_all = "kebab-case")
)]
pub enum AnalysisOutcome {
    /// Regression result
    Regression(RegressionResult),
    /// ANOVA result
    Anova(AnovaResult),
    /// Hypothesis-test result
    HypothesisTest(HypothesisTestResult),
    /// Correlation matrix
    CorrelationMatrix(CorrelationMatrix),
    /// Forecast result
    Forecast(ForecastResult),
}

impl AnalysisOutcome {
    /// Selector that produced this outcome.
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            AnalysisOutcome::Regression(_) => AnalysisType::Regression,
            AnalysisOutcome::Anova(_) => AnalysisType::Anova,
            AnalysisOutcome::HypothesisTest(_) => AnalysisType::HypothesisTest,
            AnalysisOutcome::CorrelationMatrix(_) => AnalysisType::CorrelationMatrix,
            AnalysisOutcome::Forecast(_) => AnalysisType::Forecast,
        }
    }

    /// Total rows dropped during extraction. For correlation matrices this is
    /// the largest per-field count.
    pub fn dropped_rows(&self) -> usize {
        match self {
            AnalysisOutcome::Regression(r) => r.dropped_rows,
            AnalysisOutcome::Anova(r) => r.dropped_rows,
            AnalysisOutcome::HypothesisTest(r) => r.dropped_rows,
            AnalysisOutcome::CorrelationMatrix(r) => r.dropped_rows.iter().copied().max().unwrap_or(0),
            AnalysisOutcome::Forecast(r) => r.dropped_rows,
        }
    }
}

/// Run one analysis with the default [`EngineConfig`].
pub fn analyze(
    analysis_type: &str,
    data: &[Record],
    options: &AnalysisOptions,
) -> AnalysisResult<AnalysisOutcome> {
    analyze_with_config(analysis_type, data, options, &EngineConfig::default())
}

/// Run one analysis.
///
/// # Errors
/// `InvalidParameter` for an unknown selector or a missing required option;
/// otherwise whatever the selected analyzer reports.
pub fn analyze_with_config(
    analysis_type: &str,
    data: &[Record],
    options: &AnalysisOptions,
    config: &EngineConfig,
) -> AnalysisResult<AnalysisOutcome> {
    let kind: AnalysisType = analysis_type.parse()?;
    log::debug!("Dispatching {} over {} records", kind, data.len());

    match kind {
        AnalysisType::Regression => {
            let x_field = required(&options.x_field, "x_field")?;
            let y_field = required(&options.y_field, "y_field")?;
            let level = config.resolve_confidence_level(options.confidence_level)?;
            regression_from_records(data, x_field, y_field, level, config)
                .map(AnalysisOutcome::Regression)
        }
        AnalysisType::Anova => run_anova(data, options, config).map(AnalysisOutcome::Anova),
        AnalysisType::HypothesisTest => {
            run_hypothesis_test(data, options, config).map(AnalysisOutcome::HypothesisTest)
        }
        AnalysisType::CorrelationMatrix => {
            let fields = required(&options.fields, "fields")?;
            correlation_matrix_with_config(data, fields, config)
                .map(AnalysisOutcome::CorrelationMatrix)
        }
        AnalysisType::Forecast => {
            let field = required(&options.field, "field")?;
            let periods = *required(&options.periods, "periods")?;
            let level = config.resolve_confidence_level(options.confidence_level)?;
            forecast_from_records(data, field, periods, level, config)
                .map(AnalysisOutcome::Forecast)
        }
    }
}

fn required<'a, T>(value: &'a Option<T>, name: &str) -> AnalysisResult<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| AnalysisError::invalid(name, "required option is missing"))
}

fn run_anova(
    data: &[Record],
    options: &AnalysisOptions,
    config: &EngineConfig,
) -> AnalysisResult<AnovaResult> {
    let (groups, dropped_rows) = match (&options.groups, &options.value_field, &options.group_field) {
        (Some(specs), _, _) => {
            let mut groups = Vec::with_capacity(specs.len());
            let mut dropped_rows = 0;
            for spec in specs {
                let sample = resolve_values(&spec.values, &spec.label, config)?;
                dropped_rows += sample.dropped_rows;
                groups.push(Group::new(spec.label.clone(), sample.values));
            }
            (groups, dropped_rows)
        }
        (None, Some(value_field), Some(group_field)) => {
            partition_by_field(data, value_field, group_field, config)?
        }
        _ => {
            return Err(AnalysisError::invalid(
                "groups",
                "provide groups, or value_field together with group_field",
            ))
        }
    };

    let mut result = one_way_anova(&groups)?;
    result.dropped_rows = dropped_rows;
    Ok(result)
}

fn run_hypothesis_test(
    data: &[Record],
    options: &AnalysisOptions,
    config: &EngineConfig,
) -> AnalysisResult<HypothesisTestResult> {
    let test_type = options
        .test_type
        .as_deref()
        .map(TestType::from_str)
        .transpose()?;
    let alternative = options
        .alternative
        .as_deref()
        .map(Alternative::from_str)
        .transpose()?
        .unwrap_or_default();
    let confidence_level = config.resolve_confidence_level(options.confidence_level)?;

    let sample1 = resolve_sample(data, required(&options.sample1, "sample1")?, "sample1", config)?;
    let sample2 = options
        .sample2
        .as_ref()
        .map(|source| resolve_sample(data, source, "sample2", config))
        .transpose()?;

    let test_options = HypothesisTestOptions {
        test_type,
        alternative,
        confidence_level,
        mu0: options.mu0.unwrap_or(0.0),
        equal_variance: options.equal_variance.unwrap_or(false),
        population_std_dev: options.population_std_dev,
        population_std_devs: options.population_std_devs,
    };

    let mut result = hypothesis_test(
        &sample1.values,
        sample2.as_ref().map(|s| s.values.as_slice()),
        &test_options,
    )?;
    result.dropped_rows =
        sample1.dropped_rows + sample2.as_ref().map_or(0, |s| s.dropped_rows);
    Ok(result)
}

fn resolve_sample(
    data: &[Record],
    source: &SampleSource,
    name: &str,
    config: &EngineConfig,
) -> AnalysisResult<ExtractedSample> {
    match source {
        SampleSource::Field(field) => extract_sample(data, field, config),
        SampleSource::Values(values) => resolve_values(values, name, config),
    }
}

/// An empty inline list is an undersized sample rather than a non-numeric one.
fn resolve_values(
    values: &[FieldValue],
    name: &str,
    config: &EngineConfig,
) -> AnalysisResult<ExtractedSample> {
    if values.is_empty() {
        return Ok(ExtractedSample {
            values: Vec::new(),
            dropped_rows: 0,
        });
    }
    coerce_values(values, name, config)
}
