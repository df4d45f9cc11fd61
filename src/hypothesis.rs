//! One-sample and two-sample tests on means.
//!
//! Two-sample tests default to Welch's unequal-variance t-test with
//! Welch–Satterthwaite degrees of freedom rounded down. A pooled-variance
//! Student test is available through [`HypothesisTestOptions::equal_variance`],
//! and supplying known population standard deviations turns either test into
//! a z-test referred to the standard normal distribution.
//!
//! The reported `confidence_interval` is always the two-sided interval at the
//! requested level, whatever the alternative. For one-sided alternatives the
//! matching one-sided bound is reported separately in `directional_bound`.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distributions::{
    normal_cdf, normal_sf, student_t_cdf, student_t_sf, t_critical, t_critical_one_sided,
    z_critical, z_critical_one_sided,
};
use crate::errors::{
    validate_all_finite, validate_confidence_level, validate_finite, AnalysisError,
    AnalysisResult,
};
use crate::math_utils::{has_zero_variance, SampleSummary};
use crate::regression::ConfidenceInterval;

const OPERATION: &str = "hypothesis test";

/// Which test to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TestType {
    /// Sample mean against a hypothesized value
    OneSample,
    /// Difference of two independent sample means
    TwoSample,
}

impl FromStr for TestType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-sample" => Ok(TestType::OneSample),
            "two-sample" => Ok(TestType::TwoSample),
            other => Err(AnalysisError::invalid(
                "test_type",
                format!("unknown test type '{}'", other),
            )),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestType::OneSample => write!(f, "one-sample"),
            TestType::TwoSample => write!(f, "two-sample"),
        }
    }
}

/// Alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Alternative {
    /// Mean (difference) differs from the null value
    #[default]
    TwoSided,
    /// Mean (difference) exceeds the null value
    Greater,
    /// Mean (difference) is below the null value
    Less,
}

impl FromStr for Alternative {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-sided" => Ok(Alternative::TwoSided),
            "greater" => Ok(Alternative::Greater),
            "less" => Ok(Alternative::Less),
            other => Err(AnalysisError::invalid(
                "alternative",
                format!("unknown alternative '{}'", other),
            )),
        }
    }
}

/// Reference distribution of the test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TestDistribution {
    /// Student's t with the reported degrees of freedom
    StudentT,
    /// Standard normal (known population standard deviation)
    Normal,
}

/// Options controlling a hypothesis test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct HypothesisTestOptions {
    /// Explicit test type; inferred from the presence of a second sample when `None`
    pub test_type: Option<TestType>,
    /// Alternative hypothesis
    pub alternative: Alternative,
    /// Confidence level in percent, in (0, 100)
    pub confidence_level: f64,
    /// Hypothesized mean (one-sample) or mean difference (two-sample)
    pub mu0: f64,
    /// Use the pooled-variance Student test instead of Welch
    pub equal_variance: bool,
    /// Known population standard deviation for a one-sample z-test
    pub population_std_dev: Option<f64>,
    /// Known population standard deviations for a two-sample z-test
    pub population_std_devs: Option<(f64, f64)>,
}

impl Default for HypothesisTestOptions {
    fn default() -> Self {
        Self {
            test_type: None,
            alternative: Alternative::TwoSided,
            confidence_level: 95.0,
            mu0: 0.0,
            equal_variance: false,
            population_std_dev: None,
            population_std_devs: None,
        }
    }
}

impl HypothesisTestOptions {
    /// Options with the given alternative and defaults elsewhere.
    pub fn with_alternative(alternative: Alternative) -> Self {
        Self {
            alternative,
            ..Self::default()
        }
    }
}

/// Results of a hypothesis test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HypothesisTestResult {
    /// Test performed
    pub test_type: TestType,
    /// Alternative hypothesis
    pub alternative: Alternative,
    /// Reference distribution
    pub distribution: TestDistribution,
    /// t or z statistic
    pub statistic: f64,
    /// Degrees of freedom (`None` for z-tests)
    pub df: Option<usize>,
    /// p-value under the chosen alternative
    pub p_value: f64,
    /// Sample mean (one-sample) or difference of means (two-sample)
    pub estimate: f64,
    /// Value of the estimate under H₀
    pub null_value: f64,
    /// Standard error of the estimate
    pub standard_error: f64,
    /// Two-sided interval for the estimate at the requested level
    pub confidence_interval: ConfidenceInterval,
    /// One-sided bound for `greater`/`less`, open (infinite) on the other side
    pub directional_bound: Option<ConfidenceInterval>,
    /// Significance level 1 − confidence/100
    pub alpha: f64,
    /// p < α
    pub reject_null: bool,
    /// Cohen's d; `None` when the standardizer is zero
    pub effect_size: Option<f64>,
    /// First sample summary
    pub sample1: SampleSummary,
    /// Second sample summary (two-sample tests)
    pub sample2: Option<SampleSummary>,
    /// Rows dropped during extraction
    pub dropped_rows: usize,
}

struct Statistic {
    estimate: f64,
    standard_error: f64,
    distribution: TestDistribution,
    df: Option<usize>,
    standardizer: f64,
}

/// Run a one-sample or two-sample test on means.
///
/// `sample2 == None` selects the one-sample test against `options.mu0`;
/// otherwise two independent samples are compared.
///
/// # Errors
/// * `InsufficientSample` if any sample has fewer than 2 observations
/// * `InvalidParameter` for a confidence level outside (0, 100), a test type
///   that contradicts the samples given, or a non-positive known standard deviation
/// * `DegenerateInput` when the standard error is zero (constant samples)
///
/// # Example
/// ```rust
/// use analytics_engine::hypothesis::{hypothesis_test, HypothesisTestOptions};
///
/// let before = [12.1, 11.8, 12.4, 12.0, 11.9];
/// let result = hypothesis_test(&before, None, &HypothesisTestOptions {
///     mu0: 10.0,
///     ..Default::default()
/// }).unwrap();
/// assert!(result.reject_null);
/// ```
pub fn hypothesis_test(
    sample1: &[f64],
    sample2: Option<&[f64]>,
    options: &HypothesisTestOptions,
) -> AnalysisResult<HypothesisTestResult> {
    validate_confidence_level(options.confidence_level)?;
    validate_finite(options.mu0, "mu0")?;

    let test_type = match (options.test_type, sample2.is_some()) {
        (None, false) | (Some(TestType::OneSample), false) => TestType::OneSample,
        (None, true) | (Some(TestType::TwoSample), true) => TestType::TwoSample,
        (Some(TestType::OneSample), true) => {
            return Err(AnalysisError::invalid(
                "test_type",
                "one-sample test given a second sample",
            ))
        }
        (Some(TestType::TwoSample), false) => {
            return Err(AnalysisError::invalid(
                "sample2",
                "two-sample test requires a second sample",
            ))
        }
    };

    match test_type {
        TestType::OneSample if options.population_std_devs.is_some() => {
            return Err(AnalysisError::invalid(
                "population_std_devs",
                "a pair of population standard deviations needs a two-sample test",
            ));
        }
        TestType::TwoSample if options.population_std_dev.is_some() => {
            return Err(AnalysisError::invalid(
                "population_std_dev",
                "a two-sample test takes population_std_devs",
            ));
        }
        _ => {}
    }

    let summary1 = summarize(sample1, "sample1")?;
    let (stat, summary2) = match sample2 {
        None => (one_sample_statistic(sample1, &summary1, options)?, None),
        Some(sample2) => {
            let summary2 = summarize(sample2, "sample2")?;
            let stat = two_sample_statistic(sample1, &summary1, sample2, &summary2, options)?;
            (stat, Some(summary2))
        }
    };

    let statistic = (stat.estimate - options.mu0) / stat.standard_error;
    let level = options.confidence_level;

    let (p_value, two_sided_crit, one_sided_crit) = match stat.df {
        Some(df) => {
            let df = df as f64;
            let p = match options.alternative {
                Alternative::TwoSided => (2.0 * student_t_sf(statistic.abs(), df)?).min(1.0),
                Alternative::Greater => student_t_sf(statistic, df)?,
                Alternative::Less => student_t_cdf(statistic, df)?,
            };
            (p, t_critical(level, df)?, t_critical_one_sided(level, df)?)
        }
        None => {
            let p = match options.alternative {
                Alternative::TwoSided => (2.0 * normal_sf(statistic.abs())).min(1.0),
                Alternative::Greater => normal_sf(statistic),
                Alternative::Less => normal_cdf(statistic),
            };
            (p, z_critical(level)?, z_critical_one_sided(level)?)
        }
    };

    let confidence_interval =
        ConfidenceInterval::symmetric(stat.estimate, two_sided_crit * stat.standard_error, level);
    let one_sided_margin = one_sided_crit * stat.standard_error;
    let directional_bound = match options.alternative {
        Alternative::TwoSided => None,
        Alternative::Greater => Some(ConfidenceInterval {
            confidence_level: level,
            lower_bound: stat.estimate - one_sided_margin,
            upper_bound: f64::INFINITY,
        }),
        Alternative::Less => Some(ConfidenceInterval {
            confidence_level: level,
            lower_bound: f64::NEG_INFINITY,
            upper_bound: stat.estimate + one_sided_margin,
        }),
    };

    let alpha = 1.0 - level / 100.0;
    let effect_size = if stat.standardizer > 0.0 {
        Some((stat.estimate - options.mu0) / stat.standardizer)
    } else {
        None
    };

    log::debug!(
        "{} test ({:?}, {:?}): statistic={:.6} df={:?} p={:.3e}",
        test_type,
        options.alternative,
        stat.distribution,
        statistic,
        stat.df,
        p_value
    );

    Ok(HypothesisTestResult {
        test_type,
        alternative: options.alternative,
        distribution: stat.distribution,
        statistic,
        df: stat.df,
        p_value,
        estimate: stat.estimate,
        null_value: options.mu0,
        standard_error: stat.standard_error,
        confidence_interval,
        directional_bound,
        alpha,
        reject_null: p_value < alpha,
        effect_size,
        sample1: summary1,
        sample2: summary2,
        dropped_rows: 0,
    })
}

fn summarize(sample: &[f64], name: &str) -> AnalysisResult<SampleSummary> {
    validate_all_finite(sample, name)?;
    SampleSummary::from_sample(sample).map_err(|_| AnalysisError::InsufficientSample {
        operation: format!("{} ({})", OPERATION, name),
        required: 2,
        actual: sample.len(),
    })
}

fn known_sigma(value: f64, name: &str) -> AnalysisResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AnalysisError::invalid(
            name,
            format!("population standard deviation must be positive, got {}", value),
        ));
    }
    Ok(value)
}

fn one_sample_statistic(
    sample: &[f64],
    summary: &SampleSummary,
    options: &HypothesisTestOptions,
) -> AnalysisResult<Statistic> {
    let n = summary.n as f64;

    if let Some(sigma) = options.population_std_dev {
        let sigma = known_sigma(sigma, "population_std_dev")?;
        return Ok(Statistic {
            estimate: summary.mean,
            standard_error: sigma / n.sqrt(),
            distribution: TestDistribution::Normal,
            df: None,
            standardizer: sigma,
        });
    }

    if has_zero_variance(sample) {
        return Err(AnalysisError::degenerate(
            OPERATION,
            "sample has zero variance, so the standard error is zero",
        ));
    }

    Ok(Statistic {
        estimate: summary.mean,
        standard_error: summary.std_dev / n.sqrt(),
        distribution: TestDistribution::StudentT,
        df: Some(summary.n - 1),
        standardizer: summary.std_dev,
    })
}

fn two_sample_statistic(
    sample1: &[f64],
    summary1: &SampleSummary,
    sample2: &[f64],
    summary2: &SampleSummary,
    options: &HypothesisTestOptions,
) -> AnalysisResult<Statistic> {
    let n1 = summary1.n as f64;
    let n2 = summary2.n as f64;
    let estimate = summary1.mean - summary2.mean;

    let pooled_variance = ((n1 - 1.0) * summary1.variance + (n2 - 1.0) * summary2.variance)
        / (n1 + n2 - 2.0);
    let pooled_sd = pooled_variance.sqrt();

    if let Some((sigma1, sigma2)) = options.population_std_devs {
        let sigma1 = known_sigma(sigma1, "population_std_devs")?;
        let sigma2 = known_sigma(sigma2, "population_std_devs")?;
        return Ok(Statistic {
            estimate,
            standard_error: (sigma1 * sigma1 / n1 + sigma2 * sigma2 / n2).sqrt(),
            distribution: TestDistribution::Normal,
            df: None,
            standardizer: ((sigma1 * sigma1 + sigma2 * sigma2) / 2.0).sqrt(),
        });
    }

    if has_zero_variance(sample1) && has_zero_variance(sample2) {
        return Err(AnalysisError::degenerate(
            OPERATION,
            "both samples have zero variance, so the standard error is zero",
        ));
    }

    if options.equal_variance {
        return Ok(Statistic {
            estimate,
            standard_error: pooled_sd * (1.0 / n1 + 1.0 / n2).sqrt(),
            distribution: TestDistribution::StudentT,
            df: Some(summary1.n + summary2.n - 2),
            standardizer: pooled_sd,
        });
    }

    let a = summary1.variance / n1;
    let b = summary2.variance / n2;
    let welch_df = (a + b).powi(2) / (a * a / (n1 - 1.0) + b * b / (n2 - 1.0));
    // Rounded down, at least 1.
    let df = (welch_df.floor() as usize).max(1);

    Ok(Statistic {
        estimate,
        standard_error: (a + b).sqrt(),
        distribution: TestDistribution::StudentT,
        df: Some(df),
        standardizer: pooled_sd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const A: [f64; 8] = [5.1, 4.9, 5.6, 5.8, 6.0, 5.3, 5.7, 5.5];
    const B: [f64; 6] = [4.2, 4.8, 4.5, 5.0, 4.4, 4.6];

    #[test]
    fn test_one_sample_against_hand_computation() {
        let sample = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let options = HypothesisTestOptions {
            mu0: 4.0,
            ..Default::default()
        };
        let result = hypothesis_test(&sample, None, &options).unwrap();

        let se = (32.0_f64 / 7.0).sqrt() / 8.0_f64.sqrt();
        assert_eq!(result.test_type, TestType::OneSample);
        assert_eq!(result.df, Some(7));
        assert_approx_eq!(result.estimate, 5.0, 1e-12);
        assert_approx_eq!(result.standard_error, se, 1e-12);
        assert_approx_eq!(result.statistic, 1.0 / se, 1e-10);
        let expected_p = 2.0 * student_t_sf(1.0 / se, 7.0).unwrap();
        assert_approx_eq!(result.p_value, expected_p, 1e-14);
        assert!(result.confidence_interval.contains(5.0));
        assert!(result.directional_bound.is_none());
    }

    #[test]
    fn test_welch_degrees_of_freedom_round_down() {
        let result = hypothesis_test(&A, Some(&B[..]), &HypothesisTestOptions::default()).unwrap();
        let s1 = SampleSummary::from_sample(&A).unwrap();
        let s2 = SampleSummary::from_sample(&B).unwrap();
        let a = s1.variance / 8.0;
        let b = s2.variance / 6.0;
        let exact = (a + b).powi(2) / (a * a / 7.0 + b * b / 5.0);

        assert_eq!(result.test_type, TestType::TwoSample);
        assert_eq!(result.df, Some(exact.floor() as usize));
        assert_approx_eq!(result.estimate, s1.mean - s2.mean, 1e-12);
        assert_approx_eq!(result.standard_error, (a + b).sqrt(), 1e-12);
        assert!(result.reject_null);
    }

    #[test]
    fn test_pooled_variance_option() {
        let options = HypothesisTestOptions {
            equal_variance: true,
            ..Default::default()
        };
        let result = hypothesis_test(&A, Some(&B[..]), &options).unwrap();
        assert_eq!(result.df, Some(12));
    }

    #[test]
    fn test_directional_symmetry() {
        let greater = hypothesis_test(
            &A,
            Some(&B[..]),
            &HypothesisTestOptions::with_alternative(Alternative::Greater),
        )
        .unwrap();
        let less = hypothesis_test(
            &B,
            Some(&A[..]),
            &HypothesisTestOptions::with_alternative(Alternative::Less),
        )
        .unwrap();

        assert_eq!(greater.statistic.abs(), less.statistic.abs());
        assert_eq!(greater.p_value, less.p_value);
        assert_eq!(greater.df, less.df);
    }

    #[test]
    fn test_one_sided_p_values_partition() {
        let greater = hypothesis_test(
            &A,
            Some(&B[..]),
            &HypothesisTestOptions::with_alternative(Alternative::Greater),
        )
        .unwrap();
        let less = hypothesis_test(
            &A,
            Some(&B[..]),
            &HypothesisTestOptions::with_alternative(Alternative::Less),
        )
        .unwrap();
        let two_sided = hypothesis_test(&A, Some(&B[..]), &HypothesisTestOptions::default()).unwrap();

        assert_approx_eq!(greater.p_value + less.p_value, 1.0, 1e-12);
        assert_approx_eq!(two_sided.p_value, 2.0 * greater.p_value.min(less.p_value), 1e-12);

        let bound = greater.directional_bound.unwrap();
        assert!(bound.upper_bound.is_infinite());
        assert!(bound.lower_bound > greater.confidence_interval.lower_bound);
        // The two-sided interval is still reported for one-sided alternatives.
        assert_eq!(greater.confidence_interval, two_sided.confidence_interval);
    }

    #[test]
    fn test_alpha_follows_confidence_level() {
        let sample = [10.2, 9.8, 10.4, 10.1, 10.6, 9.9, 10.3];
        let mut options = HypothesisTestOptions {
            mu0: 10.0,
            ..Default::default()
        };
        let at_95 = hypothesis_test(&sample, None, &options).unwrap();
        options.confidence_level = 80.0;
        let at_80 = hypothesis_test(&sample, None, &options).unwrap();

        assert_approx_eq!(at_95.alpha, 0.05, 1e-12);
        assert_approx_eq!(at_80.alpha, 0.2, 1e-12);
        assert_eq!(at_95.p_value, at_80.p_value);
        assert_eq!(at_80.reject_null, at_80.p_value < 0.2);
        assert_eq!(at_95.reject_null, at_95.p_value < 0.05);
    }

    #[test]
    fn test_z_test_with_known_sigma() {
        let sample = [101.0, 99.0, 103.0, 98.0, 104.0, 100.0];
        let options = HypothesisTestOptions {
            mu0: 100.0,
            population_std_dev: Some(2.0),
            ..Default::default()
        };
        let result = hypothesis_test(&sample, None, &options).unwrap();
        assert_eq!(result.distribution, TestDistribution::Normal);
        assert_eq!(result.df, None);
        let z = (mean_of(&sample) - 100.0) / (2.0 / 6.0_f64.sqrt());
        assert_approx_eq!(result.statistic, z, 1e-12);
        assert_approx_eq!(result.p_value, 2.0 * normal_sf(z.abs()), 1e-14);
    }

    #[test]
    fn test_two_sample_z_test_with_known_sigmas() {
        let options = HypothesisTestOptions {
            mu0: 0.25,
            population_std_devs: Some((0.4, 0.3)),
            ..Default::default()
        };
        let result = hypothesis_test(&A, Some(&B[..]), &options).unwrap();
        assert_eq!(result.distribution, TestDistribution::Normal);
        assert_eq!(result.df, None);

        let se = (0.4_f64 * 0.4 / 8.0 + 0.3 * 0.3 / 6.0).sqrt();
        let z = (mean_of(&A) - mean_of(&B) - 0.25) / se;
        assert_approx_eq!(result.standard_error, se, 1e-14);
        assert_approx_eq!(result.statistic, z, 1e-12);
        assert_approx_eq!(result.p_value, 2.0 * normal_sf(z.abs()), 1e-14);
        let margin = z_critical(95.0).unwrap() * se;
        assert_approx_eq!(result.confidence_interval.lower_bound, result.estimate - margin, 1e-12);
    }

    #[test]
    fn test_known_sigma_must_match_sample_count() {
        let single_sigma = HypothesisTestOptions {
            population_std_dev: Some(2.0),
            ..Default::default()
        };
        match hypothesis_test(&A, Some(&B[..]), &single_sigma) {
            Err(AnalysisError::InvalidParameter { parameter, .. }) => {
                assert_eq!(parameter, "population_std_dev");
            }
            other => panic!("Expected InvalidParameter error, got {:?}", other),
        }

        let sigma_pair = HypothesisTestOptions {
            population_std_devs: Some((2.0, 2.0)),
            ..Default::default()
        };
        match hypothesis_test(&A, None, &sigma_pair) {
            Err(AnalysisError::InvalidParameter { parameter, .. }) => {
                assert_eq!(parameter, "population_std_devs");
            }
            other => panic!("Expected InvalidParameter error, got {:?}", other),
        }
    }

    fn mean_of(data: &[f64]) -> f64 {
        data.iter().sum::<f64>() / data.len() as f64
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            hypothesis_test(&[1.0], None, &HypothesisTestOptions::default()),
            Err(AnalysisError::InsufficientSample { required: 2, actual: 1, .. })
        ));
        assert!(matches!(
            hypothesis_test(&A, Some(&[1.0][..]), &HypothesisTestOptions::default()),
            Err(AnalysisError::InsufficientSample { .. })
        ));
        for level in [0.0, 150.0] {
            let options = HypothesisTestOptions {
                confidence_level: level,
                ..Default::default()
            };
            assert!(matches!(
                hypothesis_test(&A, None, &options),
                Err(AnalysisError::InvalidParameter { .. })
            ));
        }
        let options = HypothesisTestOptions {
            test_type: Some(TestType::TwoSample),
            ..Default::default()
        };
        assert!(matches!(
            hypothesis_test(&A, None, &options),
            Err(AnalysisError::InvalidParameter { .. })
        ));
        assert!(matches!(
            hypothesis_test(&[3.0, 3.0, 3.0], None, &HypothesisTestOptions::default()),
            Err(AnalysisError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("one-sample".parse::<TestType>().unwrap(), TestType::OneSample);
        assert_eq!("less".parse::<Alternative>().unwrap(), Alternative::Less);
        assert!("paired".parse::<TestType>().is_err());
        assert!("both".parse::<Alternative>().is_err());
    }
}
