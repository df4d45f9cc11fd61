//! One-way analysis of variance across k independent groups.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distributions::f_sf;
use crate::errors::{validate_all_finite, AnalysisError, AnalysisResult};
use crate::extraction::Group;
use crate::math_utils::{float_ops, max_abs, SampleSummary};

const OPERATION: &str = "one-way ANOVA";

/// Per-group descriptive statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GroupStatistics {
    /// Group label
    pub label: String,
    /// Observations in the group
    pub n: usize,
    /// Group mean
    pub mean: f64,
    /// Group sample variance (n−1)
    pub variance: f64,
}

/// Results of a one-way ANOVA.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AnovaResult {
    /// F statistic MSB/MSW; `+inf` when every group is internally constant
    /// but the group means differ
    pub f_statistic: f64,
    /// P(F > f) under H₀ of equal means
    pub p_value: f64,
    /// Between-groups degrees of freedom (k−1)
    pub df_between: usize,
    /// Within-groups degrees of freedom (N−k)
    pub df_within: usize,
    /// Between-groups sum of squares
    pub ss_between: f64,
    /// Within-groups sum of squares
    pub ss_within: f64,
    /// Total sum of squares
    pub ss_total: f64,
    /// Between-groups mean square
    pub ms_between: f64,
    /// Within-groups mean square
    pub ms_within: f64,
    /// Effect size SSB/SST
    pub eta_squared: f64,
    /// Mean of all observations
    pub grand_mean: f64,
    /// Total observations N
    pub n: usize,
    /// Per-group statistics in input order
    pub groups: Vec<GroupStatistics>,
    /// Convenience hint: p < 0.05. Callers choosing their own α should use `p_value`.
    pub significant_at_95: bool,
    /// Rows dropped while building the groups
    pub dropped_rows: usize,
}

/// One-way ANOVA on pre-partitioned groups.
///
/// # Errors
/// * `InsufficientSample` when fewer than 2 groups are given, or any group
///   has fewer than 2 observations
/// * `DegenerateInput` when every observation is identical (SSB = SSW = 0)
///
/// # Example
/// ```rust
/// use analytics_engine::anova::one_way_anova;
/// use analytics_engine::extraction::Group;
///
/// let groups = vec![
///     Group::new("a", vec![1.0, 2.0, 3.0]),
///     Group::new("b", vec![7.0, 8.0, 9.0]),
/// ];
/// let result = one_way_anova(&groups).unwrap();
/// assert!(result.p_value < 0.01);
/// ```
pub fn one_way_anova(groups: &[Group]) -> AnalysisResult<AnovaResult> {
    if groups.len() < 2 {
        return Err(AnalysisError::InsufficientSample {
            operation: format!("{} (groups)", OPERATION),
            required: 2,
            actual: groups.len(),
        });
    }

    let mut stats = Vec::with_capacity(groups.len());
    for group in groups {
        validate_all_finite(&group.values, &group.label)?;
        let summary = SampleSummary::from_sample(&group.values).map_err(|_| {
            AnalysisError::InsufficientSample {
                operation: format!("{} (group '{}')", OPERATION, group.label),
                required: 2,
                actual: group.values.len(),
            }
        })?;
        stats.push(GroupStatistics {
            label: group.label.clone(),
            n: summary.n,
            mean: summary.mean,
            variance: summary.variance,
        });
    }

    let k = groups.len();
    let n: usize = stats.iter().map(|g| g.n).sum();
    // Each group has n ≥ 2, so N − k ≥ k > 0.
    let df_between = k - 1;
    let df_within = n - k;

    let grand_mean = groups.iter().flat_map(|g| g.values.iter()).sum::<f64>() / n as f64;
    let ss_between: f64 = stats
        .iter()
        .map(|g| g.n as f64 * (g.mean - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .zip(&stats)
        .map(|(g, s)| g.values.iter().map(|x| (x - s.mean).powi(2)).sum::<f64>())
        .sum();
    let ss_total = ss_between + ss_within;

    let scale = groups
        .iter()
        .map(|g| max_abs(&g.values))
        .fold(0.0_f64, f64::max);
    let within_is_zero = float_ops::is_zero_sum_of_squares(ss_within, scale, n);
    let between_is_zero = float_ops::is_zero_sum_of_squares(ss_between, scale, n);

    if within_is_zero && between_is_zero {
        return Err(AnalysisError::degenerate(
            OPERATION,
            "all observations are identical (zero between- and within-group variance)",
        ));
    }

    let ms_between = ss_between / df_between as f64;
    let ms_within = if within_is_zero { 0.0 } else { ss_within / df_within as f64 };

    let (f_statistic, p_value) = if within_is_zero {
        (f64::INFINITY, 0.0)
    } else {
        let f = ms_between / ms_within;
        (f, f_sf(f, df_between as f64, df_within as f64)?)
    };
    let eta_squared = if ss_total > 0.0 { ss_between / ss_total } else { 0.0 };

    log::debug!(
        "ANOVA k={} N={} F={:.6} p={:.3e}",
        k,
        n,
        f_statistic,
        p_value
    );

    Ok(AnovaResult {
        f_statistic,
        p_value,
        df_between,
        df_within,
        ss_between,
        ss_within,
        ss_total,
        ms_between,
        ms_within,
        eta_squared,
        grand_mean,
        n,
        groups: stats,
        significant_at_95: p_value < 0.05,
        dropped_rows: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_textbook_example() {
        let groups = vec![
            Group::new("a", vec![6.0, 8.0, 4.0, 5.0, 3.0, 4.0]),
            Group::new("b", vec![8.0, 12.0, 9.0, 11.0, 6.0, 8.0]),
            Group::new("c", vec![13.0, 9.0, 11.0, 8.0, 7.0, 12.0]),
        ];
        let result = one_way_anova(&groups).unwrap();

        assert_eq!(result.df_between, 2);
        assert_eq!(result.df_within, 15);
        assert_approx_eq!(result.grand_mean, 8.0, 1e-12);
        assert_approx_eq!(result.ss_between, 84.0, 1e-10);
        assert_approx_eq!(result.ss_within, 68.0, 1e-10);
        assert_approx_eq!(result.f_statistic, 42.0 / (68.0 / 15.0), 1e-10);
        // For df1 = 2 the F survival function is (1 + 2F/df2)^(−df2/2).
        let expected_p = (1.0 + 2.0 * result.f_statistic / 15.0).powf(-7.5);
        assert_approx_eq!(result.p_value, expected_p, 1e-12);
        assert!(result.p_value < 0.01);
        assert!(result.significant_at_95);
        assert_approx_eq!(result.eta_squared, 84.0 / 152.0, 1e-12);
        assert_eq!(result.groups[1].label, "b");
        assert_approx_eq!(result.groups[1].mean, 9.0, 1e-12);
    }

    #[test]
    fn test_group_with_one_observation() {
        let groups = vec![
            Group::new("a", vec![1.0, 2.0, 3.0]),
            Group::new("b", vec![4.0]),
        ];
        match one_way_anova(&groups) {
            Err(AnalysisError::InsufficientSample {
                operation, actual, ..
            }) => {
                assert!(operation.contains("'b'"));
                assert_eq!(actual, 1);
            }
            other => panic!("Expected InsufficientSample, got {:?}", other),
        }
    }

    #[test]
    fn test_single_group_rejected() {
        let groups = vec![Group::new("a", vec![1.0, 2.0, 3.0])];
        assert!(matches!(
            one_way_anova(&groups),
            Err(AnalysisError::InsufficientSample { required: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_identical_values_are_degenerate() {
        let groups = vec![
            Group::new("a", vec![5.0, 5.0]),
            Group::new("b", vec![5.0, 5.0, 5.0]),
        ];
        assert!(matches!(
            one_way_anova(&groups),
            Err(AnalysisError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_constant_groups_with_different_means() {
        let groups = vec![
            Group::new("a", vec![1.0, 1.0]),
            Group::new("b", vec![2.0, 2.0]),
        ];
        let result = one_way_anova(&groups).unwrap();
        assert!(result.f_statistic.is_infinite());
        assert_eq!(result.p_value, 0.0);
        assert_eq!(result.ms_within, 0.0);
    }
}
