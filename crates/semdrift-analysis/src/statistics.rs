// crates/semdrift-analysis/src/statistics.rs
//
// Summary statistics over a run's distance results.
//
// Everything here is recomputed from `DistanceResult` values on demand and
// never stored as authoritative state. Quartiles use linear interpolation
// between closest ranks; standard deviations are sample (n - 1) deviations.
// Significance tests and confidence intervals use Student's t distribution.

use std::collections::BTreeMap;
use std::fmt;

use semdrift_core::{DistanceResult, DriftError};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-value below which a test counts as significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Confidence level used for per-level intervals unless one is given.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// r² above which a significant fit counts as strongly linear.
const STRONG_LINEAR_R_SQUARED: f64 = 0.90;

/// Descriptive statistics of a set of values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Descriptive {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single value.
    pub stdev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

/// Ordinary least squares fit of distance on corruption level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation between level and distance.
    pub r_value: f64,
    pub r_squared: f64,
    /// Root mean squared residual.
    pub rmse: f64,
    /// Mean absolute residual.
    pub mae: f64,
    /// Standard error of the slope.
    pub std_err: f64,
    /// Two-sided p-value for a zero slope; `None` with only two points.
    pub p_value: Option<f64>,
}

impl Regression {
    pub fn predict(&self, level: f64) -> f64 {
        self.intercept + self.slope * level
    }

    pub fn fit_quality(&self) -> FitQuality {
        FitQuality::from_r_squared(self.r_squared)
    }

    pub fn slope_significant(&self) -> bool {
        is_significant(self.p_value)
    }

    /// Test the hypothesis that distance grows linearly with corruption level.
    pub fn linearity(&self) -> LinearityTest {
        let slope_significant = self.slope_significant();
        let strong_linear_fit = self.r_squared > STRONG_LINEAR_R_SQUARED;
        let conclusion = match (slope_significant, strong_linear_fit) {
            (true, true) => LinearityConclusion::Accepted,
            (true, false) => LinearityConclusion::Partial,
            (false, _) => LinearityConclusion::Rejected,
        };
        LinearityTest {
            slope_significant,
            strong_linear_fit,
            r_squared: self.r_squared,
            p_value: self.p_value,
            conclusion,
        }
    }
}

/// Outcome of the linearity hypothesis test on a regression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearityTest {
    pub slope_significant: bool,
    pub strong_linear_fit: bool,
    pub r_squared: f64,
    pub p_value: Option<f64>,
    pub conclusion: LinearityConclusion,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinearityConclusion {
    /// Significant slope and a strong fit.
    Accepted,
    /// Significant slope, weaker fit.
    Partial,
    Rejected,
}

impl fmt::Display for LinearityConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LinearityConclusion::Accepted => {
                "ACCEPTED: strong evidence for a linear relationship"
            }
            LinearityConclusion::Partial => {
                "PARTIAL: significant relationship but the fit could be better"
            }
            LinearityConclusion::Rejected => {
                "REJECTED: no significant linear relationship detected"
            }
        };
        f.write_str(label)
    }
}

/// Summary block for a run's cosine distances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: f64,
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    /// Corruption level of the first record with the minimum distance.
    pub min_level: i64,
    /// Corruption level of the first record with the maximum distance.
    pub max_level: i64,
    /// `None` when every record has the same corruption level.
    pub regression: Option<Regression>,
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Qualitative label for a coefficient of determination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    Excellent,
    Good,
    Moderate,
    Weak,
    Poor,
}

impl FitQuality {
    pub fn from_r_squared(r_squared: f64) -> Self {
        if r_squared >= 0.90 {
            FitQuality::Excellent
        } else if r_squared >= 0.75 {
            FitQuality::Good
        } else if r_squared >= 0.50 {
            FitQuality::Moderate
        } else if r_squared >= 0.25 {
            FitQuality::Weak
        } else {
            FitQuality::Poor
        }
    }
}

impl fmt::Display for FitQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FitQuality::Excellent => "excellent fit",
            FitQuality::Good => "good fit",
            FitQuality::Moderate => "moderate fit",
            FitQuality::Weak => "weak fit",
            FitQuality::Poor => "poor fit",
        };
        f.write_str(label)
    }
}

/// Qualitative label for the magnitude of a correlation coefficient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
    VeryWeak,
}

impl CorrelationStrength {
    pub fn from_coefficient(r: f64) -> Self {
        let r = r.abs();
        if r >= 0.9 {
            CorrelationStrength::VeryStrong
        } else if r >= 0.7 {
            CorrelationStrength::Strong
        } else if r >= 0.5 {
            CorrelationStrength::Moderate
        } else if r >= 0.3 {
            CorrelationStrength::Weak
        } else {
            CorrelationStrength::VeryWeak
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CorrelationStrength::VeryStrong => "very strong",
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::VeryWeak => "very weak",
        };
        f.write_str(label)
    }
}

/// Correlation between corruption level and cosine distance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Correlation {
    pub pearson: f64,
    /// Two-sided p-value; `None` with only two points.
    pub pearson_p_value: Option<f64>,
    pub spearman: f64,
    pub spearman_p_value: Option<f64>,
    /// Label for the Pearson coefficient.
    pub strength: CorrelationStrength,
}

impl Correlation {
    pub fn pearson_significant(&self) -> bool {
        is_significant(self.pearson_p_value)
    }

    pub fn spearman_significant(&self) -> bool {
        is_significant(self.spearman_p_value)
    }
}

/// Change in distance between two consecutive results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistanceChange {
    pub from_level: i64,
    pub to_level: i64,
    pub delta: f64,
    /// Relative change in percent; `None` when the previous distance is zero.
    pub pct_change: Option<f64>,
}

/// Distance statistics for all results sharing one corruption level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelGroup {
    pub level: i64,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `None` for a single-sample group.
    pub stdev: Option<f64>,
}

/// Student-t confidence interval for the mean distance at one level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceInterval {
    pub level: i64,
    pub count: usize,
    pub mean: f64,
    /// Bounds and margin are `None` for a single-sample group.
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub margin: Option<f64>,
    pub confidence: f64,
}

/// Whether a p-value is below `SIGNIFICANCE_LEVEL`.
pub fn is_significant(p_value: Option<f64>) -> bool {
    p_value.is_some_and(|p| p < SIGNIFICANCE_LEVEL)
}

/// Descriptive statistics of a slice of values.
///
/// Valid for a single value (min = max = mean, no stdev).
pub fn describe(values: &[f64]) -> Result<Descriptive, DriftError> {
    if values.is_empty() {
        return Err(DriftError::InsufficientData(
            "cannot describe an empty set of values".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    Ok(Descriptive {
        count: values.len(),
        mean: mean(values),
        stdev: sample_stdev(values),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: percentile(&sorted, 0.5),
        q1,
        q3,
        iqr: q3 - q1,
    })
}

/// Summarize the cosine distances of a run.
///
/// Fails with `InsufficientData` on an empty run and `UndefinedStatistic`
/// on a single result, where the sample standard deviation is undefined.
pub fn summarize(results: &[DistanceResult]) -> Result<SummaryStatistics, DriftError> {
    let distances: Vec<f64> = results.iter().map(|r| r.cosine_distance).collect();
    let desc = describe(&distances)?;
    let stdev = desc.stdev.ok_or_else(|| {
        DriftError::UndefinedStatistic(
            "sample standard deviation needs at least two results".to_string(),
        )
    })?;

    let (min_idx, max_idx) = extreme_indices(&distances);
    let regression = match regress(results) {
        Ok(reg) => Some(reg),
        Err(DriftError::InsufficientData(reason)) => {
            tracing::warn!("Skipping regression: {}", reason);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(SummaryStatistics {
        count: desc.count,
        mean: desc.mean,
        stdev,
        min: desc.min,
        max: desc.max,
        median: desc.median,
        q1: desc.q1,
        q3: desc.q3,
        iqr: desc.iqr,
        min_level: results[min_idx].corruption_level,
        max_level: results[max_idx].corruption_level,
        regression,
    })
}

/// Least squares fit of cosine distance on corruption level.
///
/// Needs at least two distinct corruption levels.
pub fn regress(results: &[DistanceResult]) -> Result<Regression, DriftError> {
    let (x, y) = level_distance_pairs(results);
    let n = x.len();
    if n < 2 {
        return Err(DriftError::InsufficientData(format!(
            "regression needs at least two results, got {}",
            n
        )));
    }

    let x_mean = mean(&x);
    let y_mean = mean(&y);
    let sxx: f64 = x.iter().map(|xi| (xi - x_mean).powi(2)).sum();
    let syy: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let sxy: f64 = x
        .iter()
        .zip(&y)
        .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
        .sum();

    if sxx == 0.0 {
        return Err(DriftError::InsufficientData(
            "regression needs at least two distinct corruption levels".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    // A constant response has no linear association.
    let r_value = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };
    let r_squared = r_value * r_value;

    let residuals: Vec<f64> = x
        .iter()
        .zip(&y)
        .map(|(xi, yi)| yi - (intercept + slope * xi))
        .collect();
    let rmse = (residuals.iter().map(|e| e * e).sum::<f64>() / n as f64).sqrt();
    let mae = residuals.iter().map(|e| e.abs()).sum::<f64>() / n as f64;
    let std_err = if n > 2 {
        ((1.0 - r_squared).max(0.0) * syy / sxx / (n - 2) as f64).sqrt()
    } else {
        0.0
    };

    Ok(Regression {
        slope,
        intercept,
        r_value,
        r_squared,
        rmse,
        mae,
        std_err,
        p_value: correlation_p_value(r_value, n)?,
    })
}

/// Pearson and Spearman correlation between corruption level and distance.
pub fn correlation(results: &[DistanceResult]) -> Result<Correlation, DriftError> {
    let (x, y) = level_distance_pairs(results);
    if x.len() < 2 {
        return Err(DriftError::InsufficientData(format!(
            "correlation needs at least two results, got {}",
            x.len()
        )));
    }

    let pearson_r = pearson(&x, &y)?;
    let spearman_rho = pearson(&average_ranks(&x), &average_ranks(&y))?;
    Ok(Correlation {
        pearson: pearson_r,
        pearson_p_value: correlation_p_value(pearson_r, x.len())?,
        spearman: spearman_rho,
        spearman_p_value: correlation_p_value(spearman_rho, x.len())?,
        strength: CorrelationStrength::from_coefficient(pearson_r),
    })
}

/// Distance deltas between consecutive results, in input order.
pub fn distance_changes(results: &[DistanceResult]) -> Vec<DistanceChange> {
    results
        .windows(2)
        .map(|pair| {
            let prev = pair[0].cosine_distance;
            let delta = pair[1].cosine_distance - prev;
            DistanceChange {
                from_level: pair[0].corruption_level,
                to_level: pair[1].corruption_level,
                delta,
                pct_change: if prev == 0.0 {
                    None
                } else {
                    Some(delta / prev * 100.0)
                },
            }
        })
        .collect()
}

/// Group distances by corruption level, ascending.
pub fn by_level(results: &[DistanceResult]) -> Vec<LevelGroup> {
    group_by_level(results)
        .into_iter()
        .map(|(level, values)| LevelGroup {
            level,
            count: values.len(),
            mean: mean(&values),
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            stdev: sample_stdev(&values),
        })
        .collect()
}

/// Confidence interval for the mean distance at each corruption level,
/// ascending by level.
///
/// `confidence` must lie strictly between 0 and 1.
pub fn confidence_intervals(
    results: &[DistanceResult],
    confidence: f64,
) -> Result<Vec<ConfidenceInterval>, DriftError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(DriftError::UndefinedStatistic(format!(
            "confidence level must be between 0 and 1, got {}",
            confidence
        )));
    }
    if results.is_empty() {
        return Err(DriftError::InsufficientData(
            "confidence intervals need at least one result".to_string(),
        ));
    }

    let alpha = 1.0 - confidence;
    group_by_level(results)
        .into_iter()
        .map(|(level, values)| -> Result<ConfidenceInterval, DriftError> {
            let m = mean(&values);
            let margin = match sample_stdev(&values) {
                Some(sd) => {
                    let df = (values.len() - 1) as f64;
                    let t = students_t(df)?.inverse_cdf(1.0 - alpha / 2.0);
                    Some(t * sd / (values.len() as f64).sqrt())
                }
                None => None,
            };
            Ok(ConfidenceInterval {
                level,
                count: values.len(),
                mean: m,
                lower: margin.map(|e| m - e),
                upper: margin.map(|e| m + e),
                margin,
                confidence,
            })
        })
        .collect()
}

/// Descriptive statistics of the cosine similarities of a run.
pub fn distribution(results: &[DistanceResult]) -> Result<Descriptive, DriftError> {
    let similarities: Vec<f64> = results.iter().map(|r| r.cosine_similarity).collect();
    describe(&similarities)
}

fn level_distance_pairs(results: &[DistanceResult]) -> (Vec<f64>, Vec<f64>) {
    results
        .iter()
        .map(|r| (r.corruption_level as f64, r.cosine_distance))
        .unzip()
}

fn group_by_level(results: &[DistanceResult]) -> BTreeMap<i64, Vec<f64>> {
    let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for r in results {
        groups
            .entry(r.corruption_level)
            .or_default()
            .push(r.cosine_distance);
    }
    groups
}

fn students_t(df: f64) -> Result<StudentsT, DriftError> {
    StudentsT::new(0.0, 1.0, df).map_err(|e| {
        DriftError::UndefinedStatistic(format!(
            "Student's t with {} degrees of freedom: {}",
            df, e
        ))
    })
}

/// Two-sided p-value for a correlation coefficient over `n` points, from
/// t = r * sqrt((n - 2) / (1 - r²)) with n - 2 degrees of freedom.
fn correlation_p_value(r: f64, n: usize) -> Result<Option<f64>, DriftError> {
    if n < 3 {
        return Ok(None);
    }
    if r.abs() >= 1.0 {
        return Ok(Some(0.0));
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let p = 2.0 * (1.0 - students_t(df)?.cdf(t.abs()));
    Ok(Some(p.clamp(0.0, 1.0)))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// First index of the minimum and of the maximum.
fn extreme_indices(values: &[f64]) -> (usize, usize) {
    let mut min_idx = 0;
    let mut max_idx = 0;
    for (i, v) in values.iter().enumerate() {
        if *v < values[min_idx] {
            min_idx = i;
        }
        if *v > values[max_idx] {
            max_idx = i;
        }
    }
    (min_idx, max_idx)
}

fn pearson(x: &[f64], y: &[f64]) -> Result<f64, DriftError> {
    let x_mean = mean(x);
    let y_mean = mean(y);
    let sxx: f64 = x.iter().map(|xi| (xi - x_mean).powi(2)).sum();
    let syy: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    if sxx == 0.0 || syy == 0.0 {
        return Err(DriftError::UndefinedStatistic(
            "correlation is undefined when either variable is constant".to_string(),
        ));
    }
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
        .sum();
    Ok((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// 1-based ranks; ties share the average of their positions.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}
