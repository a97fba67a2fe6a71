//! Numeric helpers for Monte Carlo significance testing.
//!
//! Provides percentile estimation with linear interpolation between order
//! statistics, a descriptive summary of a simulated null distribution, an
//! empirical p-value, a distribution-free confidence interval for a percentile
//! threshold, and a binomial check of an observed false-positive rate.
//! Calibration checks return a [`CheckResult`] with a p-value, a pass/fail
//! determination, and a letter grade (A through F).

use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, DiscreteCDF};

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a single calibration check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
    pub grade: char,
}

impl CheckResult {
    /// Assign a letter grade based on p-value.
    ///
    /// - A: p >= 0.1
    /// - B: p >= 0.01
    /// - C: p >= 0.001
    /// - D: p >= 0.0001
    /// - F: otherwise or None
    pub fn grade_from_p(p: Option<f64>) -> char {
        match p {
            Some(p) if p >= 0.1 => 'A',
            Some(p) if p >= 0.01 => 'B',
            Some(p) if p >= 0.001 => 'C',
            Some(p) if p >= 0.0001 => 'D',
            _ => 'F',
        }
    }

    /// Determine pass/fail from p-value against a threshold (default 0.01).
    pub fn pass_from_p(p: Option<f64>, threshold: f64) -> bool {
        match p {
            Some(p) => p >= threshold,
            None => false,
        }
    }
}

/// One histogram bin of a null distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Descriptive statistics of a simulated null distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NullSummary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub histogram: Vec<HistogramBin>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Sort in place using IEEE total ordering, so NaN cannot poison the order.
pub fn sort_values(values: &mut [f64]) {
    values.sort_by(f64::total_cmp);
}

fn insufficient(name: &str, needed: u64, got: u64) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        passed: false,
        p_value: None,
        statistic: 0.0,
        details: format!("Insufficient data: need {needed}, got {got}"),
        grade: 'F',
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 1. PERCENTILES
// ═══════════════════════════════════════════════════════════════════════════════

/// Percentile of an already sorted slice.
///
/// `p` is on the 0–100 scale. Uses linear interpolation between the two
/// nearest order statistics at fractional rank `p/100 * (n - 1)`, which is
/// the convention of NumPy's default `percentile`. Returns `None` for an empty
/// slice or a `p` outside `[0, 100]`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let last = sorted.len() - 1;
    let rank = p / 100.0 * last as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentile of an unsorted slice. Sorts a copy.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sort_values(&mut sorted);
    percentile_sorted(&sorted, p)
}

/// Distribution-free confidence interval for the `p`-th percentile.
///
/// The number of null draws falling below the true percentile is
/// Binomial(n, p/100), so the order statistics at the `alpha/2` and
/// `1 - alpha/2` binomial quantiles bracket it with probability of at least
/// `confidence`. Returns `None` if the inputs are degenerate.
pub fn percentile_interval(sorted: &[f64], p: f64, confidence: f64) -> Option<(f64, f64)> {
    if sorted.len() < 2 || !(0.0..=100.0).contains(&p) || !(0.0..1.0).contains(&confidence) {
        return None;
    }
    let n = sorted.len() as u64;
    let dist = Binomial::new(p / 100.0, n).ok()?;
    let alpha = 1.0 - confidence;
    let lo_rank = dist.inverse_cdf(alpha / 2.0).saturating_sub(1) as usize;
    let hi_rank = (dist.inverse_cdf(1.0 - alpha / 2.0) as usize).min(sorted.len() - 1);
    Some((sorted[lo_rank], sorted[hi_rank]))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2. NULL DISTRIBUTION SUMMARY
// ═══════════════════════════════════════════════════════════════════════════════

/// Empirical upper-tail p-value of `observed` against a sorted null sample.
///
/// Counts null draws at or above `observed` and applies the add-one
/// correction `(k + 1) / (n + 1)`, so the result is never exactly zero.
pub fn empirical_p_value(sorted: &[f64], observed: f64) -> f64 {
    let below = sorted.partition_point(|&v| v < observed);
    let at_or_above = sorted.len() - below;
    (at_or_above as f64 + 1.0) / (sorted.len() as f64 + 1.0)
}

/// Summarize a null sample for plotting: moments, extremes, and an
/// equal-width histogram with `bins` bins.
pub fn summarize(values: &[f64], bins: usize) -> NullSummary {
    if values.is_empty() {
        return NullSummary {
            n: 0,
            mean: 0.0,
            std_dev: 0.0,
            skewness: 0.0,
            min: 0.0,
            max: 0.0,
            median: 0.0,
            histogram: Vec::new(),
        };
    }

    let mut sorted = values.to_vec();
    sort_values(&mut sorted);
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let skewness = if std_dev > 1e-12 {
        sorted
            .iter()
            .map(|&x| ((x - mean) / std_dev).powi(3))
            .sum::<f64>()
            / n
    } else {
        0.0
    };

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let median = percentile_sorted(&sorted, 50.0).unwrap_or(mean);

    let bins = bins.max(1);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0u64; bins];
    for &x in &sorted {
        let idx = if width > 0.0 {
            (((x - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }
    let histogram = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect();

    NullSummary {
        n: sorted.len(),
        mean,
        std_dev,
        skewness,
        min,
        max,
        median,
        histogram,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 3. CALIBRATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Two-sided binomial test of an observed rejection count against the
/// nominal false-positive rate of a test run at `nominal_rate`.
///
/// A well-calibrated null model run on data drawn from that same null should
/// reject in about `nominal_rate` of experiments.
pub fn false_positive_check(rejections: u64, experiments: u64, nominal_rate: f64) -> CheckResult {
    let name = "False Positive Rate";
    if experiments < 20 {
        return insufficient(name, 20, experiments);
    }
    let observed_rate = rejections as f64 / experiments as f64;
    let p = match Binomial::new(nominal_rate.clamp(0.0, 1.0), experiments) {
        Ok(dist) => {
            let p_lower = dist.cdf(rejections);
            let p_upper = if rejections > 0 {
                dist.sf(rejections - 1)
            } else {
                1.0
            };
            (2.0 * p_lower.min(p_upper)).min(1.0)
        }
        Err(_) => 0.0,
    };
    CheckResult {
        name: name.to_string(),
        passed: CheckResult::pass_from_p(Some(p), 0.01),
        p_value: Some(p),
        statistic: observed_rate,
        details: format!(
            "rejected={rejections}/{experiments} ({:.2}%), nominal={:.2}%",
            observed_rate * 100.0,
            nominal_rate * 100.0
        ),
        grade: CheckResult::grade_from_p(Some(p)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform_sample(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.random::<f64>()).collect()
    }

    #[test]
    fn test_grade_from_p() {
        assert_eq!(CheckResult::grade_from_p(Some(0.5)), 'A');
        assert_eq!(CheckResult::grade_from_p(Some(0.05)), 'B');
        assert_eq!(CheckResult::grade_from_p(Some(0.005)), 'C');
        assert_eq!(CheckResult::grade_from_p(Some(0.0005)), 'D');
        assert_eq!(CheckResult::grade_from_p(Some(0.00000001)), 'F');
        assert_eq!(CheckResult::grade_from_p(None), 'F');
    }

    #[test]
    fn test_percentile_interpolates_like_numpy() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&sorted, 50.0), Some(2.5));
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&sorted, 100.0), Some(4.0));
        let p95 = percentile_sorted(&sorted, 95.0).unwrap();
        assert!((p95 - 3.85).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let values: Vec<f64> = (0..=100).rev().map(f64::from).collect();
        let p = percentile(&values, 95.0).unwrap();
        assert!((p - 95.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_rejects_bad_input() {
        assert_eq!(percentile_sorted(&[], 50.0), None);
        assert_eq!(percentile_sorted(&[1.0], 101.0), None);
        assert_eq!(percentile_sorted(&[1.0], -1.0), None);
        assert_eq!(percentile_sorted(&[7.0], 95.0), Some(7.0));
    }

    #[test]
    fn test_empirical_p_value() {
        let sorted: Vec<f64> = (0..99).map(f64::from).collect();
        // 10 values (89..=98) are >= 89
        let p = empirical_p_value(&sorted, 89.0);
        assert!((p - 11.0 / 100.0).abs() < 1e-12);
        // Nothing reaches 1000, but the p-value never hits zero.
        assert!((empirical_p_value(&sorted, 1000.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interval_brackets_estimate() {
        let mut sample = uniform_sample(10_000, 7);
        sort_values(&mut sample);
        let p95 = percentile_sorted(&sample, 95.0).unwrap();
        let (lo, hi) = percentile_interval(&sample, 95.0, 0.99).unwrap();
        assert!(lo <= p95 && p95 <= hi, "{lo} <= {p95} <= {hi}");
        assert!(lo < 0.95 && hi > 0.95);
        assert!(hi - lo < 0.05);
    }

    #[test]
    fn test_summarize_uniform() {
        let sample = uniform_sample(20_000, 11);
        let s = summarize(&sample, 10);
        assert_eq!(s.n, 20_000);
        assert!((s.mean - 0.5).abs() < 0.02);
        assert!((s.std_dev - (1.0f64 / 12.0).sqrt()).abs() < 0.02);
        assert!(s.skewness.abs() < 0.1);
        assert_eq!(s.histogram.len(), 10);
        let total: u64 = s.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 20_000);
    }

    #[test]
    fn test_summarize_constant_and_empty() {
        let s = summarize(&[0.25; 8], 4);
        assert_eq!(s.histogram[0].count, 8);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(summarize(&[], 4).n, 0);
    }

    #[test]
    fn test_false_positive_check_nominal_rate_passes() {
        let result = false_positive_check(5, 100, 0.05);
        assert!(result.passed, "{}", result.details);
        assert!(result.p_value.unwrap() > 0.5);
    }

    #[test]
    fn test_false_positive_check_inflated_rate_fails() {
        let result = false_positive_check(40, 100, 0.05);
        assert!(!result.passed);
        assert_eq!(result.grade, 'F');
    }

    #[test]
    fn test_false_positive_check_insufficient() {
        let result = false_positive_check(1, 5, 0.05);
        assert!(!result.passed);
        assert!(result.details.contains("Insufficient"));
    }
}
