//! Null-model vote simulation.
//!
//! A non-favoring donor ranks the `N - 1` other participants uniformly at
//! random and awards [`SCORE_LADDER`] to the top ten. Each trial draws one
//! rank per channel per period, normalizes the points by the period basis, and
//! averages over the span. All draws are independent, so the batch is filled
//! period by period over a flat accumulator instead of trial by trial.

use rand::Rng;
use serde::Serialize;

use blocvote_stats::{NullSummary, empirical_p_value, percentile_interval, percentile_sorted};

use crate::error::{DataError, Error, QueryError};
use crate::record::Period;
use crate::year_stats::YearStats;

/// Points for ranks 1 through 10. Rank 11 and below score nothing.
pub const SCORE_LADDER: [u32; 10] = [12, 10, 8, 7, 6, 5, 4, 3, 2, 1];

/// Points awarded at 1-based `rank`.
pub fn points_for_rank(rank: u32) -> u32 {
    match rank {
        0 => 0,
        r => SCORE_LADDER.get(r as usize - 1).copied().unwrap_or(0),
    }
}

#[derive(Debug, Clone, Copy)]
struct PeriodPlan {
    eligible: u32,
    secondary: bool,
    basis: f64,
}

/// Simulates a non-favoring donor over a fixed span of periods.
#[derive(Debug, Clone)]
pub struct VoteSimulator {
    plans: Vec<PeriodPlan>,
}

impl VoteSimulator {
    /// Prepare a simulator for `span`.
    ///
    /// Every period must have at least one eligible recipient and a positive
    /// basis; callers are expected to have dropped periods that do not.
    pub fn new(span: &[YearStats]) -> Result<Self, Error> {
        if span.is_empty() {
            return Err(QueryError::EmptySpan.into());
        }
        let plans = span
            .iter()
            .map(|s| {
                if s.eligible_recipients() < 1 {
                    return Err(Error::from(QueryError::NoEligibleRecipients(s.period)));
                }
                if s.max_points_receivable == 0 {
                    return Err(DataError::ZeroBasis(s.period).into());
                }
                Ok(PeriodPlan {
                    eligible: s.eligible_recipients(),
                    secondary: s.has_secondary_channel,
                    basis: f64::from(s.max_points_receivable),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { plans })
    }

    pub fn span_len(&self) -> usize {
        self.plans.len()
    }

    /// Run `num_trials` independent trials with the supplied generator.
    pub fn simulate(&self, num_trials: usize, rng: &mut impl Rng) -> SimulationBatch {
        let mut sums = vec![0.0f64; num_trials];
        for plan in &self.plans {
            for sum in sums.iter_mut() {
                let mut points = points_for_rank(rng.random_range(1..=plan.eligible));
                if plan.secondary {
                    points += points_for_rank(rng.random_range(1..=plan.eligible));
                }
                *sum += f64::from(points) / plan.basis;
            }
        }
        let span = self.plans.len() as f64;
        for sum in &mut sums {
            *sum /= span;
        }
        SimulationBatch { values: sums }
    }

    /// Exact expected trial value under the null model, used to sanity-check
    /// simulated batches.
    pub fn expected_mean(&self) -> f64 {
        let total: f64 = self
            .plans
            .iter()
            .map(|p| {
                let ranked = p.eligible.min(SCORE_LADDER.len() as u32);
                let ladder: u32 = (1..=ranked).map(points_for_rank).sum();
                let per_channel = f64::from(ladder) / f64::from(p.eligible);
                let channels = if p.secondary { 2.0 } else { 1.0 };
                per_channel * channels / p.basis
            })
            .sum();
        total / self.plans.len() as f64
    }
}

/// Simulated trial means in generation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimulationBatch {
    values: Vec<f64>,
}

impl SimulationBatch {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Sort into a [`NullDistribution`]. This is the single reduction point
    /// of a favoritism test.
    pub fn into_distribution(self) -> NullDistribution {
        let mut sorted = self.values;
        blocvote_stats::sort_values(&mut sorted);
        NullDistribution { sorted }
    }
}

/// Sorted null sample supporting percentile queries.
#[derive(Debug, Clone, PartialEq)]
pub struct NullDistribution {
    sorted: Vec<f64>,
}

impl NullDistribution {
    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Value at percentile `p` (0–100), linearly interpolated.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        percentile_sorted(&self.sorted, p)
    }

    /// Upper-tail empirical p-value of `observed`.
    pub fn p_value(&self, observed: f64) -> f64 {
        empirical_p_value(&self.sorted, observed)
    }

    /// Order-statistic interval for percentile `p` at `confidence`.
    pub fn percentile_interval(&self, p: f64, confidence: f64) -> Option<(f64, f64)> {
        percentile_interval(&self.sorted, p, confidence)
    }

    pub fn summary(&self, bins: usize) -> NullSummary {
        blocvote_stats::summarize(&self.sorted, bins)
    }
}

/// Period identifiers of a span, for reporting.
pub fn span_periods(span: &[YearStats]) -> Vec<Period> {
    span.iter().map(|s| s.period).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn year(period: Period, participants: u32, basis: u32, secondary: bool) -> YearStats {
        YearStats {
            period,
            participant_count: participants,
            max_points_receivable: basis,
            has_secondary_channel: secondary,
        }
    }

    #[test]
    fn test_points_for_rank() {
        assert_eq!(points_for_rank(1), 12);
        assert_eq!(points_for_rank(2), 10);
        assert_eq!(points_for_rank(3), 8);
        assert_eq!(points_for_rank(10), 1);
        assert_eq!(points_for_rank(11), 0);
        assert_eq!(points_for_rank(0), 0);
        assert_eq!(SCORE_LADDER.iter().sum::<u32>(), 58);
    }

    #[test]
    fn test_rejects_empty_and_degenerate_spans() {
        assert!(matches!(
            VoteSimulator::new(&[]),
            Err(Error::Query(QueryError::EmptySpan))
        ));
        assert!(matches!(
            VoteSimulator::new(&[year(1960, 1, 12, false)]),
            Err(Error::Query(QueryError::NoEligibleRecipients(1960)))
        ));
        assert!(matches!(
            VoteSimulator::new(&[year(1960, 5, 0, false)]),
            Err(Error::Data(DataError::ZeroBasis(1960)))
        ));
    }

    #[test]
    fn test_batch_size_and_bounds() {
        let sim = VoteSimulator::new(&[year(2000, 20, 12, false), year(2001, 20, 12, false)])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let batch = sim.simulate(5_000, &mut rng);
        assert_eq!(batch.len(), 5_000);
        assert!(batch.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_mean_matches_expectation() {
        let span = [
            year(2010, 25, 12, false),
            year(2017, 42, 24, true),
            year(2018, 43, 24, true),
        ];
        let sim = VoteSimulator::new(&span).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let batch = sim.simulate(100_000, &mut rng);
        let mean = batch.values().iter().sum::<f64>() / batch.len() as f64;
        let expected = sim.expected_mean();
        assert!(
            (mean - expected).abs() < 0.005,
            "simulated mean {mean} vs expected {expected}"
        );
    }

    #[test]
    fn test_small_field_always_scores() {
        // With 3 participants every draw lands on rank 1 or 2.
        let sim = VoteSimulator::new(&[year(1958, 3, 12, false)]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let batch = sim.simulate(1_000, &mut rng);
        for &v in batch.values() {
            assert!(v == 1.0 || v == 10.0 / 12.0, "unexpected value {v}");
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let sim = VoteSimulator::new(&[year(2019, 41, 24, true)]).unwrap();
        let a = sim.simulate(500, &mut StdRng::seed_from_u64(9));
        let b = sim.simulate(500, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distribution_percentile() {
        let sim = VoteSimulator::new(&[year(2000, 20, 12, false); 5]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let dist = sim.simulate(20_000, &mut rng).into_distribution();
        let p50 = dist.percentile(50.0).unwrap();
        let p95 = dist.percentile(95.0).unwrap();
        assert!(p50 <= p95);
        assert!(p95 < 1.0);
        assert!(dist.p_value(1.0) < 0.001);
        let (lo, hi) = dist.percentile_interval(95.0, 0.99).unwrap();
        assert!(lo <= p95 && p95 <= hi);
    }
}
