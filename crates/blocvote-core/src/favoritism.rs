//! Monte Carlo favoritism test for one donor → recipient pair.
//!
//! The observed mean of the pair's normalized allocations over its applicable
//! span is compared against the `confidence_percentile` of a simulated null
//! distribution for the same span.
//!
//! Results are subject to Monte Carlo sampling error. Two runs with identical
//! inputs but different generator states can disagree when the observed mean
//! sits near the threshold; pass a seeded generator to reproduce a run.

use std::fmt;

use rand::Rng;
use serde::Serialize;

use blocvote_stats::NullSummary;

use crate::config::TestConfig;
use crate::error::{QueryError, Result};
use crate::period::PeriodRange;
use crate::record::{Entity, Period};
use crate::session::AnalysisSession;
use crate::simulate::{NullDistribution, VoteSimulator, span_periods};
use crate::year_stats::YearStats;

/// Confidence of the order-statistic interval reported around the threshold.
const THRESHOLD_INTERVAL_CONFIDENCE: f64 = 0.99;
/// Histogram resolution of the reported null summary.
const SUMMARY_BINS: usize = 40;

/// Outcome of a favoritism test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FavoritismResult {
    /// The donor never had a record for this recipient in the range. Not the
    /// same as "tested and not significant".
    NoData,
    NotSignificant,
    Significant {
        observed_mean: f64,
        threshold_value: f64,
    },
}

impl FavoritismResult {
    pub fn is_significant(&self) -> bool {
        matches!(self, Self::Significant { .. })
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

impl fmt::Display for FavoritismResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data"),
            Self::NotSignificant => write!(f, "not significant"),
            Self::Significant {
                observed_mean,
                threshold_value,
            } => write!(
                f,
                "significant ({:.2}% > {:.2}%)",
                observed_mean * 100.0,
                threshold_value * 100.0
            ),
        }
    }
}

/// A validated donor → recipient query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritismQuery {
    pub donor: Entity,
    pub recipient: Entity,
    pub range: PeriodRange,
}

impl FavoritismQuery {
    /// Build a query, rejecting a donor that is its own recipient.
    pub fn new(donor: Entity, recipient: Entity, range: PeriodRange) -> Result<Self> {
        if donor == recipient {
            return Err(QueryError::SelfPair(donor).into());
        }
        Ok(Self {
            donor,
            recipient,
            range,
        })
    }
}

/// Full output of a test, for presentation and plotting.
#[derive(Debug, Clone, Serialize)]
pub struct FavoritismReport {
    pub donor: Entity,
    pub recipient: Entity,
    pub range: PeriodRange,
    pub result: FavoritismResult,
    pub applicable_span: Vec<Period>,
    pub observed_mean: Option<f64>,
    pub threshold_value: Option<f64>,
    /// Order-statistic interval around the threshold.
    pub threshold_interval: Option<(f64, f64)>,
    /// Upper-tail empirical p-value of the observed mean.
    pub p_value: Option<f64>,
    pub null_summary: Option<NullSummary>,
    /// Raw simulated trial means, only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<Vec<f64>>,
}

struct Evaluation {
    span: Vec<YearStats>,
    observed_mean: f64,
    threshold: f64,
    null: NullDistribution,
    raw: Option<Vec<f64>>,
}

/// Runs favoritism tests against a frozen [`AnalysisSession`].
#[derive(Debug, Clone, Copy)]
pub struct FavoritismTester<'a> {
    session: &'a AnalysisSession,
    config: TestConfig,
}

impl<'a> FavoritismTester<'a> {
    pub fn new(session: &'a AnalysisSession, config: TestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { session, config })
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn session(&self) -> &'a AnalysisSession {
        self.session
    }

    /// Periods in `range` where `donor → recipient` has a record and the
    /// donor had at least one eligible recipient, with the pair's normalized
    /// allocation in each.
    pub fn applicable_span(
        &self,
        donor: &Entity,
        recipient: &Entity,
        range: PeriodRange,
    ) -> Result<Vec<(YearStats, f64)>> {
        let Some(history) = self.session.history(donor, recipient) else {
            return Ok(Vec::new());
        };
        let mut span = Vec::new();
        for (&period, &pct) in history.range(range.start()..=range.end()) {
            let stats = *self.session.year_stats().get(period)?;
            if stats.eligible_recipients() < 1 {
                log::debug!("{donor} -> {recipient}: skipping {period}, no eligible recipients");
                continue;
            }
            span.push((stats, pct));
        }
        Ok(span)
    }

    /// Test whether `donor` favors `recipient` over `range`.
    ///
    /// A donor paired with itself yields [`FavoritismResult::NoData`] without
    /// running a simulation.
    pub fn test(
        &self,
        donor: &Entity,
        recipient: &Entity,
        range: PeriodRange,
        rng: &mut impl Rng,
    ) -> Result<FavoritismResult> {
        Ok(match self.evaluate(donor, recipient, range, false, rng)? {
            None => FavoritismResult::NoData,
            Some(eval) => Self::decide(&eval),
        })
    }

    pub fn test_query(&self, query: &FavoritismQuery, rng: &mut impl Rng) -> Result<FavoritismResult> {
        self.test(&query.donor, &query.recipient, query.range, rng)
    }

    /// Like [`test`](Self::test) but returns everything a presentation layer
    /// needs: span, observed mean, threshold, p-value, null summary, and the
    /// raw batch when `keep_batch` is set.
    pub fn test_detailed(
        &self,
        donor: &Entity,
        recipient: &Entity,
        range: PeriodRange,
        keep_batch: bool,
        rng: &mut impl Rng,
    ) -> Result<FavoritismReport> {
        let mut report = FavoritismReport {
            donor: donor.clone(),
            recipient: recipient.clone(),
            range,
            result: FavoritismResult::NoData,
            applicable_span: Vec::new(),
            observed_mean: None,
            threshold_value: None,
            threshold_interval: None,
            p_value: None,
            null_summary: None,
            batch: None,
        };
        let Some(eval) = self.evaluate(donor, recipient, range, keep_batch, rng)? else {
            return Ok(report);
        };

        report.result = Self::decide(&eval);
        report.applicable_span = span_periods(&eval.span);
        report.observed_mean = Some(eval.observed_mean);
        report.threshold_value = Some(eval.threshold);
        report.threshold_interval = eval.null.percentile_interval(
            self.config.confidence_percentile,
            THRESHOLD_INTERVAL_CONFIDENCE,
        );
        report.p_value = Some(eval.null.p_value(eval.observed_mean));
        report.null_summary = Some(eval.null.summary(SUMMARY_BINS));
        report.batch = eval.raw;
        Ok(report)
    }

    fn decide(eval: &Evaluation) -> FavoritismResult {
        if eval.observed_mean > eval.threshold {
            FavoritismResult::Significant {
                observed_mean: eval.observed_mean,
                threshold_value: eval.threshold,
            }
        } else {
            FavoritismResult::NotSignificant
        }
    }

    fn evaluate(
        &self,
        donor: &Entity,
        recipient: &Entity,
        range: PeriodRange,
        keep_batch: bool,
        rng: &mut impl Rng,
    ) -> Result<Option<Evaluation>> {
        if donor == recipient {
            return Ok(None);
        }
        let applicable = self.applicable_span(donor, recipient, range)?;
        if applicable.is_empty() {
            log::debug!("{donor} -> {recipient} in {range}: no data");
            return Ok(None);
        }

        let observed_mean =
            applicable.iter().map(|(_, pct)| pct).sum::<f64>() / applicable.len() as f64;
        let span: Vec<YearStats> = applicable.into_iter().map(|(s, _)| s).collect();

        let batch = VoteSimulator::new(&span)?.simulate(self.config.num_trials, rng);
        let raw = keep_batch.then(|| batch.values().to_vec());
        let null = batch.into_distribution();
        let threshold = null
            .percentile(self.config.confidence_percentile)
            .ok_or(QueryError::ZeroTrials)?;

        log::debug!(
            "{donor} -> {recipient} in {range}: {} periods, observed {observed_mean:.4}, threshold {threshold:.4}",
            span.len()
        );

        Ok(Some(Evaluation {
            span,
            observed_mean,
            threshold,
            null,
            raw,
        }))
    }
}
