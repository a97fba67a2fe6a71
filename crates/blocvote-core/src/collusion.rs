//! Mutual favoritism.

use rand::Rng;
use serde::Serialize;

use crate::config::TestConfig;
use crate::error::Result;
use crate::favoritism::{FavoritismResult, FavoritismTester};
use crate::period::PeriodRange;
use crate::record::Entity;
use crate::session::AnalysisSession;

/// Both directional results of a collusion test, in canonical entity order.
#[derive(Debug, Clone, Serialize)]
pub struct CollusionReport {
    pub first: Entity,
    pub second: Entity,
    pub range: PeriodRange,
    /// `first → second`.
    pub forward: FavoritismResult,
    /// `second → first`.
    pub backward: FavoritismResult,
}

impl CollusionReport {
    /// True iff both directions are significant. No data in either direction
    /// counts as false.
    pub fn is_collusive(&self) -> bool {
        self.forward.is_significant() && self.backward.is_significant()
    }
}

/// Tests two entities for favoritism in both directions.
#[derive(Debug, Clone, Copy)]
pub struct CollusionTester<'a> {
    tester: FavoritismTester<'a>,
}

impl<'a> CollusionTester<'a> {
    pub fn new(session: &'a AnalysisSession, config: TestConfig) -> Result<Self> {
        Ok(Self::from_tester(FavoritismTester::new(session, config)?))
    }

    pub fn from_tester(tester: FavoritismTester<'a>) -> Self {
        Self { tester }
    }

    pub fn test(
        &self,
        x: &Entity,
        y: &Entity,
        range: PeriodRange,
        rng: &mut impl Rng,
    ) -> Result<bool> {
        Ok(self.test_detailed(x, y, range, rng)?.is_collusive())
    }

    /// The pair is always evaluated lower entity first, so `(x, y)` and
    /// `(y, x)` draw from the generator in the same order and agree.
    pub fn test_detailed(
        &self,
        x: &Entity,
        y: &Entity,
        range: PeriodRange,
        rng: &mut impl Rng,
    ) -> Result<CollusionReport> {
        let (first, second) = if x <= y { (x, y) } else { (y, x) };
        let forward = self.tester.test(first, second, range, rng)?;
        let backward = self.tester.test(second, first, range, rng)?;
        Ok(CollusionReport {
            first: first.clone(),
            second: second.clone(),
            range,
            forward,
            backward,
        })
    }
}
