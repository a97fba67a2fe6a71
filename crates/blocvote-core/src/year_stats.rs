//! Per-period statistics: participant count and normalization basis.
//!
//! The table is built once from the full combined record set and frozen.
//! Every downstream component borrows it; nothing recomputes or mutates it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::record::{CombinedRecord, Entity, Period};

/// Statistics of one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearStats {
    pub period: Period,
    /// Distinct donors that submitted at least one record.
    pub participant_count: u32,
    /// Largest primary allocation plus largest secondary allocation observed.
    /// Taken from the data rather than the ladder because not every period
    /// awarded the full ladder through both channels.
    pub max_points_receivable: u32,
    pub has_secondary_channel: bool,
}

impl YearStats {
    /// Recipients a donor could rank this period (everyone but itself).
    pub fn eligible_recipients(&self) -> u32 {
        self.participant_count.saturating_sub(1)
    }
}

#[derive(Default)]
struct Accumulator<'a> {
    donors: BTreeSet<&'a Entity>,
    max_primary: u32,
    max_secondary: u32,
    records: usize,
}

/// Immutable period → [`YearStats`] map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearStatsTable {
    stats: BTreeMap<Period, YearStats>,
}

impl YearStatsTable {
    /// Build stats for every period present in `records`.
    pub fn build(records: &[CombinedRecord]) -> Result<Self, DataError> {
        let periods: BTreeSet<Period> = records.iter().map(|r| r.period).collect();
        Self::build_for_periods(records, &periods)
    }

    /// Build stats for exactly `periods`, failing if any of them has no
    /// records. Records outside `periods` are ignored.
    pub fn build_for_periods(
        records: &[CombinedRecord],
        periods: &BTreeSet<Period>,
    ) -> Result<Self, DataError> {
        let mut acc: BTreeMap<Period, Accumulator<'_>> =
            periods.iter().map(|&p| (p, Accumulator::default())).collect();

        for r in records {
            let Some(a) = acc.get_mut(&r.period) else {
                continue;
            };
            a.donors.insert(&r.donor);
            a.max_primary = a.max_primary.max(r.points_primary);
            a.max_secondary = a.max_secondary.max(r.points_secondary);
            a.records += 1;
        }

        let mut stats = BTreeMap::new();
        for (period, a) in acc {
            if a.records == 0 {
                return Err(DataError::EmptyPeriod(period));
            }
            let participant_count = a.donors.len() as u32;
            let s = YearStats {
                period,
                participant_count,
                max_points_receivable: a.max_primary + a.max_secondary,
                has_secondary_channel: a.max_secondary > 0,
            };
            log::debug!(
                "period {period}: {participant_count} participants, basis {}, secondary={}",
                s.max_points_receivable,
                s.has_secondary_channel
            );
            stats.insert(period, s);
        }

        Ok(Self { stats })
    }

    pub fn get(&self, period: Period) -> Result<&YearStats, DataError> {
        self.stats
            .get(&period)
            .ok_or(DataError::MissingPeriod(period))
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.stats.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &YearStats> {
        self.stats.values()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
