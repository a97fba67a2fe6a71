//! Frozen analysis session.
//!
//! An [`AnalysisSession`] is built once from raw allocation records:
//!
//! ```text
//! AllocationRecord[] → combine → YearStatsTable → normalize → index
//! ```
//!
//! After construction it is read-only and `Sync`, so every favoritism test,
//! including those running on matrix worker threads, borrows the same tables.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::DataError;
use crate::normalize::RecordNormalizer;
use crate::period::PeriodRange;
use crate::record::{AllocationRecord, CombinedRecord, Entity, NormalizedRecord, Period};
use crate::year_stats::YearStatsTable;

/// Normalized allocations of one donor → recipient pair, keyed by period.
pub type PairHistory = BTreeMap<Period, f64>;

/// Immutable year statistics plus normalized records indexed by pair.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    stats: YearStatsTable,
    records: Vec<NormalizedRecord>,
    pairs: BTreeMap<(Entity, Entity), PairHistory>,
}

impl AnalysisSession {
    /// Build a session from raw per-channel records.
    pub fn from_records(
        records: &[AllocationRecord],
        normalizer: &RecordNormalizer,
    ) -> Result<Self, DataError> {
        let combined = normalizer.combine(records)?;
        Self::from_combined(&combined, normalizer)
    }

    /// Build a session from already merged records.
    pub fn from_combined(
        combined: &[CombinedRecord],
        normalizer: &RecordNormalizer,
    ) -> Result<Self, DataError> {
        let stats = YearStatsTable::build(combined)?;
        let records = normalizer.normalize(combined, &stats)?;

        let mut pairs: BTreeMap<(Entity, Entity), PairHistory> = BTreeMap::new();
        for r in &records {
            pairs
                .entry((r.donor().clone(), r.recipient().clone()))
                .or_default()
                .insert(r.period(), r.points_total_pct);
        }

        log::info!(
            "analysis session: {} records, {} periods, {} donor/recipient pairs",
            records.len(),
            stats.len(),
            pairs.len()
        );

        Ok(Self {
            stats,
            records,
            pairs,
        })
    }

    pub fn year_stats(&self) -> &YearStatsTable {
        &self.stats
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    /// Normalized history of `donor → recipient`, if the pair ever occurred.
    pub fn history(&self, donor: &Entity, recipient: &Entity) -> Option<&PairHistory> {
        self.pairs.get(&(donor.clone(), recipient.clone()))
    }

    /// All entities seen as donor or recipient, sorted.
    pub fn entities(&self) -> Vec<Entity> {
        self.collect_entities(|_| true)
    }

    /// Donors and recipients with at least one record inside `range`, sorted.
    pub fn entities_in(&self, range: PeriodRange) -> Vec<Entity> {
        self.collect_entities(|history| {
            history.range(range.start()..=range.end()).next().is_some()
        })
    }

    /// Look up an entity by exact name, falling back to a case-insensitive
    /// match.
    pub fn find_entity(&self, name: &str) -> Option<Entity> {
        let mut names = self.pairs.keys().flat_map(|(d, r)| [d, r]);
        names
            .clone()
            .find(|e| e.as_str() == name)
            .or_else(|| names.find(|e| e.as_str().eq_ignore_ascii_case(name)))
            .cloned()
    }

    fn collect_entities(&self, keep: impl Fn(&PairHistory) -> bool) -> Vec<Entity> {
        let mut set = BTreeSet::new();
        for ((donor, recipient), history) in &self.pairs {
            if keep(history) {
                set.insert(donor);
                set.insert(recipient);
            }
        }
        set.into_iter().cloned().collect()
    }
}
