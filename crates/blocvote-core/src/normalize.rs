//! Channel merging and percentage normalization.
//!
//! Raw per-channel records are canonicalized, merged into one
//! [`CombinedRecord`] per (period, donor, recipient), and divided by the
//! period's normalization basis from [`YearStatsTable`].

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::record::{
    AllocationRecord, Channel, CombinedRecord, Entity, NormalizedRecord, Period,
    SECONDARY_CHANNEL_CUTOFF,
};
use crate::year_stats::YearStatsTable;

/// Name variant → canonical entity table.
///
/// Deserializes from a flat JSON object, e.g.
/// `{"F.Y.R. Macedonia": "North Macedonia"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityAliases {
    aliases: HashMap<String, Entity>,
}

impl EntityAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, variant: impl Into<String>, canonical: impl Into<Entity>) -> Self {
        self.aliases.insert(variant.into(), canonical.into());
        self
    }

    /// Canonical form of `name`; names without an alias map to themselves.
    pub fn canonical(&self, name: &Entity) -> Entity {
        self.aliases
            .get(name.as_str())
            .cloned()
            .unwrap_or_else(|| name.clone())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Merges channel records and normalizes them against year statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordNormalizer {
    secondary_cutoff: Period,
    aliases: EntityAliases,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self {
            secondary_cutoff: SECONDARY_CHANNEL_CUTOFF,
            aliases: EntityAliases::default(),
        }
    }
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the first period with a secondary channel.
    pub fn with_cutoff(mut self, cutoff: Period) -> Self {
        self.secondary_cutoff = cutoff;
        self
    }

    pub fn with_aliases(mut self, aliases: EntityAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn secondary_cutoff(&self) -> Period {
        self.secondary_cutoff
    }

    /// Merge primary and secondary records per (period, donor, recipient).
    ///
    /// Outer-join semantics: a recipient that only appears in the secondary
    /// channel still gets a combined record with `points_primary = 0`. Before
    /// the cutoff the secondary channel did not exist, so its points are forced
    /// to zero; a secondary-only pair still yields a combined record, worth 0.
    ///
    /// Duplicate keys (after alias canonicalization) and self-allocations are
    /// upstream corruption and abort the merge. Output is sorted by
    /// (period, donor, recipient).
    pub fn combine(&self, records: &[AllocationRecord]) -> Result<Vec<CombinedRecord>, DataError> {
        let mut seen: HashSet<(Period, Channel, Entity, Entity)> =
            HashSet::with_capacity(records.len());
        let mut merged: BTreeMap<(Period, Entity, Entity), (u32, u32)> = BTreeMap::new();
        let mut zeroed_secondary = 0usize;

        for r in records {
            let donor = self.aliases.canonical(&r.donor);
            let recipient = self.aliases.canonical(&r.recipient);
            if donor == recipient {
                return Err(DataError::SelfAllocation {
                    period: r.period,
                    entity: donor,
                });
            }
            if !seen.insert((r.period, r.channel, donor.clone(), recipient.clone())) {
                return Err(DataError::DuplicateRecord {
                    period: r.period,
                    channel: r.channel,
                    donor,
                    recipient,
                });
            }

            match r.channel {
                Channel::Primary => {
                    merged.entry((r.period, donor, recipient)).or_default().0 = r.points;
                }
                Channel::Secondary if r.period < self.secondary_cutoff => {
                    merged.entry((r.period, donor, recipient)).or_default();
                    zeroed_secondary += 1;
                }
                Channel::Secondary => {
                    merged.entry((r.period, donor, recipient)).or_default().1 = r.points;
                }
            }
        }

        if zeroed_secondary > 0 {
            log::warn!(
                "zeroed {zeroed_secondary} secondary record(s) dated before {}",
                self.secondary_cutoff
            );
        }

        Ok(merged
            .into_iter()
            .map(
                |((period, donor, recipient), (points_primary, points_secondary))| CombinedRecord {
                    period,
                    donor,
                    recipient,
                    points_primary,
                    points_secondary,
                },
            )
            .collect())
    }

    /// Express each combined record as a fraction of its period's
    /// `max_points_receivable`.
    pub fn normalize(
        &self,
        combined: &[CombinedRecord],
        stats: &YearStatsTable,
    ) -> Result<Vec<NormalizedRecord>, DataError> {
        let mut above_one = 0usize;
        let out = combined
            .iter()
            .map(|c| {
                let basis = stats.get(c.period)?.max_points_receivable;
                if basis == 0 {
                    return Err(DataError::ZeroBasis(c.period));
                }
                let pct = f64::from(c.points_total()) / f64::from(basis);
                if pct > 1.0 {
                    above_one += 1;
                }
                Ok(NormalizedRecord {
                    combined: c.clone(),
                    points_total_pct: pct,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if above_one > 0 {
            log::warn!("{above_one} normalized record(s) exceed 1.0 of their period basis");
        }
        Ok(out)
    }
}
