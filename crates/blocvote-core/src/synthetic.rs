//! Synthetic contests for calibration.
//!
//! Every donor ranks the other participants by a uniform random permutation,
//! which is exactly the null model the simulator assumes. Planted favors move
//! a chosen recipient to rank 1 for one donor in every period.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::record::{AllocationRecord, Channel, Entity, Period};
use crate::simulate::points_for_rank;

/// Generator of null-model allocation records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticContest {
    participants: usize,
    periods: usize,
    first_period: Period,
    secondary: bool,
    favors: Vec<(usize, usize)>,
}

impl SyntheticContest {
    pub fn new(participants: usize, periods: usize) -> Self {
        Self {
            participants,
            periods,
            first_period: 2000,
            secondary: false,
            favors: Vec::new(),
        }
    }

    pub fn starting_at(mut self, first_period: Period) -> Self {
        self.first_period = first_period;
        self
    }

    /// Emit an independently ranked secondary channel as well. Combine with a
    /// `first_period` at or after the secondary cutoff, or the normalizer will
    /// discard it.
    pub fn with_secondary_channel(mut self) -> Self {
        self.secondary = true;
        self
    }

    /// `donor` ranks `recipient` first in every period and channel.
    pub fn with_favor(mut self, donor: usize, recipient: usize) -> Self {
        self.favors.push((donor, recipient));
        self
    }

    /// Name of participant `i`.
    pub fn entity(i: usize) -> Entity {
        Entity::new(format!("P{i:03}"))
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> {
        let first = self.first_period;
        (0..self.periods).map(move |i| first.saturating_add(i as Period))
    }

    pub fn generate(&self, rng: &mut impl Rng) -> Vec<AllocationRecord> {
        let names: Vec<Entity> = (0..self.participants).map(Self::entity).collect();
        let channels: &[Channel] = if self.secondary {
            &[Channel::Primary, Channel::Secondary]
        } else {
            &[Channel::Primary]
        };

        let mut records = Vec::new();
        for period in self.periods() {
            for donor in 0..self.participants {
                let favorite = self
                    .favors
                    .iter()
                    .find(|(d, _)| *d == donor)
                    .map(|&(_, r)| r);
                for &channel in channels {
                    let mut ranking: Vec<usize> =
                        (0..self.participants).filter(|&r| r != donor).collect();
                    ranking.shuffle(rng);
                    if let Some(fav) = favorite {
                        ranking.sort_by_key(|&r| r != fav);
                    }
                    for (rank, &recipient) in ranking.iter().enumerate() {
                        records.push(AllocationRecord {
                            period,
                            channel,
                            donor: names[donor].clone(),
                            recipient: names[recipient].clone(),
                            points: points_for_rank(rank as u32 + 1),
                        });
                    }
                }
            }
        }
        records
    }
}
