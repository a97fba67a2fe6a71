//! Allocation records at the three stages of the pipeline.
//!
//! ```text
//! AllocationRecord (one per channel) → CombinedRecord (channels merged)
//!     → NormalizedRecord (fraction of the period's max receivable points)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// One occurrence of the contest, identified by its year.
pub type Period = u16;

/// First period in which the secondary (public) channel existed.
pub const SECONDARY_CHANNEL_CUTOFF: Period = 2016;

/// Canonical identifier of a participating entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(String);

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Entity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Entity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Allocation stream a record was cast through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Expert (jury) allocation.
    Primary,
    /// Public (televote) allocation, introduced at [`SECONDARY_CHANNEL_CUTOFF`].
    Secondary,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// A single raw allocation as delivered by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub period: Period,
    pub channel: Channel,
    pub donor: Entity,
    pub recipient: Entity,
    pub points: u32,
}

impl AllocationRecord {
    pub fn new(
        period: Period,
        channel: Channel,
        donor: impl Into<Entity>,
        recipient: impl Into<Entity>,
        points: u32,
    ) -> Self {
        Self {
            period,
            channel,
            donor: donor.into(),
            recipient: recipient.into(),
            points,
        }
    }
}

/// Primary and secondary allocations of one (period, donor, recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub period: Period,
    pub donor: Entity,
    pub recipient: Entity,
    pub points_primary: u32,
    pub points_secondary: u32,
}

impl CombinedRecord {
    pub fn points_total(&self) -> u32 {
        self.points_primary + self.points_secondary
    }
}

/// A combined record expressed as a fraction of the period's maximum
/// receivable points.
///
/// `points_total_pct` normally lies in `[0, 1]`. It can exceed 1 slightly when
/// the normalization basis was set by a different donor than this one; that is
/// tolerated, not treated as corruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(flatten)]
    pub combined: CombinedRecord,
    pub points_total_pct: f64,
}

impl NormalizedRecord {
    pub fn period(&self) -> Period {
        self.combined.period
    }

    pub fn donor(&self) -> &Entity {
        &self.combined.donor
    }

    pub fn recipient(&self) -> &Entity {
        &self.combined.recipient
    }
}
