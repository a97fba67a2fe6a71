//! Error types for the favoritism engine.
//!
//! Two families are kept apart: [`DataError`] means the upstream record set is
//! corrupt and the affected computation must abort, [`QueryError`] means the
//! caller asked for something that cannot be tested. "No data" is neither: it
//! is the [`FavoritismResult::NoData`](crate::FavoritismResult::NoData) value.

use crate::record::{Channel, Entity, Period};

/// Malformed, duplicate, or missing upstream records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// Two raw records share a (period, channel, donor, recipient) key.
    #[error("duplicate {channel} record for {donor} -> {recipient} in {period}")]
    DuplicateRecord {
        /// Period of the duplicated key.
        period: Period,
        /// Channel of the duplicated key.
        channel: Channel,
        /// Donor of the duplicated key.
        donor: Entity,
        /// Recipient of the duplicated key.
        recipient: Entity,
    },

    /// A record allocates points from an entity to itself.
    #[error("{entity} allocates points to itself in {period}")]
    SelfAllocation {
        /// Period of the record.
        period: Period,
        /// The offending entity.
        entity: Entity,
    },

    /// A period that must be analyzed has no records at all.
    #[error("period {0} has no allocation records")]
    EmptyPeriod(Period),

    /// A period was looked up that the year-stats table does not contain.
    #[error("no year statistics for period {0}")]
    MissingPeriod(Period),

    /// Nobody received any points in a period, so nothing can be normalized.
    #[error("period {0} has a zero normalization basis")]
    ZeroBasis(Period),
}

/// A query rejected before any simulation work.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// Favoritism of an entity toward itself is undefined.
    #[error("donor and recipient are both {0}")]
    SelfPair(Entity),

    /// `start` is after `end`.
    #[error("empty period range {start}..={end}")]
    EmptyRange {
        /// Requested first period.
        start: Period,
        /// Requested last period.
        end: Period,
    },

    /// `num_trials` must be positive.
    #[error("num_trials must be at least 1")]
    ZeroTrials,

    /// `confidence_percentile` must lie in `[0, 100]`.
    #[error("confidence percentile {0} is outside [0, 100]")]
    PercentileOutOfRange(f64),

    /// The simulator was handed no periods.
    #[error("cannot simulate an empty period span")]
    EmptySpan,

    /// A period in the simulated span has fewer than two participants.
    #[error("period {0} has no eligible recipients")]
    NoEligibleRecipients(Period),

    /// An entity name that does not occur in the data set.
    #[error("unknown entity {0}")]
    UnknownEntity(String),

    /// A period range string that could not be parsed.
    #[error("invalid period range {0:?}, expected START-END or YEAR")]
    BadRange(String),
}

/// Top-level error of the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Corrupt upstream data.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Rejected query.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A matrix compilation was cancelled between pairs.
    #[error("cancelled after {completed} of {total} pairs")]
    Cancelled {
        /// Pairs finished before the flag was observed.
        completed: usize,
        /// Pairs scheduled.
        total: usize,
    },

    /// A configuration file could not be read or parsed.
    #[error("config {path}: {message}")]
    Config {
        /// File path as given.
        path: String,
        /// Underlying I/O or parse error.
        message: String,
    },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
