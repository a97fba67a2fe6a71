//! # blocvote-core
//!
//! **Is that twelve points a vote or a favor?**
//!
//! `blocvote-core` tests whether one participant in a repeated, rank-based
//! point contest allocates points to another more generously than a
//! non-favoring voter would, and whether two participants do so for each
//! other.
//!
//! ## Quick Start
//!
//! ```no_run
//! use blocvote_core::{
//!     AllocationRecord, AnalysisSession, Channel, FavoritismTester, PeriodRange,
//!     RecordNormalizer, TestConfig,
//! };
//! use rand::SeedableRng;
//!
//! let records: Vec<AllocationRecord> = vec![
//!     AllocationRecord::new(2019, Channel::Primary, "Cyprus", "Greece", 12),
//!     // ...
//! ];
//! let session = AnalysisSession::from_records(&records, &RecordNormalizer::new())?;
//! let tester = FavoritismTester::new(&session, TestConfig::default())?;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let result = tester.test(
//!     &"Cyprus".into(),
//!     &"Greece".into(),
//!     PeriodRange::new(2000, 2019)?,
//!     &mut rng,
//! )?;
//! println!("{result}");
//! # Ok::<(), blocvote_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Records → Normalizer (merge channels) → YearStats (basis) → Session (frozen)
//! → Simulator (null) → Favoritism → Collusion / Matrix
//!
//! The session is built once and shared read-only. Randomness is always an
//! explicit generator handle supplied by the caller; nothing in the crate
//! touches a global generator except to draw a base seed when none is
//! configured.

pub mod collusion;
pub mod config;
pub mod error;
pub mod favoritism;
pub mod matrix;
pub mod normalize;
pub mod period;
pub mod record;
pub mod session;
pub mod simulate;
pub mod synthetic;
pub mod year_stats;

pub use collusion::{CollusionReport, CollusionTester};
pub use config::{DEFAULT_CONFIDENCE_PERCENTILE, DEFAULT_NUM_TRIALS, TestConfig};
pub use error::{DataError, Error, QueryError, Result};
pub use favoritism::{FavoritismQuery, FavoritismReport, FavoritismResult, FavoritismTester};
pub use matrix::{
    FavoritismMatrix, MatrixCompiler, MatrixOptions, MatrixProgress, SignificantPair,
};
pub use normalize::{EntityAliases, RecordNormalizer};
pub use period::PeriodRange;
pub use record::{
    AllocationRecord, Channel, CombinedRecord, Entity, NormalizedRecord, Period,
    SECONDARY_CHANNEL_CUTOFF,
};
pub use session::{AnalysisSession, PairHistory};
pub use simulate::{NullDistribution, SCORE_LADDER, SimulationBatch, VoteSimulator, points_for_rank};
pub use synthetic::SyntheticContest;
pub use year_stats::{YearStats, YearStatsTable};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
