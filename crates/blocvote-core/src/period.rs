//! Inclusive period ranges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::record::Period;

/// Inclusive `[start, end]` range of periods. Always non-empty once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodRange {
    start: Period,
    end: Period,
}

impl PeriodRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: Period, end: Period) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering one period.
    pub fn single(period: Period) -> Self {
        Self {
            start: period,
            end: period,
        }
    }

    pub fn start(&self) -> Period {
        self.start
    }

    pub fn end(&self) -> Period {
        self.end
    }

    pub fn contains(&self, period: Period) -> bool {
        (self.start..=self.end).contains(&period)
    }

    /// Number of periods covered, counting both ends.
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Parse a comma-separated list such as `1975-1999,2000-2015,2019`.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, QueryError> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PeriodRange {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || QueryError::BadRange(s.to_string());
        match s.split_once('-') {
            Some((a, b)) => {
                let start = a.trim().parse().map_err(|_| bad())?;
                let end = b.trim().parse().map_err(|_| bad())?;
                Self::new(start, end)
            }
            None => s.trim().parse().map(Self::single).map_err(|_| bad()),
        }
    }
}
