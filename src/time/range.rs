// src/time/range.rs

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::errors::{Result, WindagError};
use crate::time::Granularity;

/// An immutable window `[from, to)` expressed as a whole number of
/// granularity units.
///
/// `to` is always `granularity.next(from, intervals)`. A range parsed from a
/// single token spans one unit; an `"A/B"` token spans however many units lie
/// between `A` and `B`, and [`next`](Self::next) / [`prev`](Self::prev) shift
/// by that whole span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    from: NaiveDateTime,
    to: NaiveDateTime,
    granularity: Granularity,
    intervals: u32,
}

impl TimeRange {
    pub fn new(from: NaiveDateTime, granularity: Granularity, intervals: u32) -> Self {
        Self {
            from,
            to: granularity.next(from, intervals),
            granularity,
            intervals,
        }
    }

    /// Parse a single token (`2015-10-11T11`) or an interval (`2015-11/2016-02`).
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();

        let Some((start, end)) = token.split_once('/') else {
            let (granularity, from) = Granularity::detect(token)?;
            return Ok(Self::new(from, granularity, 1));
        };

        let (start_granularity, from) = Granularity::detect(start)?;
        let (end_granularity, to) = Granularity::detect(end)?;
        if start_granularity != end_granularity {
            return Err(WindagError::MixedGranularity(token.to_string()));
        }
        if from > to {
            return Err(WindagError::ReversedRange(token.to_string()));
        }

        // Shifts take a signed unit count.
        let intervals = i32::try_from(start_granularity.units_between(from, to))
            .map(i32::unsigned_abs)
            .map_err(|_| WindagError::InvalidTimeValue {
                token: token.to_string(),
                reason: "interval too long".to_string(),
            })?;

        Ok(Self::new(from, start_granularity, intervals))
    }

    pub fn from(&self) -> NaiveDateTime {
        self.from
    }

    /// Exclusive end of the window.
    pub fn to(&self) -> NaiveDateTime {
        self.to
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn intervals(&self) -> u32 {
        self.intervals
    }

    /// The adjacent window after this one, of the same length.
    pub fn next(&self) -> Self {
        Self::new(self.to, self.granularity, self.intervals)
    }

    /// The adjacent window before this one, of the same length.
    pub fn prev(&self) -> Self {
        Self::new(
            self.granularity.prev(self.from, self.intervals),
            self.granularity,
            self.intervals,
        )
    }

    /// Canonical token: the single-unit token for one-unit ranges, `A/B`
    /// otherwise. Always parses back to an equal range.
    pub fn format(&self) -> String {
        if self.intervals == 1 {
            self.granularity.format(self.from)
        } else {
            format!(
                "{}/{}",
                self.granularity.format(self.from),
                self.granularity.format(self.to)
            )
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for TimeRange {
    type Err = WindagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
