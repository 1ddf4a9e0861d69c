// src/time/granularity.rs

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Weekday};
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::errors::{Result, WindagError};
use crate::time::TimeRange;

/// Calendar unit used both to parse/format time tokens and to subdivide a
/// master range.
///
/// Variants are declared in order of increasing duration and the derived
/// `Ord` is relied upon: a task whose granularity compares greater than the
/// master range's granularity can never complete inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

/// Order in which single tokens are matched against granularity patterns.
///
/// The first granularity whose pattern matches wins. MONTH is tried before
/// WEEK so that a plain `YYYY-MM` is never mistaken for a week token.
pub const PARSE_PRECEDENCE: [Granularity; 6] = [
    Granularity::Second,
    Granularity::Minute,
    Granularity::Hour,
    Granularity::Day,
    Granularity::Month,
    Granularity::Week,
];

static SECOND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})[Tt](\d{2}):(\d{2}):(\d{2})$").expect("static pattern")
});
static MINUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})[Tt](\d{2}):(\d{2})$").expect("static pattern")
});
static HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})[Tt](\d{2})$").expect("static pattern"));
static DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("static pattern"));
static WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-[Ww](\d{1,2})$").expect("static pattern"));
static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("static pattern"));

impl Granularity {
    /// All granularities, finest first.
    pub const ALL: [Granularity; 6] = [
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Second => "second",
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// `chrono` format string producing the canonical token.
    pub fn pattern(&self) -> &'static str {
        match self {
            Granularity::Second => "%Y-%m-%dT%H:%M:%S",
            Granularity::Minute => "%Y-%m-%dT%H:%M",
            Granularity::Hour => "%Y-%m-%dT%H",
            Granularity::Day => "%Y-%m-%d",
            Granularity::Week => "%G-W%V",
            Granularity::Month => "%Y-%m",
        }
    }

    /// Length of one unit for the fixed-length granularities.
    fn fixed_unit(&self) -> Option<TimeDelta> {
        match self {
            Granularity::Second => Some(TimeDelta::seconds(1)),
            Granularity::Minute => Some(TimeDelta::minutes(1)),
            Granularity::Hour => Some(TimeDelta::hours(1)),
            Granularity::Day => Some(TimeDelta::days(1)),
            Granularity::Week => Some(TimeDelta::weeks(1)),
            Granularity::Month => None,
        }
    }

    /// Shift `instant` forward by `n` units. Counts above `i32::MAX` are
    /// clamped and the result saturates at the calendar limits.
    pub fn next(&self, instant: NaiveDateTime, n: u32) -> NaiveDateTime {
        match self.fixed_unit() {
            Some(unit) => unit
                .checked_mul(i32::try_from(n).unwrap_or(i32::MAX))
                .and_then(|delta| instant.checked_add_signed(delta))
                .unwrap_or(NaiveDateTime::MAX),
            None => instant
                .checked_add_months(Months::new(n))
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    /// Shift `instant` backward by `n` units. Counts above `i32::MAX` are
    /// clamped and the result saturates at the calendar limits.
    pub fn prev(&self, instant: NaiveDateTime, n: u32) -> NaiveDateTime {
        match self.fixed_unit() {
            Some(unit) => unit
                .checked_mul(i32::try_from(n).unwrap_or(i32::MAX))
                .and_then(|delta| instant.checked_sub_signed(delta))
                .unwrap_or(NaiveDateTime::MIN),
            None => instant
                .checked_sub_months(Months::new(n))
                .unwrap_or(NaiveDateTime::MIN),
        }
    }

    /// Number of whole units between `from` and `to` (negative if `to` is
    /// earlier). Partial units are truncated toward zero.
    pub fn units_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
        if let Some(unit) = self.fixed_unit() {
            return (to - from).num_seconds() / unit.num_seconds();
        }

        let mut months = (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64
            - from.month() as i64;
        if months > 0 && self.next(from, months as u32) > to {
            months -= 1;
        } else if months < 0 && self.prev(from, (-months) as u32) < to {
            months += 1;
        }
        months
    }

    /// Render `instant` as this granularity's canonical token.
    pub fn format(&self, instant: NaiveDateTime) -> String {
        instant.format(self.pattern()).to_string()
    }

    fn token_regex(&self) -> &'static Regex {
        match self {
            Granularity::Second => &SECOND_RE,
            Granularity::Minute => &MINUTE_RE,
            Granularity::Hour => &HOUR_RE,
            Granularity::Day => &DAY_RE,
            Granularity::Week => &WEEK_RE,
            Granularity::Month => &MONTH_RE,
        }
    }

    /// Try to read `token` with this granularity's pattern.
    ///
    /// Returns `Ok(None)` if the token does not have this shape at all, and
    /// an error if it has the shape but names an impossible instant
    /// (e.g. hour 25).
    pub fn parse_instant(&self, token: &str) -> Result<Option<NaiveDateTime>> {
        let Some(caps) = self.token_regex().captures(token) else {
            return Ok(None);
        };
        let invalid = |reason: &str| WindagError::InvalidTimeValue {
            token: token.to_string(),
            reason: reason.to_string(),
        };

        let date = match self {
            Granularity::Week => {
                let year = field(&caps, 1) as i32;
                let week = field(&caps, 2);
                NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
                    .ok_or_else(|| invalid("no such ISO week"))?
            }
            Granularity::Month => {
                NaiveDate::from_ymd_opt(field(&caps, 1) as i32, field(&caps, 2), 1)
                    .ok_or_else(|| invalid("no such month"))?
            }
            _ => NaiveDate::from_ymd_opt(field(&caps, 1) as i32, field(&caps, 2), field(&caps, 3))
                .ok_or_else(|| invalid("no such date"))?,
        };

        let (hour, minute, second) = match self {
            Granularity::Second => (field(&caps, 4), field(&caps, 5), field(&caps, 6)),
            Granularity::Minute => (field(&caps, 4), field(&caps, 5), 0),
            Granularity::Hour => (field(&caps, 4), 0, 0),
            _ => (0, 0, 0),
        };

        date.and_hms_opt(hour, minute, second)
            .map(Some)
            .ok_or_else(|| invalid("time of day out of range"))
    }

    /// Find the granularity of a single token, trying [`PARSE_PRECEDENCE`]
    /// in order.
    pub fn detect(token: &str) -> Result<(Granularity, NaiveDateTime)> {
        let token = token.trim();
        for granularity in PARSE_PRECEDENCE {
            if let Some(instant) = granularity.parse_instant(token)? {
                return Ok((granularity, instant));
            }
        }
        Err(WindagError::InvalidTimeFormat(token.to_string()))
    }

    /// Unit-length, contiguous intervals of this granularity covering
    /// `[master.from, master.to)`.
    ///
    /// Empty when this granularity is coarser than the master's: a task of
    /// that granularity can never complete within the window.
    pub fn ranges(&self, master: &TimeRange) -> Vec<TimeRange> {
        if *self > master.granularity() {
            return Vec::new();
        }

        let mut list = Vec::new();
        let mut cursor = master.from();
        while cursor < master.to() {
            let range = TimeRange::new(cursor, *self, 1);
            cursor = range.to();
            list.push(range);
        }
        list
    }
}

fn field(caps: &Captures<'_>, idx: usize) -> u32 {
    // Every group is `\d{1,4}`, so this never overflows.
    caps.get(idx)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "second" => Ok(Granularity::Second),
            "minute" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            other => Err(format!(
                "invalid granularity: {other} (expected second, minute, hour, day, week or month)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn ordering_follows_duration() {
        let mut sorted = Granularity::ALL;
        sorted.sort();
        assert_eq!(sorted, Granularity::ALL);
        assert!(Granularity::Second < Granularity::Minute);
        assert!(Granularity::Week < Granularity::Month);
    }

    #[test]
    fn precedence_is_explicit() {
        assert_eq!(
            PARSE_PRECEDENCE,
            [
                Granularity::Second,
                Granularity::Minute,
                Granularity::Hour,
                Granularity::Day,
                Granularity::Month,
                Granularity::Week,
            ]
        );
    }

    #[test]
    fn detect_picks_most_specific_pattern() {
        assert_eq!(Granularity::detect("2015-10-11T11:12:13").unwrap().0, Granularity::Second);
        assert_eq!(Granularity::detect("2015-10-11T11:12").unwrap().0, Granularity::Minute);
        assert_eq!(Granularity::detect("2015-10-11T11").unwrap().0, Granularity::Hour);
        assert_eq!(Granularity::detect("2015-10-11").unwrap().0, Granularity::Day);
        assert_eq!(Granularity::detect("2015-10").unwrap().0, Granularity::Month);
        assert_eq!(Granularity::detect("2015-W12").unwrap().0, Granularity::Week);
        assert_eq!(Granularity::detect("2015-w12").unwrap().0, Granularity::Week);
    }

    #[test]
    fn detect_rejects_unknown_shapes() {
        assert!(matches!(
            Granularity::detect("2015 10 11"),
            Err(WindagError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            Granularity::detect(""),
            Err(WindagError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn detect_rejects_impossible_values() {
        assert!(matches!(
            Granularity::detect("2015-10-11T25"),
            Err(WindagError::InvalidTimeValue { .. })
        ));
        assert!(matches!(
            Granularity::detect("2015-02-30"),
            Err(WindagError::InvalidTimeValue { .. })
        ));
        assert!(matches!(
            Granularity::detect("2015-13"),
            Err(WindagError::InvalidTimeValue { .. })
        ));
    }

    #[test]
    fn week_token_starts_on_iso_monday() {
        let (_, from) = Granularity::detect("2015-W12").unwrap();
        assert_eq!(from, at("2015-03-16T00:00:00"));
        assert_eq!(Granularity::Week.format(from), "2015-W12");
    }

    #[test]
    fn month_shift_handles_year_boundary() {
        let from = at("2015-11-01T00:00:00");
        assert_eq!(Granularity::Month.next(from, 3), at("2016-02-01T00:00:00"));
        assert_eq!(Granularity::Month.prev(from, 3), at("2015-08-01T00:00:00"));
    }

    #[test]
    fn units_between_counts_whole_units() {
        let a = at("2015-11-10T11:00:15");
        let b = at("2015-11-10T12:30:25");
        assert_eq!(Granularity::Second.units_between(a, b), 5410);
        assert_eq!(Granularity::Minute.units_between(a, b), 90);
        assert_eq!(Granularity::Hour.units_between(a, b), 1);
        assert_eq!(
            Granularity::Month.units_between(at("2015-11-01T00:00:00"), at("2016-02-01T00:00:00")),
            3
        );
        assert_eq!(
            Granularity::Month.units_between(at("2015-11-15T00:00:00"), at("2016-02-01T00:00:00")),
            2
        );
    }

    #[test]
    fn granularity_names_parse() {
        assert_eq!("Hour".parse::<Granularity>(), Ok(Granularity::Hour));
        assert!("fortnight".parse::<Granularity>().is_err());
        assert_eq!(Granularity::Day.to_string(), "DAY");
    }
}
