//! Time handling for regularly spaced time series.
//!
//! All instants are whole seconds since the Unix epoch in UTC. A [`TimeRange`]
//! describes a regular grid of instants and can be translated into "index
//! time" (`timestamp / dt`), which is what the storage layer uses to address
//! chunk files.

use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SeriesError, SeriesResult};

/// Seconds since 1970-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

/// Calendar decomposition of a [`Timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateComponents {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Timestamp {
    pub const fn from_unix(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Midnight UTC of the given calendar day, or `None` for an invalid date.
    pub fn ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        Self::ymd_hms(year, month, day, 0, 0, 0)
    }

    pub fn ymd_hms(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Option<Self> {
        let ndt = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
        Some(Self(Utc.from_utc_datetime(&ndt).timestamp()))
    }

    /// First instant of a calendar year.
    pub fn year_start(year: i32) -> Option<Self> {
        Self::ymd(year, 1, 1)
    }

    pub fn unix(self) -> i64 {
        self.0
    }

    pub fn add(self, seconds: i64) -> Self {
        Self(self.0 + seconds)
    }

    /// Round down to a multiple of `multiple` seconds.
    pub fn floor(self, multiple: i64) -> Self {
        Self(self.0 - self.0.rem_euclid(multiple))
    }

    /// Round up to a multiple of `multiple` seconds.
    pub fn ceil(self, multiple: i64) -> Self {
        let rem = self.0.rem_euclid(multiple);
        if rem == 0 {
            self
        } else {
            Self(self.0 + multiple - rem)
        }
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.0, 0).unwrap_or_default()
    }

    pub fn components(self) -> DateComponents {
        let dt = self.to_datetime();
        DateComponents {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }

    /// Parse an ISO 8601 instant. Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]`
    /// (assumed UTC) or a bare date.
    pub fn parse_iso8601(s: &str) -> SeriesResult<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.timestamp()));
        }

        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self(Utc.from_utc_datetime(&ndt).timestamp()));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(Utc.from_utc_datetime(&ndt).timestamp()));
            }
        }

        Err(SeriesError::InvalidTime(s.to_string()))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

/// A regular grid of `count` instants spaced `dt_seconds` apart, covering the
/// half-open interval `[start, start + count * dt)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub dt_seconds: i64,
    pub count: usize,
}

impl TimeRange {
    /// # Panics
    /// If `dt_seconds` is not positive.
    pub fn new(start: Timestamp, dt_seconds: i64, count: usize) -> Self {
        assert!(dt_seconds > 0, "dt_seconds must be positive, got {dt_seconds}");
        Self {
            start,
            dt_seconds,
            count,
        }
    }

    /// Grid from `start` (inclusive) to `end` (exclusive). A partial last step
    /// is included.
    pub fn from_bounds(start: Timestamp, end: Timestamp, dt_seconds: i64) -> Self {
        assert!(dt_seconds > 0, "dt_seconds must be positive, got {dt_seconds}");
        let span = (end.0 - start.0).max(0);
        let count = (span + dt_seconds - 1) / dt_seconds;
        Self::new(start, dt_seconds, count as usize)
    }

    /// Exclusive end instant.
    pub fn end(&self) -> Timestamp {
        self.start.add(self.count as i64 * self.dt_seconds)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, index: usize) -> Timestamp {
        self.start.add(index as i64 * self.dt_seconds)
    }

    pub fn iter(&self) -> impl Iterator<Item = Timestamp> + '_ {
        (0..self.count).map(move |i| self.get(i))
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t < self.end() && (t.0 - self.start.0) % self.dt_seconds == 0
    }

    /// Translate into storage index time: `start / dt .. start / dt + count`.
    pub fn to_index_range(&self) -> Range<i64> {
        let lower = self.start.0.div_euclid(self.dt_seconds);
        lower..lower + self.count as i64
    }

    /// Build a time range back from an index range at the given cadence.
    pub fn from_index_range(range: Range<i64>, dt_seconds: i64) -> Self {
        let count = (range.end - range.start).max(0) as usize;
        Self::new(Timestamp(range.start * dt_seconds), dt_seconds, count)
    }

    /// Same bounds at a different cadence. The start is floored and the end
    /// is ceiled to `dt_seconds`, so the result always covers `self`.
    pub fn with_dt(&self, dt_seconds: i64) -> Self {
        let start = self.start.floor(dt_seconds);
        let end = self.end().ceil(dt_seconds);
        Self::from_bounds(start, end, dt_seconds)
    }

    /// Source window at `model_dt` needed to interpolate onto this range: the
    /// start floored to the model step, and one model step beyond the ceiled end.
    pub fn for_interpolation_to(&self, model_dt: i64) -> Self {
        let start = self.start.floor(model_dt);
        let end = self.end().ceil(model_dt).add(model_dt);
        Self::from_bounds(start, end, model_dt)
    }

    /// Grow by `steps` on both sides.
    pub fn expand(&self, steps: usize) -> Self {
        Self::new(
            self.start.add(-(steps as i64) * self.dt_seconds),
            self.dt_seconds,
            self.count + 2 * steps,
        )
    }

    /// Drop the first `steps` instants.
    pub fn drop_first(&self, steps: usize) -> Self {
        let steps = steps.min(self.count);
        Self::new(self.get(steps), self.dt_seconds, self.count - steps)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} every {}s", self.start, self.end(), self.dt_seconds)
    }
}
