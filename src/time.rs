//! Calendar spans and the daily sampling instant.
//!
//! Snapshots are taken once per calendar date, at a fixed local time in a
//! fixed reference offset, rather than at midnight. Sampling mid-morning keeps
//! a transition made late in the previous evening (in any nearby zone) on the
//! correct side of the date boundary.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An inclusive range of calendar dates.
///
/// # Examples
///
/// ```
/// use burnup::DateSpan;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
/// let span = DateSpan::new(start, end).unwrap();
/// assert_eq!(span.days().count(), 7);
/// assert!(span.contains(start));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    /// First date (inclusive).
    pub start: NaiveDate,

    /// Last date (inclusive).
    pub end: NaiveDate,
}

impl DateSpan {
    /// Creates a span from two dates.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidDateSpan` if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidDateSpan { start, end });
        }
        Ok(Self { start, end })
    }

    /// A span covering a single date.
    #[must_use]
    pub const fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Whether `date` lies in the span.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every calendar date in the span, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Number of calendar dates in the span.
    #[must_use]
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} → {}]", self.start, self.end)
    }
}

const fn default_offset_minutes() -> i32 {
    -8 * 60
}

const fn default_hour() -> u32 {
    9
}

/// When, on each date, the daily snapshot is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingPolicy {
    /// Offset of the reference zone east of UTC, in minutes.
    #[serde(default = "default_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Local hour of day at which each date is sampled.
    #[serde(default = "default_hour")]
    pub hour: u32,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_offset_minutes(),
            hour: default_hour(),
        }
    }
}

impl SamplingPolicy {
    /// Validate the policy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.offset()?;
        if self.hour > 23 {
            return Err(ValidationError::SamplingHourOutOfRange { hour: self.hour });
        }
        Ok(())
    }

    fn offset(&self) -> Result<FixedOffset, ValidationError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ValidationError::InvalidSamplingOffset {
                minutes: self.utc_offset_minutes,
            })
    }

    /// The instant at which `date` is sampled.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the policy is invalid.
    pub fn instant_for(&self, date: NaiveDate) -> Result<DateTime<Utc>, ValidationError> {
        self.validate()?;
        let offset = self.offset()?;
        let time = NaiveTime::from_hms_opt(self.hour, 0, 0)
            .ok_or(ValidationError::SamplingHourOutOfRange { hour: self.hour })?;
        let local = date.and_time(time);
        // A fixed offset has exactly one mapping for every local time.
        let instant = offset
            .from_local_datetime(&local)
            .single()
            .ok_or(ValidationError::InvalidSamplingOffset {
                minutes: self.utc_offset_minutes,
            })?;
        Ok(instant.with_timezone(&Utc))
    }
}
