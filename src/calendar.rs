//! Work calendar: which weekdays count as working days.
//!
//! The series axis, the velocity workday classification, the forward
//! projection and the simulated walks all consult the same calendar. The
//! default calendar excludes Saturday and Sunday.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::DateSpan;

fn default_non_working() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

/// A weekly work calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// Weekdays on which no work happens.
    #[serde(default = "default_non_working")]
    pub non_working: Vec<Weekday>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            non_working: default_non_working(),
        }
    }
}

impl WorkCalendar {
    /// A calendar on which every day is a working day.
    #[must_use]
    pub const fn every_day() -> Self {
        Self {
            non_working: Vec::new(),
        }
    }

    /// Validate the calendar.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let all = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        if all.iter().all(|wd| self.non_working.contains(wd)) {
            return Err(ValidationError::NoWorkingDays);
        }
        Ok(())
    }

    /// Whether `weekday` is a working day.
    #[must_use]
    pub fn is_working_weekday(&self, weekday: Weekday) -> bool {
        !self.non_working.contains(&weekday)
    }

    /// Whether `date` falls on a working day.
    #[must_use]
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        self.is_working_weekday(date.weekday())
    }

    /// Working dates in `span`, ascending.
    pub fn workdays<'a>(&'a self, span: &DateSpan) -> impl Iterator<Item = NaiveDate> + 'a {
        span.days().filter(move |d| self.is_workday(*d))
    }

    /// Working dates in the half-open interval `(after, until]`.
    #[must_use]
    pub fn workdays_between(&self, after: NaiveDate, until: NaiveDate) -> u32 {
        let mut count = 0;
        let mut day = after + Duration::days(1);
        while day <= until {
            if self.is_workday(day) {
                count += 1;
            }
            day += Duration::days(1);
        }
        count
    }
}
