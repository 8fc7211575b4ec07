//! Daily snapshot series.
//!
//! For every working date in the requested span, each item's status and
//! metric are reconstructed at the sampling instant and summed per status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::error::BurnupResult;
use crate::history::{FieldTimeline, HistoryReconstructor};
use crate::item::{Item, STATUS_FIELD};
use crate::snapshot::SnapshotPoint;
use crate::time::{DateSpan, SamplingPolicy};

/// Sentinel metric key meaning "one per item".
pub const COUNT_METRIC: &str = "count";

/// What each item contributes to its status bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Metric {
    /// Exactly 1 per existing item.
    Count,
    /// The numeric value of a field; absent or unparseable reads as 0.
    Field(String),
}

impl Metric {
    /// Parses a metric key; [`COUNT_METRIC`] selects [`Metric::Count`].
    #[must_use]
    pub fn parse(key: &str) -> Self {
        if key == COUNT_METRIC {
            Self::Count
        } else {
            Self::Field(key.to_string())
        }
    }

    /// The key this metric was parsed from.
    pub fn key(&self) -> &str {
        match self {
            Self::Count => COUNT_METRIC,
            Self::Field(key) => key,
        }
    }
}

impl From<String> for Metric {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.key().to_string()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parameters of one series build.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    /// Dates to sample; only working dates produce points.
    pub span: DateSpan,
    /// Per-item contribution.
    pub metric: Metric,
    /// Statuses initialised to 0 on every non-future date.
    pub tracked_statuses: Vec<String>,
    /// Evaluation instant; dates sampled after it become placeholders.
    pub now: DateTime<Utc>,
}

impl SeriesRequest {
    /// A request evaluated at the current wall-clock time.
    #[must_use]
    pub fn new(span: DateSpan, metric: Metric, tracked_statuses: Vec<String>) -> Self {
        Self {
            span,
            metric,
            tracked_statuses,
            now: Utc::now(),
        }
    }

    /// Evaluates as of `now` instead of the wall clock.
    #[must_use]
    pub const fn as_of(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

struct ItemTimelines<'a> {
    status: FieldTimeline<'a>,
    metric: Option<FieldTimeline<'a>>,
}

/// Builds ordered daily snapshot series.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSeriesBuilder {
    reconstructor: HistoryReconstructor,
    calendar: WorkCalendar,
    sampling: SamplingPolicy,
}

impl SnapshotSeriesBuilder {
    /// A builder over the given reconstructor, calendar and sampling policy.
    #[must_use]
    pub const fn new(
        reconstructor: HistoryReconstructor,
        calendar: WorkCalendar,
        sampling: SamplingPolicy,
    ) -> Self {
        Self {
            reconstructor,
            calendar,
            sampling,
        }
    }

    /// Calendar deciding which dates are sampled.
    pub const fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    /// Builds one point per working date of `request.span`, ascending.
    ///
    /// The output always covers every working date, even with no items.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the sampling policy or calendar is invalid.
    pub fn build(&self, items: &[Item], request: &SeriesRequest) -> BurnupResult<Vec<SnapshotPoint>> {
        self.sampling.validate()?;
        self.calendar.validate()?;

        tracing::debug!(
            span = %request.span,
            metric = %request.metric,
            items = items.len(),
            tracked = request.tracked_statuses.len(),
            "building snapshot series"
        );

        let timelines: Vec<ItemTimelines<'_>> = items
            .iter()
            .map(|item| ItemTimelines {
                status: self.reconstructor.timeline(item, STATUS_FIELD),
                metric: match &request.metric {
                    Metric::Count => None,
                    Metric::Field(key) => Some(self.reconstructor.timeline(item, key)),
                },
            })
            .collect();

        let mut series = Vec::new();
        for date in self.calendar.workdays(&request.span) {
            let sampled_at = self.sampling.instant_for(date)?;
            if sampled_at > request.now {
                series.push(SnapshotPoint::placeholder(date));
                continue;
            }
            let values = Self::tally(&timelines, &request.tracked_statuses, sampled_at);
            series.push(SnapshotPoint::new(date, values));
        }
        Ok(series)
    }

    fn tally(
        timelines: &[ItemTimelines<'_>],
        tracked: &[String],
        at: DateTime<Utc>,
    ) -> BTreeMap<String, f64> {
        let mut buckets: BTreeMap<String, f64> =
            tracked.iter().map(|s| (s.clone(), 0.0)).collect();

        for item in timelines {
            let status = item.status.value_at(at);
            let Some(status) = status.as_text().filter(|s| !s.is_empty()) else {
                // Not created yet, or no status at this instant.
                continue;
            };
            let contribution = item
                .metric
                .as_ref()
                .map_or(1.0, |metric| metric.value_at(at).numeric_or_zero());
            // Untracked statuses still get a bucket so no data disappears.
            *buckets.entry(status.to_string()).or_insert(0.0) += contribution;
        }

        for value in buckets.values_mut() {
            *value = round2(*value);
        }
        buckets
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
