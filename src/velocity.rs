//! Recent per-interval progress deltas.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::snapshot::SnapshotPoint;

/// Change in done total between two consecutive usable points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocitySample {
    /// Date of the later point.
    pub date: NaiveDate,
    /// Done total of the later point minus the earlier one.
    pub delta: f64,
    /// Whether the later point falls on a working day.
    pub workday: bool,
}

/// Velocity samples over the averaging window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Velocities {
    /// Dates of the points the window spans, ascending (samples + 1 entries).
    pub window_dates: Vec<NaiveDate>,
    /// One sample per interval, ascending.
    pub samples: Vec<VelocitySample>,
}

impl Velocities {
    /// Every delta, in date order.
    pub fn deltas(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.delta).collect()
    }

    /// Deltas landing on working days, or every delta if none do.
    ///
    /// This is the resampling population for simulation.
    pub fn workday_deltas(&self) -> Vec<f64> {
        let workday: Vec<f64> = self
            .samples
            .iter()
            .filter(|s| s.workday)
            .map(|s| s.delta)
            .collect();
        if workday.is_empty() {
            self.deltas()
        } else {
            workday
        }
    }

    /// Arithmetic mean of all deltas. May be zero or negative.
    pub fn average(&self) -> f64 {
        mean(&self.deltas())
    }

    /// Mean of [`Self::workday_deltas`]; the per-working-day step.
    pub fn workday_average(&self) -> f64 {
        mean(&self.workday_deltas())
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Derives velocities from a snapshot series.
#[derive(Debug, Clone, Default)]
pub struct VelocityEstimator {
    calendar: WorkCalendar,
}

impl VelocityEstimator {
    /// An estimator classifying workdays with `calendar`.
    #[must_use]
    pub const fn new(calendar: WorkCalendar) -> Self {
        Self { calendar }
    }

    /// Velocities over the last `window` intervals of usable points.
    ///
    /// Placeholders are ignored. Returns `None` with fewer than two usable
    /// points. A `window` of 0 is treated as 1.
    #[must_use]
    pub fn estimate<S: AsRef<str>>(
        &self,
        series: &[SnapshotPoint],
        done_statuses: &[S],
        window: usize,
    ) -> Option<Velocities> {
        let usable: Vec<&SnapshotPoint> = series.iter().filter(|p| !p.is_placeholder()).collect();
        if usable.len() < 2 {
            return None;
        }
        let take = (window.max(1) + 1).min(usable.len());
        let recent = &usable[usable.len() - take..];

        let samples = recent
            .windows(2)
            .map(|pair| {
                let delta = pair[1].sum_of(done_statuses) - pair[0].sum_of(done_statuses);
                VelocitySample {
                    date: pair[1].date(),
                    delta,
                    workday: self.calendar.is_workday(pair[1].date()),
                }
            })
            .collect();

        Some(Velocities {
            window_dates: recent.iter().map(|p| p.date()).collect(),
            samples,
        })
    }
}
