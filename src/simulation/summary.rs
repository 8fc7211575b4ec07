//! Distribution statistics over raw simulation samples.
//!
//! Everything here is recomputed from [`SimulationSamples`], so a caller can
//! re-bin or re-summarize a run without simulating again.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::monte_carlo::SimulationSamples;

/// Upper bound on histogram bins.
pub const MAX_BINS: usize = 20;

/// One histogram bucket over `[start, end)`; the last bucket also holds `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin<T> {
    /// Inclusive lower edge.
    pub start: T,
    /// Exclusive upper edge.
    pub end: T,
    /// Samples in the bucket.
    pub count: usize,
    /// Share of all samples, in percent, rounded to one decimal.
    pub percent: f64,
}

/// Order statistics and a histogram of one sample set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary<T> {
    /// Smallest sample.
    pub min: T,
    /// Largest sample.
    pub max: T,
    /// Arithmetic mean.
    pub mean: T,
    /// Middle value; the mean of the two middle values for even counts.
    pub median: T,
    /// Value at rank `floor(n * 0.05)`.
    pub p05: T,
    /// Value at rank `floor(n * 0.95)`.
    pub p95: T,
    /// Equal-width histogram from `min`.
    pub bins: Vec<HistogramBin<T>>,
}

impl<T: Copy> DistributionSummary<T> {
    fn map<U>(&self, f: impl Fn(T) -> U) -> DistributionSummary<U> {
        DistributionSummary {
            min: f(self.min),
            max: f(self.max),
            mean: f(self.mean),
            median: f(self.median),
            p05: f(self.p05),
            p95: f(self.p95),
            bins: self
                .bins
                .iter()
                .map(|b| HistogramBin {
                    start: f(b.start),
                    end: f(b.end),
                    count: b.count,
                    percent: b.percent,
                })
                .collect(),
        }
    }
}

/// Summaries of the slope and completion-date distributions of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Per-working-day progress slopes.
    pub slopes: DistributionSummary<f64>,
    /// Completion dates, binned at least a day wide.
    pub completion: DistributionSummary<NaiveDate>,
}

impl SimulationSummary {
    /// Summarizes `samples`; `None` when the run holds no trials.
    #[must_use]
    pub fn from_samples(samples: &SimulationSamples) -> Option<Self> {
        let slopes = summarize(&samples.slopes, 0.0)?;

        let days: Vec<f64> = samples
            .completion_dates
            .iter()
            .map(|d| f64::from(d.num_days_from_ce()))
            .collect();
        // Date buckets are never narrower than a day.
        let completion = summarize(&days, 1.0)?;
        let first = samples.completion_dates.iter().min().copied()?;

        Some(Self {
            slopes,
            completion: completion.map(|day| day_to_date(day, first)),
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn day_to_date(day: f64, fallback: NaiveDate) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(day.floor() as i32).unwrap_or(fallback)
}

/// Summary statistics of `values`; `None` when empty.
///
/// Bin width is `range / min(20, ceil(sqrt(n)))`, widened to `min_width`
/// when that is larger. A zero range uses one bucket of width
/// `max(min_width, 1)`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn summarize(values: &[f64], min_width: f64) -> Option<DistributionSummary<f64>> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    let min = sorted[0];
    let max = sorted[n - 1];
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let mid = n / 2;
    let median = if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };
    let rank = |q: f64| sorted[(((n as f64) * q).floor() as usize).min(n - 1)];

    let range = max - min;
    let (width, bin_count) = if range > 0.0 {
        let natural_count = MAX_BINS.min((n as f64).sqrt().ceil() as usize).max(1);
        let natural_width = range / natural_count as f64;
        if min_width > natural_width {
            (min_width, ((range / min_width).ceil() as usize).max(1))
        } else {
            (natural_width, natural_count)
        }
    } else {
        (min_width.max(1.0), 1)
    };

    let mut counts = vec![0usize; bin_count];
    for value in &sorted {
        let idx = ((value - min) / width).floor().max(0.0) as usize;
        counts[idx.min(bin_count - 1)] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: (i as f64).mul_add(width, min),
            end: ((i + 1) as f64).mul_add(width, min),
            count,
            percent: (count as f64 / n as f64 * 1000.0).round() / 10.0,
        })
        .collect();

    Some(DistributionSummary {
        min,
        max,
        mean,
        median,
        p05: rank(0.05),
        p95: rank(0.95),
        bins,
    })
}
