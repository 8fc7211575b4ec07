//! Monte Carlo completion simulation.
//!
//! Each trial walks forward one calendar day at a time from the latest known
//! date. On every working day it draws one historical workday velocity
//! uniformly, with replacement, and adds it to a running done total. Trials
//! share no state; their order does not affect the aggregate.

use std::time::Instant;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::cancel::CancellationToken;
use crate::error::{BurnupResult, ExecutionError};

use super::limits::SimulationLimits;
use super::rng::RandomSource;

/// Lower percentile of the confidence band.
pub const CONFIDENCE_LOW_QUANTILE: f64 = 0.025;

/// Upper percentile of the confidence band.
pub const CONFIDENCE_HIGH_QUANTILE: f64 = 0.975;

/// Inputs of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams<'a> {
    /// Done total at the latest known date.
    pub done: f64,
    /// Total scope a trial has to reach.
    pub total_scope: f64,
    /// Resampling population (workday velocities).
    pub velocities: &'a [f64],
    /// Number of trials to run.
    pub trials: usize,
    /// Calendar days to the forecast horizon.
    pub projection_days: u32,
    /// Latest known date; day 0 of every walk.
    pub last_date: NaiveDate,
}

/// Raw per-trial results, kept so distributions can be recomputed without
/// rerunning the simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSamples {
    /// Per-trial progress per working day up to the horizon.
    pub slopes: Vec<f64>,
    /// Per-trial completion date.
    pub completion_dates: Vec<NaiveDate>,
}

/// Aggregate of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    /// Done total at the horizon, 2.5th percentile.
    pub confidence_low: f64,
    /// Done total at the horizon, 97.5th percentile.
    pub confidence_high: f64,
    /// Working days between the latest date and the horizon.
    pub workdays_in_projection: u32,
    /// Raw per-trial results.
    pub samples: SimulationSamples,
}

impl SimulationOutcome {
    /// Per-working-day increment of the lower band, starting from `done`.
    #[must_use]
    pub fn slope_low(&self, done: f64) -> f64 {
        self.slope_for(self.confidence_low, done)
    }

    /// Per-working-day increment of the upper band, starting from `done`.
    #[must_use]
    pub fn slope_high(&self, done: f64) -> f64 {
        self.slope_for(self.confidence_high, done)
    }

    fn slope_for(&self, outcome: f64, done: f64) -> f64 {
        if self.workdays_in_projection == 0 {
            0.0
        } else {
            (outcome - done) / f64::from(self.workdays_in_projection)
        }
    }
}

struct TrialResult {
    at_horizon: f64,
    completion_day: u32,
}

/// Runs Monte Carlo completion simulations.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloSimulator {
    limits: SimulationLimits,
    calendar: WorkCalendar,
}

impl MonteCarloSimulator {
    /// A simulator bounded by `limits`, walking `calendar`.
    #[must_use]
    pub const fn new(limits: SimulationLimits, calendar: WorkCalendar) -> Self {
        Self { limits, calendar }
    }

    /// Bounds checked on every run.
    pub const fn limits(&self) -> &SimulationLimits {
        &self.limits
    }

    /// Runs `params.trials` independent trials.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the limits are invalid or the trial count is out of bounds.
    /// - `ExecutionError::Cancelled` if `cancel` fires before every trial finished.
    pub fn simulate<R: RandomSource>(
        &self,
        params: &SimulationParams<'_>,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> BurnupResult<SimulationOutcome> {
        self.limits.validate()?;
        self.limits.check_trials(params.trials)?;
        self.calendar.validate()?;

        let started = Instant::now();
        let workdays_in_projection = self.calendar.workdays_between(
            params.last_date,
            params.last_date + Duration::days(i64::from(params.projection_days)),
        );

        let mut outcomes = Vec::with_capacity(params.trials);
        let mut samples = SimulationSamples {
            slopes: Vec::with_capacity(params.trials),
            completion_dates: Vec::with_capacity(params.trials),
        };

        for completed in 0..params.trials {
            if cancel.is_cancelled() {
                tracing::debug!(completed, requested = params.trials, "simulation cancelled");
                return Err(ExecutionError::Cancelled {
                    completed_trials: completed,
                    requested_trials: params.trials,
                }
                .into());
            }

            let trial = self.run_trial(params, rng);
            let slope = if workdays_in_projection == 0 {
                0.0
            } else {
                (trial.at_horizon - params.done) / f64::from(workdays_in_projection)
            };
            outcomes.push(trial.at_horizon);
            samples.slopes.push(slope);
            samples
                .completion_dates
                .push(params.last_date + Duration::days(i64::from(trial.completion_day)));
        }

        outcomes.sort_by(f64::total_cmp);
        let confidence_low = percentile_rank(&outcomes, CONFIDENCE_LOW_QUANTILE);
        let confidence_high = percentile_rank(&outcomes, CONFIDENCE_HIGH_QUANTILE);

        tracing::debug!(
            trials = params.trials,
            confidence_low,
            confidence_high,
            elapsed_ms = started.elapsed().as_millis(),
            "simulation finished"
        );

        Ok(SimulationOutcome {
            confidence_low,
            confidence_high,
            workdays_in_projection,
            samples,
        })
    }

    fn run_trial<R: RandomSource>(&self, params: &SimulationParams<'_>, rng: &mut R) -> TrialResult {
        let cap = self.limits.day_cap;
        let mut weekday = params.last_date.weekday();
        let mut running = params.done;
        let mut completion_day = None;
        let mut at_horizon = (params.projection_days == 0).then_some(params.done);

        let mut day = 0;
        while day < cap {
            if completion_day.is_some() && day >= params.projection_days {
                break;
            }
            day += 1;
            weekday = weekday.succ();

            if self.calendar.is_working_weekday(weekday) && !params.velocities.is_empty() {
                running += params.velocities[rng.next_index(params.velocities.len())];
            }
            if day == params.projection_days {
                at_horizon = Some(running);
            }
            if completion_day.is_none() && running >= params.total_scope {
                completion_day = Some(day);
            }
        }

        TrialResult {
            at_horizon: at_horizon.unwrap_or(running),
            completion_day: completion_day.unwrap_or(cap),
        }
    }
}

/// Value at rank `floor(n * q)` of ascending `sorted`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn percentile_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
