//! Trend projection of a snapshot series.
//!
//! The projector anchors at the latest usable point, draws a backward trend
//! segment over the averaging window and a forward line to the horizon. When
//! confidence is requested the forward line carries a Monte Carlo band.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::cancel::CancellationToken;
use crate::error::{BurnupError, BurnupResult, ValidationError};
use crate::simulation::{
    MonteCarloSimulator, RandomSource, SeedStrategy, SimulationLimits, SimulationParams,
    SimulationSamples,
};
use crate::snapshot::SnapshotPoint;
use crate::status::StatusCatalog;
use crate::velocity::VelocityEstimator;

/// Forecast settings supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// When false, projection returns `Ok(None)`.
    pub enabled: bool,
    /// Number of most recent intervals averaged into the velocity.
    pub averaging_window: usize,
    /// Whether to run the simulation and emit a confidence band.
    pub show_confidence: bool,
    /// Monte Carlo trial count.
    pub trials: usize,
    /// Where simulation randomness comes from.
    pub seed: SeedStrategy,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            averaging_window: 3,
            show_confidence: false,
            trials: 1000,
            seed: SeedStrategy::Entropy,
        }
    }
}

impl ForecastConfig {
    /// Rejects values that would make a projection meaningless or unbounded.
    ///
    /// The trial count is only checked when confidence is requested.
    pub fn validate(&self, limits: &SimulationLimits) -> Result<(), ValidationError> {
        if self.averaging_window == 0 {
            return Err(ValidationError::EmptyAveragingWindow);
        }
        if self.show_confidence {
            limits.check_trials(self.trials)?;
        }
        Ok(())
    }

    /// A copy with the window raised to at least 1 and the trial count
    /// clamped into `limits`.
    #[must_use]
    pub fn clamped(&self, limits: &SimulationLimits) -> Self {
        Self {
            averaging_window: self.averaging_window.max(1),
            trials: limits.clamp_trials(self.trials),
            ..*self
        }
    }
}

/// One point of the forecast overlay.
///
/// Field names on the wire are a stable contract with renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Calendar date of the point.
    pub date: NaiveDate,
    /// Projected done total.
    #[serde(rename = "Forecast")]
    pub forecast: f64,
    /// Total scope; set from the latest actual point onward.
    #[serde(
        rename = "TotalScopeProjected",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_scope: Option<f64>,
    /// Upper edge of the 95% band, when requested.
    #[serde(
        rename = "ConfidenceHigh",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_high: Option<f64>,
    /// Lower edge of the 95% band, when requested.
    #[serde(
        rename = "ConfidenceLow",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_low: Option<f64>,
}

impl ForecastPoint {
    const fn trend(date: NaiveDate, forecast: f64) -> Self {
        Self {
            date,
            forecast,
            total_scope: None,
            confidence_high: None,
            confidence_low: None,
        }
    }

    /// A point whose band has collapsed onto the forecast value.
    const fn settled(date: NaiveDate, value: f64, with_confidence: bool) -> Self {
        let band = if with_confidence { Some(value) } else { None };
        Self {
            date,
            forecast: value,
            total_scope: None,
            confidence_high: band,
            confidence_low: band,
        }
    }
}

/// Which forward projection was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastBranch {
    /// Nothing remains; flat line at the done total.
    Completed,
    /// Average velocity is zero or negative; flat line, no completion.
    Stalled,
    /// Positive velocity; stepped line toward the scope.
    Projecting,
}

/// Output of one projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    /// Ascending by date: backward segment, anchor, forward line.
    pub forecast_points: Vec<ForecastPoint>,
    /// Mean of every delta in the averaging window.
    pub avg_velocity: f64,
    /// Remaining scope over average velocity; infinite when stalled.
    #[serde(with = "infinite_as_null")]
    pub days_to_complete: f64,
    /// Date the forward line reaches the horizon; `None` when stalled.
    pub completion_date: Option<NaiveDate>,
    /// Raw per-trial samples when a confidence band was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_results: Option<SimulationSamples>,
    /// Which projection path produced this result.
    pub branch: ForecastBranch,
}

/// Serializes a non-finite float as `null` and reads `null` back as infinity.
mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Everything one projection reads. Owned so it can cross threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Daily snapshot series, ascending.
    pub series: Vec<SnapshotPoint>,
    /// Forecast settings.
    pub config: ForecastConfig,
    /// Status definitions used for progress and scope.
    pub statuses: StatusCatalog,
    /// Explicit horizon; when absent the horizon follows the branch.
    #[serde(default)]
    pub horizon_end: Option<NaiveDate>,
}

impl ForecastRequest {
    /// A request with no explicit horizon.
    #[must_use]
    pub const fn new(series: Vec<SnapshotPoint>, config: ForecastConfig, statuses: StatusCatalog) -> Self {
        Self {
            series,
            config,
            statuses,
            horizon_end: None,
        }
    }

    /// Ends the projection at `end`.
    #[must_use]
    pub const fn until(mut self, end: NaiveDate) -> Self {
        self.horizon_end = Some(end);
        self
    }

    /// Content hash of the request.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the request cannot be serialized.
    pub fn fingerprint(&self) -> BurnupResult<blake3::Hash> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, self)
            .map_err(|e| BurnupError::internal(format!("failed to fingerprint request: {e}")))?;
        Ok(hasher.finalize())
    }
}

/// Projects completion from a snapshot series.
#[derive(Debug, Clone, Default)]
pub struct ForecastProjector {
    calendar: WorkCalendar,
    limits: SimulationLimits,
}

impl ForecastProjector {
    /// A projector over `calendar`, bounded by `limits`.
    #[must_use]
    pub const fn new(calendar: WorkCalendar, limits: SimulationLimits) -> Self {
        Self { calendar, limits }
    }

    /// Bounds applied to every projection.
    pub const fn limits(&self) -> &SimulationLimits {
        &self.limits
    }

    /// Projects `request`, seeding the simulation per `request.config.seed`.
    ///
    /// Returns `Ok(None)` when forecasting is disabled, fewer than two usable
    /// points exist, or no enabled done status is configured.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for out-of-range configuration.
    pub fn project(&self, request: &ForecastRequest) -> BurnupResult<Option<ForecastResult>> {
        self.project_cancellable(request, &CancellationToken::new())
    }

    /// Like [`Self::project`], aborting the simulation when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Also returns `ExecutionError::Cancelled` on cancellation.
    pub fn project_cancellable(
        &self,
        request: &ForecastRequest,
        cancel: &CancellationToken,
    ) -> BurnupResult<Option<ForecastResult>> {
        let seed = request.config.seed;
        let mut rng = if seed == SeedStrategy::Stable {
            let hash = request.fingerprint()?;
            seed.generator(|| hash)
        } else {
            seed.generator(|| blake3::hash(&[]))
        };
        self.project_with(request, &mut rng, cancel)
    }

    /// Projects `request` drawing simulation randomness from `rng`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for out-of-range configuration.
    /// - `ExecutionError::Cancelled` if `cancel` fires during the simulation.
    pub fn project_with<R: RandomSource>(
        &self,
        request: &ForecastRequest,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> BurnupResult<Option<ForecastResult>> {
        let config = &request.config;
        if !config.enabled {
            tracing::debug!("forecasting disabled");
            return Ok(None);
        }
        self.limits.validate()?;
        self.calendar.validate()?;
        config.validate(&self.limits)?;

        let done_statuses = request.statuses.progress_statuses();
        if done_statuses.is_empty() {
            tracing::warn!(
                statuses = request.statuses.len(),
                "no enabled done status configured; forecast unavailable"
            );
            return Ok(None);
        }

        let estimator = VelocityEstimator::new(self.calendar.clone());
        let Some(velocities) =
            estimator.estimate(&request.series, &done_statuses, config.averaging_window)
        else {
            tracing::debug!(points = request.series.len(), "not enough usable points");
            return Ok(None);
        };
        let Some(last) = request.series.iter().rev().find(|p| !p.is_placeholder()) else {
            return Ok(None);
        };

        let last_date = last.date();
        let done = last.sum_of(&done_statuses);
        let total_scope = last.sum_of(&request.statuses.scope_statuses());
        let remaining = total_scope - done;
        let avg_velocity = velocities.average();
        let step = velocities.workday_average();

        tracing::debug!(
            %last_date,
            done,
            total_scope,
            remaining,
            avg_velocity,
            workday_velocity = step,
            "projecting"
        );

        let mut points: Vec<ForecastPoint> = velocities
            .window_dates
            .iter()
            .filter(|d| **d < last_date)
            .map(|d| {
                let back = self.calendar.workdays_between(*d, last_date);
                ForecastPoint::trend(*d, f64::from(back).mul_add(-step, done))
            })
            .collect();
        let mut anchor = ForecastPoint::settled(last_date, done, config.show_confidence);

        if remaining <= 0.0 {
            let horizon = self.horizon(last_date, request.horizon_end, None)?;
            tracing::debug!(horizon, "scope completed");
            points.push(anchor);
            points.extend(Self::flat(last_date, done, horizon, config.show_confidence));
            return Ok(Some(ForecastResult {
                forecast_points: points,
                avg_velocity,
                days_to_complete: 0.0,
                completion_date: Some(last_date),
                simulation_results: None,
                branch: ForecastBranch::Completed,
            }));
        }

        if avg_velocity <= 0.0 {
            let horizon = self.horizon(last_date, request.horizon_end, None)?;
            tracing::debug!(horizon, "velocity stalled");
            points.push(anchor);
            points.extend(Self::flat(last_date, done, horizon, config.show_confidence));
            return Ok(Some(ForecastResult {
                forecast_points: points,
                avg_velocity,
                days_to_complete: f64::INFINITY,
                completion_date: None,
                simulation_results: None,
                branch: ForecastBranch::Stalled,
            }));
        }

        let projection_days = self.horizon(
            last_date,
            request.horizon_end,
            Some((remaining / avg_velocity).ceil()),
        )?;

        let mut slopes = (0.0, 0.0);
        let mut simulation_results = None;
        if config.show_confidence {
            let population = velocities.workday_deltas();
            let params = SimulationParams {
                done,
                total_scope,
                velocities: &population,
                trials: config.trials,
                projection_days,
                last_date,
            };
            let simulator = MonteCarloSimulator::new(self.limits, self.calendar.clone());
            let outcome = simulator.simulate(&params, rng, cancel)?;
            slopes = (outcome.slope_low(done), outcome.slope_high(done));
            simulation_results = Some(outcome.samples);
        }

        tracing::debug!(
            projection_days,
            slope_low = slopes.0,
            slope_high = slopes.1,
            "projecting forward"
        );

        anchor.total_scope = Some(total_scope);
        points.push(anchor);

        let mut current = done;
        let (mut band_low, mut band_high) = (done, done);
        for offset in 1..=projection_days {
            let date = last_date + Duration::days(i64::from(offset));
            // Non-working days are implied by the connector between workdays.
            if !self.calendar.is_workday(date) {
                continue;
            }
            current += step;
            band_low += slopes.0;
            band_high += slopes.1;
            points.push(ForecastPoint {
                date,
                forecast: current,
                total_scope: Some(total_scope),
                confidence_high: config.show_confidence.then_some(band_high),
                confidence_low: config.show_confidence.then_some(band_low),
            });
        }

        Ok(Some(ForecastResult {
            forecast_points: points,
            avg_velocity,
            days_to_complete: remaining / avg_velocity,
            completion_date: Some(last_date + Duration::days(i64::from(projection_days))),
            simulation_results,
            branch: ForecastBranch::Projecting,
        }))
    }

    /// Calendar days from `last_date` to the horizon.
    ///
    /// An explicit end wins (never negative) but must lie within
    /// `max_horizon_days`. Otherwise `estimate` is capped at the maximum
    /// projection, and with no estimate the default horizon applies.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn horizon(
        &self,
        last_date: NaiveDate,
        end: Option<NaiveDate>,
        estimate: Option<f64>,
    ) -> Result<u32, ValidationError> {
        match (end, estimate) {
            (Some(end), _) => self.limits.check_horizon((end - last_date).num_days()),
            (None, Some(days)) => {
                Ok(days.min(f64::from(self.limits.max_projection_days)).max(0.0) as u32)
            }
            (None, None) => Ok(self.limits.default_horizon_days),
        }
    }

    /// One settled point per calendar day after `from`.
    fn flat(
        from: NaiveDate,
        value: f64,
        days: u32,
        with_confidence: bool,
    ) -> impl Iterator<Item = ForecastPoint> {
        (1..=days).map(move |offset| {
            ForecastPoint::settled(from + Duration::days(i64::from(offset)), value, with_confidence)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Xorshift64;
    use crate::status::{StatusCategory, StatusDefinition};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn catalog() -> StatusCatalog {
        StatusCatalog::new(vec![
            StatusDefinition::new("To Do", StatusCategory::NotStarted),
            StatusDefinition::new("Done", StatusCategory::Done),
        ])
    }

    fn two_points(done: (f64, f64), todo: (f64, f64)) -> Vec<SnapshotPoint> {
        vec![
            SnapshotPoint::from_pairs(d(1), [("Done", done.0), ("To Do", todo.0)]),
            SnapshotPoint::from_pairs(d(2), [("Done", done.1), ("To Do", todo.1)]),
        ]
    }

    fn project(request: &ForecastRequest) -> Option<ForecastResult> {
        ForecastProjector::default()
            .project_with(request, &mut Xorshift64::seeded(11), &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn test_positive_velocity_projects_forward() {
        let req = ForecastRequest::new(two_points((5.0, 6.0), (10.0, 9.0)), ForecastConfig::default(), catalog());
        let res = project(&req).unwrap();

        assert_eq!(res.branch, ForecastBranch::Projecting);
        assert!((res.avg_velocity - 1.0).abs() < 1e-9);
        // Scope 15, done 6: nine days at one per day.
        assert!((res.days_to_complete - 9.0).abs() < 1e-9);
        assert_eq!(res.completion_date, Some(d(11)));

        let backward = &res.forecast_points[0];
        assert_eq!(backward.date, d(1));
        assert!((backward.forecast - 5.0).abs() < 1e-9);
        assert_eq!(backward.total_scope, None);

        let anchor = &res.forecast_points[1];
        assert_eq!(anchor.date, d(2));
        assert_eq!(anchor.total_scope, Some(15.0));

        // Jan 3rd..11th minus the weekend of the 6th and 7th.
        let forward = &res.forecast_points[2..];
        assert_eq!(forward.len(), 7);
        let last = forward.last().unwrap();
        assert_eq!(last.date, d(11));
        assert!((last.forecast - 13.0).abs() < 1e-9);
        assert!(forward.iter().all(|p| p.confidence_low.is_none()));
    }

    #[test]
    fn test_zero_velocity_is_flat() {
        let req = ForecastRequest::new(two_points((5.0, 5.0), (10.0, 10.0)), ForecastConfig::default(), catalog());
        let res = project(&req).unwrap();
        assert_eq!(res.branch, ForecastBranch::Stalled);
        assert!(res.days_to_complete.is_infinite());
        assert_eq!(res.completion_date, None);
        assert!(res.forecast_points.iter().all(|p| (p.forecast - 5.0).abs() < 1e-9));
        // Anchor plus the default 14 day horizon.
        assert_eq!(res.forecast_points.iter().filter(|p| p.date >= d(2)).count(), 15);
    }

    #[test]
    fn test_regression_never_slopes_down() {
        let req = ForecastRequest::new(two_points((5.0, 4.0), (10.0, 11.0)), ForecastConfig::default(), catalog());
        let res = project(&req).unwrap();
        assert!((res.avg_velocity + 1.0).abs() < 1e-9);
        let forward: Vec<_> = res.forecast_points.iter().filter(|p| p.date >= d(2)).collect();
        assert!(forward.iter().all(|p| (p.forecast - 4.0).abs() < 1e-9));
    }

    #[test]
    fn test_nothing_remaining_is_complete() {
        let req = ForecastRequest::new(two_points((4.0, 5.0), (0.0, 0.0)), ForecastConfig::default(), catalog())
            .until(d(5));
        let res = project(&req).unwrap();
        assert_eq!(res.branch, ForecastBranch::Completed);
        assert!(res.days_to_complete.abs() < f64::EPSILON);
        assert_eq!(res.completion_date, Some(d(2)));
        let forward: Vec<_> = res.forecast_points.iter().filter(|p| p.date > d(2)).collect();
        assert_eq!(forward.len(), 3);
        assert!(forward.iter().all(|p| (p.forecast - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_far_explicit_horizon_rejected_on_every_branch() {
        let far = NaiveDate::from_ymd_opt(9000, 1, 1).unwrap();
        for (done, todo) in [((5.0, 6.0), (10.0, 9.0)), ((5.0, 5.0), (10.0, 10.0)), ((4.0, 5.0), (0.0, 0.0))] {
            let req = ForecastRequest::new(two_points(done, todo), ForecastConfig::default(), catalog()).until(far);
            let err = ForecastProjector::default()
                .project_with(&req, &mut Xorshift64::seeded(1), &CancellationToken::new())
                .unwrap_err();
            assert!(matches!(
                err,
                BurnupError::Validation(ValidationError::HorizonTooFar { max: 3_650, .. })
            ));
        }

        // The limit itself is accepted.
        let edge = d(2) + Duration::days(3_650);
        let req = ForecastRequest::new(two_points((5.0, 5.0), (10.0, 10.0)), ForecastConfig::default(), catalog())
            .until(edge);
        let res = project(&req).unwrap();
        assert_eq!(res.forecast_points.last().unwrap().date, edge);
    }

    #[test]
    fn test_unavailable_cases() {
        let disabled = ForecastConfig {
            enabled: false,
            ..ForecastConfig::default()
        };
        let req = ForecastRequest::new(two_points((5.0, 6.0), (10.0, 9.0)), disabled, catalog());
        assert!(project(&req).is_none());

        let single = vec![SnapshotPoint::from_pairs(d(1), [("Done", 1.0)])];
        let req = ForecastRequest::new(single, ForecastConfig::default(), catalog());
        assert!(project(&req).is_none());

        let no_done = StatusCatalog::new(vec![
            StatusDefinition::new("To Do", StatusCategory::NotStarted),
            StatusDefinition::new("Done", StatusCategory::Done).disabled(),
        ]);
        let req = ForecastRequest::new(two_points((5.0, 6.0), (10.0, 9.0)), ForecastConfig::default(), no_done);
        assert!(project(&req).is_none());
    }

    #[test]
    fn test_disabled_status_counts_toward_scope() {
        let statuses = StatusCatalog::new(vec![
            StatusDefinition::new("To Do", StatusCategory::NotStarted).disabled(),
            StatusDefinition::new("Done", StatusCategory::Done),
        ]);
        let req = ForecastRequest::new(two_points((5.0, 6.0), (10.0, 9.0)), ForecastConfig::default(), statuses);
        let res = project(&req).unwrap();
        assert_eq!(res.forecast_points[1].total_scope, Some(15.0));
    }

    #[test]
    fn test_confidence_band_is_ordered() {
        let series: Vec<SnapshotPoint> = [(1, 0.0), (2, 2.0), (3, 3.0), (4, 6.0), (5, 7.0)]
            .into_iter()
            .map(|(day, done)| SnapshotPoint::from_pairs(d(day), [("Done", done), ("To Do", 30.0 - done)]))
            .collect();
        let config = ForecastConfig {
            show_confidence: true,
            trials: 500,
            averaging_window: 4,
            ..ForecastConfig::default()
        };
        let res = project(&ForecastRequest::new(series, config, catalog())).unwrap();

        let samples = res.simulation_results.as_ref().unwrap();
        assert_eq!(samples.slopes.len(), 500);
        let anchor = res.forecast_points.iter().find(|p| p.date == d(5)).unwrap();
        assert_eq!(anchor.confidence_low, Some(7.0));
        assert_eq!(anchor.confidence_high, Some(7.0));
        for p in res.forecast_points.iter().filter(|p| p.date > d(5)) {
            assert!(p.confidence_low.unwrap() <= p.confidence_high.unwrap());
        }
    }

    #[test]
    fn test_stable_seed_repeats() {
        let config = ForecastConfig {
            show_confidence: true,
            trials: 200,
            seed: SeedStrategy::Stable,
            ..ForecastConfig::default()
        };
        let series: Vec<SnapshotPoint> = [(1, 0.0), (2, 1.0), (3, 4.0)]
            .into_iter()
            .map(|(day, done)| SnapshotPoint::from_pairs(d(day), [("Done", done), ("To Do", 20.0 - done)]))
            .collect();
        let req = ForecastRequest::new(series, config, catalog());
        let projector = ForecastProjector::default();
        assert_eq!(projector.project(&req).unwrap(), projector.project(&req).unwrap());
    }

    #[test]
    fn test_rejects_out_of_range_config() {
        let config = ForecastConfig {
            show_confidence: true,
            trials: 5,
            ..ForecastConfig::default()
        };
        let req = ForecastRequest::new(two_points((5.0, 6.0), (10.0, 9.0)), config, catalog());
        let err = ForecastProjector::default().project(&req).unwrap_err();
        assert!(err.is_validation());

        let clamped = config.clamped(&SimulationLimits::default());
        assert_eq!(clamped.trials, 100);
        assert!(clamped.validate(&SimulationLimits::default()).is_ok());
    }

    #[test]
    fn test_result_wire_names() {
        let req = ForecastRequest::new(two_points((5.0, 5.0), (10.0, 10.0)), ForecastConfig::default(), catalog());
        let json = serde_json::to_value(project(&req).unwrap()).unwrap();
        assert_eq!(json["daysToComplete"], serde_json::Value::Null);
        assert_eq!(json["forecastPoints"][0]["Forecast"], 5.0);
        assert!(json["forecastPoints"][0].get("ConfidenceLow").is_none());

        let back: ForecastResult = serde_json::from_value(json).unwrap();
        assert!(back.days_to_complete.is_infinite());
    }
}
