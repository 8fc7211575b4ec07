//! Simulation limits (resource bounds).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Largest accepted `max_horizon_days` (about a century).
pub const HORIZON_CEILING_DAYS: u32 = 36_500;

/// Bounds that keep forecasting and simulation cost finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationLimits {
    /// Smallest accepted trial count.
    pub min_trials: usize,
    /// Largest accepted trial count.
    pub max_trials: usize,
    /// Hard cap on simulated days per trial.
    pub day_cap: u32,
    /// Horizon used when no end date is given and there is nothing to project.
    pub default_horizon_days: u32,
    /// Longest forward projection without an explicit end date.
    pub max_projection_days: u32,
    /// Furthest accepted horizon, in calendar days after the latest point.
    ///
    /// Every other day bound must fit inside it.
    pub max_horizon_days: u32,
}

impl Default for SimulationLimits {
    fn default() -> Self {
        Self {
            min_trials: 100,
            max_trials: 100_000,
            day_cap: 730,
            default_horizon_days: 14,
            max_projection_days: 730,
            max_horizon_days: 3_650,
        }
    }
}

impl SimulationLimits {
    /// Validate limits.
    ///
    /// This must be called before the limits bound any computation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_trials == 0 {
            return Err(ValidationError::InvalidLimits {
                reason: "min_trials must be > 0".to_string(),
            });
        }
        if self.min_trials > self.max_trials {
            return Err(ValidationError::InvalidLimits {
                reason: format!(
                    "min_trials ({}) must not exceed max_trials ({})",
                    self.min_trials, self.max_trials
                ),
            });
        }
        if self.day_cap == 0 {
            return Err(ValidationError::ZeroDayCap);
        }
        if self.max_projection_days == 0 {
            return Err(ValidationError::InvalidLimits {
                reason: "max_projection_days must be > 0".to_string(),
            });
        }
        if self.max_horizon_days == 0 || self.max_horizon_days > HORIZON_CEILING_DAYS {
            return Err(ValidationError::InvalidLimits {
                reason: format!(
                    "max_horizon_days ({}) must be in [1, {HORIZON_CEILING_DAYS}]",
                    self.max_horizon_days
                ),
            });
        }
        for (name, days) in [
            ("day_cap", self.day_cap),
            ("default_horizon_days", self.default_horizon_days),
            ("max_projection_days", self.max_projection_days),
        ] {
            if days > self.max_horizon_days {
                return Err(ValidationError::InvalidLimits {
                    reason: format!(
                        "{name} ({days}) must not exceed max_horizon_days ({})",
                        self.max_horizon_days
                    ),
                });
            }
        }
        Ok(())
    }

    /// Rejects an explicit horizon further than `max_horizon_days` out.
    pub fn check_horizon(&self, days: i64) -> Result<u32, ValidationError> {
        u32::try_from(days.max(0))
            .ok()
            .filter(|d| *d <= self.max_horizon_days)
            .ok_or(ValidationError::HorizonTooFar {
                days,
                max: self.max_horizon_days,
            })
    }

    /// Rejects trial counts outside `[min_trials, max_trials]`.
    pub fn check_trials(&self, trials: usize) -> Result<(), ValidationError> {
        if trials < self.min_trials || trials > self.max_trials {
            return Err(ValidationError::TrialCountOutOfRange {
                value: trials,
                min: self.min_trials,
                max: self.max_trials,
            });
        }
        Ok(())
    }

    /// Clamps a trial count into `[min_trials, max_trials]`.
    #[must_use]
    pub fn clamp_trials(&self, trials: usize) -> usize {
        trials.clamp(self.min_trials, self.max_trials.max(self.min_trials))
    }
}
