//! Error types for burnup.
//!
//! All errors are strongly typed using thiserror. Forecast *unavailability*
//! (disabled configuration, too few points, no done status) is not an error;
//! it is reported as `Ok(None)` by the projector.

use chrono::NaiveDate;
use thiserror::Error;

/// Validation errors raised before any computation starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A trial count outside the configured limits.
    #[error("Trial count {value} is out of range [{min}, {max}]")]
    TrialCountOutOfRange {
        value: usize,
        min: usize,
        max: usize,
    },

    /// An averaging window of zero intervals.
    #[error("Averaging window must be at least 1 interval")]
    EmptyAveragingWindow,

    /// A simulation day cap of zero.
    #[error("Simulation day cap must be > 0")]
    ZeroDayCap,

    /// A span whose start is after its end.
    #[error("Invalid date span: start ({start}) must not be after end ({end})")]
    InvalidDateSpan {
        start: NaiveDate,
        end: NaiveDate,
    },

    /// A sampling hour past 23.
    #[error("Sampling hour {hour} is out of range [0, 23]")]
    SamplingHourOutOfRange {
        hour: u32,
    },

    /// A sampling offset chrono cannot represent.
    #[error("Sampling offset of {minutes} minutes is not a valid UTC offset")]
    InvalidSamplingOffset {
        minutes: i32,
    },

    /// A calendar with every weekday non-working.
    #[error("Work calendar must contain at least one working weekday")]
    NoWorkingDays,

    /// An explicit horizon further out than `max_horizon_days`.
    #[error("Horizon of {days} days exceeds the maximum of {max} days")]
    HorizonTooFar {
        days: i64,
        max: u32,
    },

    /// Inconsistent simulation limits.
    #[error("Invalid simulation limits: {reason}")]
    InvalidLimits {
        reason: String,
    },
}

/// Execution errors raised while a computation is running.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The cancellation token fired mid-run.
    #[error("Simulation cancelled after {completed_trials} of {requested_trials} trials")]
    Cancelled {
        completed_trials: usize,
        requested_trials: usize,
    },

    /// The job queue is at capacity.
    #[error("Forecast queue is full (capacity: {capacity})")]
    QueueFull {
        capacity: usize,
    },

    /// The worker pool has shut down.
    #[error("Forecast worker disconnected")]
    Disconnected,

    /// No reply arrived in time.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for burnup.
#[derive(Debug, Error)]
pub enum BurnupError {
    /// Input rejected before computing.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Failure while computing.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Figment extraction or merge error.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// A broken internal assumption, such as a failed thread spawn.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl BurnupError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if the computation was cancelled before completing.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Cancelled { .. }))
    }

    /// Returns true if configuration could not be loaded.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for burnup operations.
pub type BurnupResult<T> = Result<T, BurnupError>;
