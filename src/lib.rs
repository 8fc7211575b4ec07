//! # burnup - point-in-time reconstruction and burn-up forecasting
//!
//! burnup rebuilds the historical state of tracked work items from their
//! append-only change logs and projects future completion from the resulting
//! daily series.
//!
//! ## Core Concepts
//!
//! - **Item**: a work item with current field values and a complete change log
//! - **Snapshot**: per-status totals for one working date
//! - **Velocity**: day-over-day change of the done total
//! - **Forecast**: a trend line anchored at the latest snapshot, optionally
//!   wrapped in a Monte Carlo confidence band
//!
//! Data flows one way: items → [`HistoryReconstructor`] →
//! [`SnapshotSeriesBuilder`] → [`VelocityEstimator`] → [`ForecastProjector`]
//! → [`MonteCarloSimulator`].
//!
//! ## Usage
//!
//! ```rust
//! use burnup::{
//!     ChangeEntry, DateSpan, ForecastConfig, ForecastProjector, ForecastRequest, Item, Metric,
//!     SeriesRequest, SnapshotSeriesBuilder, StatusCatalog, StatusCategory, StatusDefinition,
//! };
//! use chrono::{NaiveDate, TimeZone, Utc};
//!
//! let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let items = vec![
//!     Item::builder("P-1", created)
//!         .status("Done")
//!         .change(ChangeEntry::new(
//!             Utc.with_ymd_and_hms(2024, 1, 2, 20, 0, 0).unwrap(),
//!             "status",
//!             "To Do",
//!             "Done",
//!         ))
//!         .build(),
//!     Item::builder("P-2", created).status("To Do").build(),
//! ];
//!
//! let span = DateSpan::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
//! )?;
//! let request = SeriesRequest::new(span, Metric::Count, vec!["To Do".into(), "Done".into()]);
//! let series = SnapshotSeriesBuilder::default().build(&items, &request)?;
//!
//! let statuses = StatusCatalog::new(vec![
//!     StatusDefinition::new("To Do", StatusCategory::NotStarted),
//!     StatusDefinition::new("Done", StatusCategory::Done),
//! ]);
//! let forecast = ForecastProjector::default()
//!     .project(&ForecastRequest::new(series, ForecastConfig::default(), statuses))?;
//! assert!(forecast.is_some());
//! # Ok::<(), burnup::BurnupError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Reconstruction
pub mod calendar;
pub mod error;
pub mod history;
pub mod item;
pub mod series;
pub mod snapshot;
pub mod status;
pub mod time;
pub mod value;

// Forecasting
pub mod cancel;
pub mod config;
pub mod forecast;
pub mod runtime;
pub mod simulation;
pub mod velocity;

// Re-export primary types at crate root for convenience
pub use calendar::WorkCalendar;
pub use cancel::CancellationToken;
pub use config::BurnupConfig;
pub use error::{BurnupError, BurnupResult, ExecutionError, ValidationError};
pub use forecast::{
    ForecastBranch, ForecastConfig, ForecastPoint, ForecastProjector, ForecastRequest,
    ForecastResult,
};
pub use history::{FieldTimeline, HistoryReconstructor};
pub use item::{ChangeEntry, FieldAliases, Item, ItemBuilder, ItemKey, STATUS_FIELD, STORY_POINTS_FIELD};
pub use runtime::{ForecastHandle, ForecastRunId, ForecastRuntime, ForecastRuntimeConfig};
pub use series::{Metric, SeriesRequest, SnapshotSeriesBuilder, COUNT_METRIC};
pub use simulation::{
    MonteCarloSimulator, RandomSource, SeedStrategy, SimulationLimits, SimulationOutcome,
    SimulationParams, SimulationSamples, SimulationSummary, Xorshift64,
};
pub use snapshot::SnapshotPoint;
pub use status::{
    extract_all_statuses, StatusCatalog, StatusCategory, StatusDefinition, DEFAULT_PALETTE,
};
pub use time::{DateSpan, SamplingPolicy};
pub use value::FieldValue;
pub use velocity::{Velocities, VelocityEstimator, VelocitySample};
