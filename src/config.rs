//! Layered configuration loading using figment.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`BURNUP_*` prefix, `__` between sections)
//! 2. A TOML file (`.burnup/config.toml` by default)
//! 3. Built-in defaults
//!
//! `BURNUP_FORECAST__TRIALS=5000` maps to `forecast.trials`, and
//! `BURNUP_SAMPLING__HOUR=10` to `sampling.hour`. Configuration is only ever
//! read; nothing here writes it back.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::error::BurnupResult;
use crate::forecast::{ForecastConfig, ForecastProjector};
use crate::history::HistoryReconstructor;
use crate::item::FieldAliases;
use crate::runtime::ForecastRuntimeConfig;
use crate::series::SnapshotSeriesBuilder;
use crate::simulation::SimulationLimits;
use crate::time::SamplingPolicy;

/// Project-local configuration file.
pub const DEFAULT_CONFIG_PATH: &str = ".burnup/config.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BURNUP_";

/// Top-level configuration, one field per TOML section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnupConfig {
    /// Forecast defaults.
    pub forecast: ForecastConfig,
    /// Daily sampling instant.
    pub sampling: SamplingPolicy,
    /// Resource bounds.
    pub limits: SimulationLimits,
    /// Working weekdays.
    pub calendar: WorkCalendar,
    /// Background worker pool.
    pub runtime: ForecastRuntimeConfig,
    /// Display-name aliases of raw field keys.
    pub fields: FieldAliases,
}

impl BurnupConfig {
    /// Loads from defaults, `.burnup/config.toml` if present, and the environment.
    ///
    /// # Errors
    ///
    /// Returns `BurnupError::Config` if a source cannot be parsed and a
    /// `ValidationError` if a section holds out-of-range values.
    pub fn load() -> BurnupResult<Self> {
        Self::extract(Self::figment())
    }

    /// Like [`Self::load`], reading the TOML layer from `path`.
    ///
    /// # Errors
    ///
    /// As [`Self::load`].
    pub fn load_from(path: impl AsRef<Path>) -> BurnupResult<Self> {
        Self::extract(Self::figment_with(Some(path.as_ref().to_path_buf())))
    }

    /// The default provider chain. Public so callers can layer more providers.
    #[must_use]
    pub fn figment() -> Figment {
        let local = PathBuf::from(DEFAULT_CONFIG_PATH);
        Self::figment_with(local.exists().then_some(local))
    }

    fn figment_with(file: Option<PathBuf>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> BurnupResult<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        tracing::debug!(
            trials = config.forecast.trials,
            window = config.forecast.averaging_window,
            hour = config.sampling.hour,
            offset_minutes = config.sampling.utc_offset_minutes,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> BurnupResult<()> {
        self.limits.validate()?;
        self.forecast.validate(&self.limits)?;
        self.sampling.validate()?;
        self.calendar.validate()?;
        Ok(())
    }

    /// A series builder honouring the sampling, calendar and alias sections.
    #[must_use]
    pub fn series_builder(&self) -> SnapshotSeriesBuilder {
        SnapshotSeriesBuilder::new(
            HistoryReconstructor::new(self.fields.clone()),
            self.calendar.clone(),
            self.sampling,
        )
    }

    /// A projector honouring the calendar and limits sections.
    #[must_use]
    pub fn projector(&self) -> ForecastProjector {
        ForecastProjector::new(self.calendar.clone(), self.limits)
    }
}
