//! Monte Carlo simulation of completion trajectories.
//!
//! Simulations resample historical workday velocities and are bounded by
//! [`SimulationLimits`]. Random draws always come from an injected
//! [`RandomSource`].

pub mod limits;
pub mod monte_carlo;
pub mod rng;
pub mod summary;

pub use limits::SimulationLimits;
pub use monte_carlo::{
    MonteCarloSimulator, SimulationOutcome, SimulationParams, SimulationSamples,
    CONFIDENCE_HIGH_QUANTILE, CONFIDENCE_LOW_QUANTILE,
};
pub use rng::{RandomSource, SeedStrategy, Xorshift64};
pub use summary::{summarize, DistributionSummary, HistogramBin, SimulationSummary};
