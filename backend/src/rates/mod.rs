//! Rate sampler: stochastic jitter applied to infection, recovery and
//! mortality rates.
//!
//! Each cell owns one `RateSampler`, which owns the cell's random sub-stream.
//! Sampling advances that stream, so it takes `&mut self`.
//!
//! # Example
//!
//! ```
//! use sird_cell_core_rs::rates::{RateDistribution, RateSampler};
//! use sird_cell_core_rs::RngManager;
//!
//! let mut sampler = RateSampler::new(RateDistribution::Static, RngManager::new(42));
//! assert_eq!(sampler.sample(), 1.0);
//!
//! let mut jittered = RateSampler::new(
//!     RateDistribution::Uniform { lower: 0.5, upper: 1.5 },
//!     RngManager::new(42),
//! );
//! let draw = jittered.sample();
//! assert!((0.5..1.5).contains(&draw));
//! ```

use crate::rng::RngManager;

/// Distribution the rate multiplier is drawn from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RateDistribution {
    /// Always 1.0: rates are applied without jitter
    #[default]
    Static,

    /// Normal distribution; `mean` is expected to be 1.0
    Normal { mean: f64, std_dev: f64 },

    /// Uniform distribution over `[lower, upper)`
    Uniform { lower: f64, upper: f64 },

    /// Exponential distribution with an average occurrence rate (mean `1 / rate`)
    Exponential { rate: f64 },
}

impl RateDistribution {
    /// Configuration code (`rand_type`)
    pub fn code(&self) -> u32 {
        match self {
            RateDistribution::Static => 0,
            RateDistribution::Normal { .. } => 1,
            RateDistribution::Uniform { .. } => 2,
            RateDistribution::Exponential { .. } => 3,
        }
    }
}

/// Per-cell sampler of rate multipliers
#[derive(Debug, Clone)]
pub struct RateSampler {
    distribution: RateDistribution,
    rng: RngManager,
}

impl RateSampler {
    pub fn new(distribution: RateDistribution, rng: RngManager) -> Self {
        Self { distribution, rng }
    }

    /// Draw one multiplier.
    ///
    /// Draws below zero are floored at 0.0: jitter can suppress a rate but
    /// never reverse it. `Static` does not touch the random stream.
    pub fn sample(&mut self) -> f64 {
        let draw = match &self.distribution {
            RateDistribution::Static => return 1.0,
            RateDistribution::Normal { mean, std_dev } => {
                mean + std_dev * self.rng.standard_normal()
            }
            RateDistribution::Uniform { lower, upper } => {
                lower + (upper - lower) * self.rng.next_f64()
            }
            RateDistribution::Exponential { rate } => self.rng.exponential(*rate),
        };
        draw.max(0.0)
    }

    pub fn distribution(&self) -> &RateDistribution {
        &self.distribution
    }

    /// Replace the random stream (checkpoint restore)
    pub fn reseed(&mut self, rng: RngManager) {
        self.rng = rng;
    }

    /// Position in the random stream (for checkpoints)
    pub fn rng_state(&self) -> u64 {
        self.rng.get_state()
    }
}
