//! Cell configuration
//!
//! `CellConfig` holds the immutable parameters of one cell. On the wire it is
//! a flat JSON record where `lockdown_type` and `rand_type` select a variant
//! and decide which of the optional fields are required:
//!
//! | `lockdown_type` | policy               | required fields                                              |
//! |-----------------|----------------------|--------------------------------------------------------------|
//! | 0 / other       | no lockdown          | –                                                            |
//! | 1               | scheduled phases     | `lockdown_rates`, `phase_durations`, `disobedience`          |
//! | 2               | continuous reaction  | `lockdown_rates`, `lockdown_adoption`, `disobedience`        |
//! | 3               | phase reaction       | `lockdown_rates`, `phase_thresholds`, `threshold_buffers`, `disobedience` |
//!
//! | `rand_type` | distribution | required fields                  |
//! |-------------|--------------|----------------------------------|
//! | 0 / other   | static       | –                                |
//! | 1           | normal       | `rand_mean`, `rand_stddev`       |
//! | 2           | uniform      | `rand_lower`, `rand_upper`       |
//! | 3           | exponential  | `rand_avg_occurence_rate`        |
//!
//! Unknown codes are not errors: they fall back to the "no effect" variant
//! and a warning is logged. A missing required field is an error.

use crate::lockdown::LockdownConfig;
use crate::rates::RateDistribution;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading or validating a cell configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing field '{field}' required by {variant}")]
    MissingField {
        field: &'static str,
        variant: &'static str,
    },

    #[error("Field '{field}' has {actual} age segments, expected {expected}")]
    SegmentMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("At least one age segment is required")]
    NoSegments,

    #[error("Precision must be positive and finite, got {0}")]
    InvalidPrecision(f64),

    #[error("Lockdown policy has {phases} phases but lockdown_rates has {rows} rows")]
    MissingPhaseRates { phases: usize, rows: usize },

    #[error("Phase schedule must contain at least one time unit")]
    EmptySchedule,

    #[error("Invalid rate distribution: {0}")]
    InvalidDistribution(String),

    #[error("Invalid initial state: {0}")]
    InvalidState(String),
}

/// Immutable parameters of a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CellConfigRecord", into = "CellConfigRecord")]
pub struct CellConfig {
    pub susceptibility: Vec<f64>,
    pub virulence: Vec<f64>,
    pub recovery: Vec<f64>,
    pub mortality: Vec<f64>,

    /// Total infected ratio above which healthcare is overloaded
    pub infected_capacity: f64,
    /// Death multiplier applied while overloaded
    pub over_capacity_modifier: f64,

    pub mask_use: Vec<f64>,
    pub mask_susceptibility_reduction: f64,
    pub mask_virulence_reduction: f64,
    pub mask_adoption: f64,

    /// Ratios are rounded to multiples of `1 / precision`
    pub precision: f64,

    pub lockdown: LockdownConfig,
    pub rate_distribution: RateDistribution,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            susceptibility: vec![1.0],
            virulence: vec![0.6],
            recovery: vec![0.4],
            mortality: vec![0.03],
            infected_capacity: 0.1,
            over_capacity_modifier: 1.5,
            mask_use: vec![1.0],
            mask_susceptibility_reduction: 0.5,
            mask_virulence_reduction: 0.5,
            mask_adoption: 0.5,
            precision: 100.0,
            lockdown: LockdownConfig::None,
            rate_distribution: RateDistribution::Static,
        }
    }
}

impl CellConfig {
    /// Number of age segments this configuration describes
    pub fn n_segments(&self) -> usize {
        self.virulence.len()
    }

    /// Check shapes and ranges
    ///
    /// Every per-segment vector must have one entry per age segment, and the
    /// lockdown tables must cover every phase the policy can enter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.n_segments();
        if n == 0 {
            return Err(ConfigError::NoSegments);
        }

        for (field, values) in [
            ("susceptibility", &self.susceptibility),
            ("recovery", &self.recovery),
            ("mortality", &self.mortality),
            ("mask_use", &self.mask_use),
        ] {
            check_segments(field, values.len(), n)?;
        }

        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(ConfigError::InvalidPrecision(self.precision));
        }

        self.validate_lockdown(n)?;
        self.validate_distribution()
    }

    fn validate_lockdown(&self, n: usize) -> Result<(), ConfigError> {
        let (rates, disobedience, phases) = match &self.lockdown {
            LockdownConfig::None => return Ok(()),
            LockdownConfig::ScheduledPhase {
                lockdown_rates,
                phase_durations,
                disobedience,
            } => {
                if phase_durations.iter().sum::<usize>() == 0 {
                    return Err(ConfigError::EmptySchedule);
                }
                (lockdown_rates, disobedience, phase_durations.len())
            }
            LockdownConfig::ReactionContinuous {
                lockdown_rates,
                disobedience,
                ..
            } => (lockdown_rates, disobedience, 1),
            LockdownConfig::ReactionPhase {
                lockdown_rates,
                phase_thresholds,
                threshold_buffers,
                disobedience,
            } => {
                if phase_thresholds.is_empty() {
                    return Err(ConfigError::MissingField {
                        field: "phase_thresholds",
                        variant: "reaction phase lockdown",
                    });
                }
                check_segments("threshold_buffers", threshold_buffers.len(), phase_thresholds.len())?;
                (lockdown_rates, disobedience, phase_thresholds.len())
            }
        };

        check_segments("disobedience", disobedience.len(), n)?;
        if rates.len() < phases {
            return Err(ConfigError::MissingPhaseRates {
                phases,
                rows: rates.len(),
            });
        }
        for row in rates {
            check_segments("lockdown_rates", row.len(), n)?;
        }
        Ok(())
    }

    fn validate_distribution(&self) -> Result<(), ConfigError> {
        match self.rate_distribution {
            RateDistribution::Static => Ok(()),
            RateDistribution::Normal { mean, std_dev } => {
                if mean.is_finite() && std_dev.is_finite() && std_dev >= 0.0 {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidDistribution(format!(
                        "normal(mean={}, stddev={})",
                        mean, std_dev
                    )))
                }
            }
            RateDistribution::Uniform { lower, upper } => {
                if lower.is_finite() && upper.is_finite() && lower <= upper {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidDistribution(format!(
                        "uniform(lower={}, upper={})",
                        lower, upper
                    )))
                }
            }
            RateDistribution::Exponential { rate } => {
                if rate.is_finite() && rate > 0.0 {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidDistribution(format!(
                        "exponential(rate={})",
                        rate
                    )))
                }
            }
        }
    }
}

fn check_segments(field: &'static str, actual: usize, expected: usize) -> Result<(), ConfigError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ConfigError::SegmentMismatch {
            field,
            expected,
            actual,
        })
    }
}

/// Flat wire representation of `CellConfig`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CellConfigRecord {
    susceptibility: Vec<f64>,
    virulence: Vec<f64>,
    recovery: Vec<f64>,
    mortality: Vec<f64>,
    infected_capacity: f64,
    over_capacity_modifier: f64,
    mask_use: Vec<f64>,
    mask_susceptibility_reduction: f64,
    mask_virulence_reduction: f64,
    mask_adoption: f64,
    precision: f64,

    #[serde(default)]
    lockdown_type: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lockdown_rates: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phase_durations: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lockdown_adoption: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phase_thresholds: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    threshold_buffers: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disobedience: Option<Vec<f64>>,

    #[serde(default)]
    rand_type: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rand_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rand_stddev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rand_lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rand_upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rand_avg_occurence_rate: Option<f64>,
}

fn required<T>(value: Option<T>, field: &'static str, variant: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingField { field, variant })
}

impl CellConfigRecord {
    fn lockdown(&mut self) -> Result<LockdownConfig, ConfigError> {
        let config = match self.lockdown_type {
            0 => LockdownConfig::None,
            1 => {
                let variant = "scheduled phase lockdown";
                LockdownConfig::ScheduledPhase {
                    lockdown_rates: required(self.lockdown_rates.take(), "lockdown_rates", variant)?,
                    phase_durations: required(self.phase_durations.take(), "phase_durations", variant)?,
                    disobedience: required(self.disobedience.take(), "disobedience", variant)?,
                }
            }
            2 => {
                let variant = "continuous reaction lockdown";
                LockdownConfig::ReactionContinuous {
                    lockdown_rates: required(self.lockdown_rates.take(), "lockdown_rates", variant)?,
                    lockdown_adoption: required(self.lockdown_adoption, "lockdown_adoption", variant)?,
                    disobedience: required(self.disobedience.take(), "disobedience", variant)?,
                }
            }
            3 => {
                let variant = "reaction phase lockdown";
                LockdownConfig::ReactionPhase {
                    lockdown_rates: required(self.lockdown_rates.take(), "lockdown_rates", variant)?,
                    phase_thresholds: required(self.phase_thresholds.take(), "phase_thresholds", variant)?,
                    threshold_buffers: required(self.threshold_buffers.take(), "threshold_buffers", variant)?,
                    disobedience: required(self.disobedience.take(), "disobedience", variant)?,
                }
            }
            unknown => {
                warn!(lockdown_type = unknown, "unknown lockdown type, falling back to no lockdown");
                LockdownConfig::None
            }
        };
        Ok(config)
    }

    fn rate_distribution(&self) -> Result<RateDistribution, ConfigError> {
        let distribution = match self.rand_type {
            0 => RateDistribution::Static,
            1 => {
                let variant = "normal distribution";
                RateDistribution::Normal {
                    mean: required(self.rand_mean, "rand_mean", variant)?,
                    std_dev: required(self.rand_stddev, "rand_stddev", variant)?,
                }
            }
            2 => {
                let variant = "uniform distribution";
                RateDistribution::Uniform {
                    lower: required(self.rand_lower, "rand_lower", variant)?,
                    upper: required(self.rand_upper, "rand_upper", variant)?,
                }
            }
            3 => RateDistribution::Exponential {
                rate: required(
                    self.rand_avg_occurence_rate,
                    "rand_avg_occurence_rate",
                    "exponential distribution",
                )?,
            },
            unknown => {
                warn!(rand_type = unknown, "unknown rand type, falling back to static rates");
                RateDistribution::Static
            }
        };
        Ok(distribution)
    }
}

impl TryFrom<CellConfigRecord> for CellConfig {
    type Error = ConfigError;

    fn try_from(mut record: CellConfigRecord) -> Result<Self, Self::Error> {
        let lockdown = record.lockdown()?;
        let rate_distribution = record.rate_distribution()?;

        let config = CellConfig {
            susceptibility: record.susceptibility,
            virulence: record.virulence,
            recovery: record.recovery,
            mortality: record.mortality,
            infected_capacity: record.infected_capacity,
            over_capacity_modifier: record.over_capacity_modifier,
            mask_use: record.mask_use,
            mask_susceptibility_reduction: record.mask_susceptibility_reduction,
            mask_virulence_reduction: record.mask_virulence_reduction,
            mask_adoption: record.mask_adoption,
            precision: record.precision,
            lockdown,
            rate_distribution,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<CellConfig> for CellConfigRecord {
    fn from(config: CellConfig) -> Self {
        let mut record = CellConfigRecord {
            susceptibility: config.susceptibility,
            virulence: config.virulence,
            recovery: config.recovery,
            mortality: config.mortality,
            infected_capacity: config.infected_capacity,
            over_capacity_modifier: config.over_capacity_modifier,
            mask_use: config.mask_use,
            mask_susceptibility_reduction: config.mask_susceptibility_reduction,
            mask_virulence_reduction: config.mask_virulence_reduction,
            mask_adoption: config.mask_adoption,
            precision: config.precision,
            lockdown_type: config.lockdown.code(),
            lockdown_rates: None,
            phase_durations: None,
            lockdown_adoption: None,
            phase_thresholds: None,
            threshold_buffers: None,
            disobedience: None,
            rand_type: config.rate_distribution.code(),
            rand_mean: None,
            rand_stddev: None,
            rand_lower: None,
            rand_upper: None,
            rand_avg_occurence_rate: None,
        };

        match config.lockdown {
            LockdownConfig::None => {}
            LockdownConfig::ScheduledPhase {
                lockdown_rates,
                phase_durations,
                disobedience,
            } => {
                record.lockdown_rates = Some(lockdown_rates);
                record.phase_durations = Some(phase_durations);
                record.disobedience = Some(disobedience);
            }
            LockdownConfig::ReactionContinuous {
                lockdown_rates,
                lockdown_adoption,
                disobedience,
            } => {
                record.lockdown_rates = Some(lockdown_rates);
                record.lockdown_adoption = Some(lockdown_adoption);
                record.disobedience = Some(disobedience);
            }
            LockdownConfig::ReactionPhase {
                lockdown_rates,
                phase_thresholds,
                threshold_buffers,
                disobedience,
            } => {
                record.lockdown_rates = Some(lockdown_rates);
                record.phase_thresholds = Some(phase_thresholds);
                record.threshold_buffers = Some(threshold_buffers);
                record.disobedience = Some(disobedience);
            }
        }

        match config.rate_distribution {
            RateDistribution::Static => {}
            RateDistribution::Normal { mean, std_dev } => {
                record.rand_mean = Some(mean);
                record.rand_stddev = Some(std_dev);
            }
            RateDistribution::Uniform { lower, upper } => {
                record.rand_lower = Some(lower);
                record.rand_upper = Some(upper);
            }
            RateDistribution::Exponential { rate } => {
                record.rand_avg_occurence_rate = Some(rate);
            }
        }

        record
    }
}
