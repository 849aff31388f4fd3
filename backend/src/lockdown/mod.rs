//! Lockdown Policy Module
//!
//! A lockdown policy turns a cell state into per-segment *activity factors*
//! (multipliers that dampen virulence) and decides the cell's next lockdown
//! phase.
//!
//! # Policy Interface
//!
//! All policies implement the `LockdownPolicy` trait:
//! ```rust
//! use sird_cell_core_rs::lockdown::LockdownPolicy;
//! use sird_cell_core_rs::CellState;
//!
//! #[derive(Debug)]
//! struct HalfActivity;
//!
//! impl LockdownPolicy for HalfActivity {
//!     fn activity_factors(&self, state: &CellState) -> Vec<f64> {
//!         vec![0.5; state.n_segments()]
//!     }
//!
//!     fn next_phase(&self, _clock: usize, _state: &CellState) -> usize {
//!         0
//!     }
//! }
//! ```
//!
//! Available policies (configuration code in parentheses):
//! 1. **NoLockdown** (0): activity is never restricted
//! 2. **ScheduledPhaseLockdown** (1): phases cycle on a fixed calendar
//! 3. **ReactionContinuousLockdown** (2): restriction grows with infection
//! 4. **ReactionPhaseLockdown** (3): phases driven by infection thresholds
//!    with hysteresis
//!
//! Policies are built once from a `LockdownConfig` via `create_lockdown` and
//! never change afterwards.

use crate::models::CellState;
use std::fmt;

pub mod none;
pub mod reaction_continuous;
pub mod reaction_phase;
pub mod scheduled;

pub use none::NoLockdown;
pub use reaction_continuous::ReactionContinuousLockdown;
pub use reaction_phase::ReactionPhaseLockdown;
pub use scheduled::ScheduledPhaseLockdown;

/// Lockdown policy trait
///
/// Implementations are immutable: both methods take `&self` and depend only
/// on their arguments.
pub trait LockdownPolicy: fmt::Debug + Send + Sync {
    /// Per-segment multipliers applied to the virulence of `state`
    fn activity_factors(&self, state: &CellState) -> Vec<f64>;

    /// Lockdown phase the cell moves to, given the clock and its new state
    fn next_phase(&self, clock: usize, state: &CellState) -> usize;
}

/// Policy selection and parameters for a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LockdownConfig {
    /// No response to the epidemic
    #[default]
    None,

    /// Phases follow a fixed, repeating schedule
    ScheduledPhase {
        /// `lockdown_rates[phase][segment]`
        lockdown_rates: Vec<Vec<f64>>,
        /// Duration of each phase in time units
        phase_durations: Vec<usize>,
        /// Fraction of each segment that ignores the restriction
        disobedience: Vec<f64>,
    },

    /// Restriction strength follows the infected ratio continuously
    ReactionContinuous {
        lockdown_rates: Vec<Vec<f64>>,
        lockdown_adoption: f64,
        disobedience: Vec<f64>,
    },

    /// Phases escalate/relax on infected-ratio thresholds
    ReactionPhase {
        lockdown_rates: Vec<Vec<f64>>,
        /// Infected ratio at which each phase starts
        phase_thresholds: Vec<f64>,
        /// Margin below a phase's threshold required before relaxing it
        threshold_buffers: Vec<f64>,
        disobedience: Vec<f64>,
    },
}

impl LockdownConfig {
    /// Configuration code (`lockdown_type`)
    pub fn code(&self) -> u32 {
        match self {
            LockdownConfig::None => 0,
            LockdownConfig::ScheduledPhase { .. } => 1,
            LockdownConfig::ReactionContinuous { .. } => 2,
            LockdownConfig::ReactionPhase { .. } => 3,
        }
    }

    /// Human-readable policy name (used in logs)
    pub fn name(&self) -> &'static str {
        match self {
            LockdownConfig::None => "no_lockdown",
            LockdownConfig::ScheduledPhase { .. } => "scheduled_phase",
            LockdownConfig::ReactionContinuous { .. } => "reaction_continuous",
            LockdownConfig::ReactionPhase { .. } => "reaction_phase",
        }
    }
}

/// Build the policy object for a configuration
///
/// # Example
///
/// ```
/// use sird_cell_core_rs::lockdown::{create_lockdown, LockdownConfig};
/// use sird_cell_core_rs::CellState;
///
/// let policy = create_lockdown(&LockdownConfig::None);
/// let state = CellState::new(10, vec![1.0], vec![0.0], vec![0.0], vec![0.0]);
/// assert_eq!(policy.activity_factors(&state), vec![1.0]);
/// assert_eq!(policy.next_phase(17, &state), 0);
/// ```
pub fn create_lockdown(config: &LockdownConfig) -> Box<dyn LockdownPolicy> {
    match config {
        LockdownConfig::None => Box::new(NoLockdown::new()),
        LockdownConfig::ScheduledPhase {
            lockdown_rates,
            phase_durations,
            disobedience,
        } => Box::new(ScheduledPhaseLockdown::new(
            lockdown_rates.clone(),
            phase_durations.clone(),
            disobedience.clone(),
        )),
        LockdownConfig::ReactionContinuous {
            lockdown_rates,
            lockdown_adoption,
            disobedience,
        } => Box::new(ReactionContinuousLockdown::new(
            lockdown_rates.clone(),
            *lockdown_adoption,
            disobedience.clone(),
        )),
        LockdownConfig::ReactionPhase {
            lockdown_rates,
            phase_thresholds,
            threshold_buffers,
            disobedience,
        } => Box::new(ReactionPhaseLockdown::new(
            lockdown_rates.clone(),
            phase_thresholds.clone(),
            threshold_buffers.clone(),
            disobedience.clone(),
        )),
    }
}

/// Rates row for a phase.
///
/// A neighbor's state may carry a phase from a different policy; such phases
/// are clamped to the last configured row.
pub(crate) fn phase_rates(lockdown_rates: &[Vec<f64>], phase: usize) -> &[f64] {
    match lockdown_rates.len() {
        0 => &[],
        rows => &lockdown_rates[phase.min(rows - 1)],
    }
}

/// `d + (1 - d) * strength * rate` per segment.
///
/// The disobedient fraction ignores the restriction entirely. Segments
/// without a configured rate are unrestricted.
pub(crate) fn blend_with_disobedience(
    disobedience: &[f64],
    rates: &[f64],
    strength: f64,
    n_segments: usize,
) -> Vec<f64> {
    (0..n_segments)
        .map(|i| {
            let d = disobedience.get(i).copied().unwrap_or(0.0);
            let rate = rates.get(i).copied().unwrap_or(1.0);
            d + (1.0 - d) * strength * rate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_rates_clamps_to_last_row() {
        let rates = vec![vec![1.0], vec![0.5], vec![0.2]];
        assert_eq!(phase_rates(&rates, 1), &[0.5]);
        assert_eq!(phase_rates(&rates, 9), &[0.2]);
        assert!(phase_rates(&[], 0).is_empty());
    }

    #[test]
    fn test_blend_full_obedience_uses_rate() {
        assert_eq!(blend_with_disobedience(&[0.0], &[0.3], 1.0, 1), vec![0.3]);
    }

    #[test]
    fn test_blend_full_disobedience_ignores_rate() {
        assert_eq!(blend_with_disobedience(&[1.0], &[0.0], 1.0, 1), vec![1.0]);
    }

    #[test]
    fn test_factory_matches_codes() {
        let configs = [
            LockdownConfig::None,
            LockdownConfig::ScheduledPhase {
                lockdown_rates: vec![vec![1.0]],
                phase_durations: vec![1],
                disobedience: vec![0.0],
            },
            LockdownConfig::ReactionContinuous {
                lockdown_rates: vec![vec![1.0]],
                lockdown_adoption: 1.0,
                disobedience: vec![0.0],
            },
            LockdownConfig::ReactionPhase {
                lockdown_rates: vec![vec![1.0]],
                phase_thresholds: vec![0.0],
                threshold_buffers: vec![0.0],
                disobedience: vec![0.0],
            },
        ];
        for (expected, config) in configs.iter().enumerate() {
            assert_eq!(config.code(), expected as u32);
            let _policy = create_lockdown(config);
        }
    }
}
