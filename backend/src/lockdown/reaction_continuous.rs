//! Continuous reaction lockdown
//!
//! No discrete phases: the restriction tightens smoothly as the cell's
//! infected ratio grows.
//!
//! ```text
//! strength = 1 - lockdown_adoption * infected_ratio
//! factor_i = max(d_i + (1 - d_i) * strength * lockdown_rates[phase][i], 0)
//! ```

use super::{blend_with_disobedience, phase_rates, LockdownPolicy};
use crate::models::CellState;

#[derive(Debug, Clone)]
pub struct ReactionContinuousLockdown {
    lockdown_rates: Vec<Vec<f64>>,
    lockdown_adoption: f64,
    disobedience: Vec<f64>,
}

impl ReactionContinuousLockdown {
    pub fn new(lockdown_rates: Vec<Vec<f64>>, lockdown_adoption: f64, disobedience: Vec<f64>) -> Self {
        Self {
            lockdown_rates,
            lockdown_adoption,
            disobedience,
        }
    }

    /// Restriction strength for a state (1.0 = no restriction)
    pub fn lockdown_strength(&self, state: &CellState) -> f64 {
        1.0 - self.lockdown_adoption * state.infected_ratio()
    }
}

impl LockdownPolicy for ReactionContinuousLockdown {
    fn activity_factors(&self, state: &CellState) -> Vec<f64> {
        blend_with_disobedience(
            &self.disobedience,
            phase_rates(&self.lockdown_rates, state.phase),
            self.lockdown_strength(state),
            state.n_segments(),
        )
        .into_iter()
        .map(|factor| factor.max(0.0))
        .collect()
    }

    fn next_phase(&self, _clock: usize, _state: &CellState) -> usize {
        0
    }
}
