//! Scheduled phase lockdown
//!
//! Phases follow a calendar that repeats with period `P = Σ phase_durations`.
//! At clock `t`, the phase is the one whose slot contains `t mod P`.
//!
//! # Example
//!
//! With `phase_durations = [2, 3]` (period 5):
//!
//! ```text
//! clock: 0 1 2 3 4 5 6 7 ...
//! phase: 0 0 1 1 1 0 0 1 ...
//! ```

use super::{blend_with_disobedience, phase_rates, LockdownPolicy};
use crate::models::CellState;

#[derive(Debug, Clone)]
pub struct ScheduledPhaseLockdown {
    lockdown_rates: Vec<Vec<f64>>,
    phase_durations: Vec<usize>,
    disobedience: Vec<f64>,
    period: usize,
}

impl ScheduledPhaseLockdown {
    pub fn new(
        lockdown_rates: Vec<Vec<f64>>,
        phase_durations: Vec<usize>,
        disobedience: Vec<f64>,
    ) -> Self {
        let period = phase_durations.iter().sum();
        Self {
            lockdown_rates,
            phase_durations,
            disobedience,
            period,
        }
    }

    /// Length of one full cycle of phases
    pub fn period(&self) -> usize {
        self.period
    }
}

impl LockdownPolicy for ScheduledPhaseLockdown {
    fn activity_factors(&self, state: &CellState) -> Vec<f64> {
        blend_with_disobedience(
            &self.disobedience,
            phase_rates(&self.lockdown_rates, state.phase),
            1.0,
            state.n_segments(),
        )
    }

    fn next_phase(&self, clock: usize, _state: &CellState) -> usize {
        if self.period == 0 {
            return 0;
        }
        let mut remainder = clock % self.period;
        let mut phase = 0;
        while remainder >= self.phase_durations[phase] {
            remainder -= self.phase_durations[phase];
            phase += 1;
        }
        phase
    }
}
