//! No lockdown: the population keeps its normal activity.

use super::LockdownPolicy;
use crate::models::CellState;

/// Policy that never restricts activity and never leaves phase 0
#[derive(Debug, Clone, Default)]
pub struct NoLockdown;

impl NoLockdown {
    pub fn new() -> Self {
        Self
    }
}

impl LockdownPolicy for NoLockdown {
    fn activity_factors(&self, state: &CellState) -> Vec<f64> {
        vec![1.0; state.n_segments()]
    }

    fn next_phase(&self, _clock: usize, _state: &CellState) -> usize {
        0
    }
}
