//! Reaction phase lockdown
//!
//! Phases escalate when the infected ratio reaches the next phase's
//! threshold and relax when it falls below the current phase's threshold by
//! more than that phase's buffer. The buffer gives hysteresis: a ratio
//! hovering around a threshold does not flip phases every step.
//!
//! At most one transition happens per evaluation, and relaxing is only
//! considered when escalating did not fire.

use super::{blend_with_disobedience, phase_rates, LockdownPolicy};
use crate::models::CellState;

#[derive(Debug, Clone)]
pub struct ReactionPhaseLockdown {
    lockdown_rates: Vec<Vec<f64>>,
    phase_thresholds: Vec<f64>,
    threshold_buffers: Vec<f64>,
    disobedience: Vec<f64>,
}

impl ReactionPhaseLockdown {
    pub fn new(
        lockdown_rates: Vec<Vec<f64>>,
        phase_thresholds: Vec<f64>,
        threshold_buffers: Vec<f64>,
        disobedience: Vec<f64>,
    ) -> Self {
        Self {
            lockdown_rates,
            phase_thresholds,
            threshold_buffers,
            disobedience,
        }
    }

    fn should_escalate(&self, state: &CellState) -> bool {
        state
            .phase
            .checked_add(1)
            .and_then(|next| self.phase_thresholds.get(next))
            .is_some_and(|threshold| state.infected_ratio() >= *threshold)
    }

    fn should_relax(&self, state: &CellState) -> bool {
        if state.phase == 0 {
            return false;
        }
        let Some(threshold) = self.phase_thresholds.get(state.phase) else {
            // Phase beyond this policy's table: step back toward it
            return true;
        };
        let buffer = self.threshold_buffers.get(state.phase).copied().unwrap_or(0.0);
        state.infected_ratio() + buffer < *threshold
    }
}

impl LockdownPolicy for ReactionPhaseLockdown {
    fn activity_factors(&self, state: &CellState) -> Vec<f64> {
        blend_with_disobedience(
            &self.disobedience,
            phase_rates(&self.lockdown_rates, state.phase),
            1.0,
            state.n_segments(),
        )
    }

    fn next_phase(&self, _clock: usize, state: &CellState) -> usize {
        if self.should_escalate(state) {
            state.phase + 1
        } else if self.should_relax(state) {
            state.phase - 1
        } else {
            state.phase
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReactionPhaseLockdown {
        ReactionPhaseLockdown::new(
            vec![vec![1.0], vec![0.6], vec![0.2]],
            vec![0.0, 0.1, 0.3],
            vec![0.0, 0.02, 0.02],
            vec![0.0],
        )
    }

    fn state(phase: usize, infected: f64) -> CellState {
        CellState::new(100, vec![1.0 - infected], vec![infected], vec![0.0], vec![0.0])
            .with_phase(phase)
    }

    #[test]
    fn test_buffer_keeps_phase_near_threshold() {
        // 0.09 + 0.02 >= 0.1: inside the buffer, stay in phase 1
        assert_eq!(policy().next_phase(0, &state(1, 0.09)), 1);
    }

    #[test]
    fn test_top_phase_cannot_escalate() {
        assert_eq!(policy().next_phase(0, &state(2, 0.9)), 2);
    }

    #[test]
    fn test_phase_zero_cannot_relax() {
        assert_eq!(policy().next_phase(0, &state(0, 0.0)), 0);
    }

    #[test]
    fn test_one_step_per_evaluation() {
        // Ratio above both thresholds: only one phase up
        assert_eq!(policy().next_phase(0, &state(0, 0.5)), 1);
    }

    #[test]
    fn test_factors_use_phase_row() {
        assert_eq!(policy().activity_factors(&state(2, 0.4)), vec![0.2]);
    }

    #[test]
    fn test_unbounded_phase_steps_back_without_overflow() {
        let at_limit = state(0, 0.9).with_phase(usize::MAX);
        assert_eq!(policy().next_phase(0, &at_limit), usize::MAX - 1);
    }
}
