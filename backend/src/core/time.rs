//! Time management for the simulation
//!
//! The grid advances in discrete time units. Every cell reports a fixed
//! output delay after each transition, and the clock moves forward by that
//! delay once all cells of a step have been evaluated.

use serde::{Deserialize, Serialize};

/// Manages the simulation clock handed to every cell evaluation
///
/// # Example
/// ```
/// use sird_cell_core_rs::TimeManager;
///
/// let mut time = TimeManager::new();
/// assert_eq!(time.current_time(), 0);
///
/// time.advance_by(1);
/// assert_eq!(time.current_time(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeManager {
    /// Time units elapsed since simulation start
    current_time: usize,
    /// Number of completed steps
    steps: usize,
}

impl TimeManager {
    /// Create a clock starting at time 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Recreate a clock at a given point (used when restoring checkpoints)
    ///
    /// # Example
    /// ```
    /// use sird_cell_core_rs::TimeManager;
    ///
    /// let time = TimeManager::resume(12, 12);
    /// assert_eq!(time.current_time(), 12);
    /// assert_eq!(time.steps(), 12);
    /// ```
    pub fn resume(current_time: usize, steps: usize) -> Self {
        Self {
            current_time,
            steps,
        }
    }

    /// Complete a step, moving the clock forward by `delay` time units
    pub fn advance_by(&mut self, delay: usize) {
        self.current_time += delay;
        self.steps += 1;
    }

    /// Current simulation clock value
    pub fn current_time(&self) -> usize {
        self.current_time
    }

    /// Number of steps completed so far
    pub fn steps(&self) -> usize {
        self.steps
    }
}
