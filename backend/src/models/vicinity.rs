//! Vicinity: the static relationship between two neighboring cells.
//!
//! Owned by the topology; the transition engine only reads it.

use serde::{Deserialize, Serialize};

/// Per-segment contact weights between a cell and one neighbor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vicinity {
    /// Static proximity/contact weight, typically in [0, 1]
    pub connection: Vec<f64>,
    /// Mobility weight, typically in [0, 1]
    pub movement: Vec<f64>,
}

impl Vicinity {
    pub fn new(connection: Vec<f64>, movement: Vec<f64>) -> Self {
        Self {
            connection,
            movement,
        }
    }

    /// Same connection and movement for every segment
    pub fn uniform(n_segments: usize, connection: f64, movement: f64) -> Self {
        Self::new(vec![connection; n_segments], vec![movement; n_segments])
    }

    /// `movement[i] * connection[i]` per segment.
    ///
    /// Segments missing from either vector count as zero mobility.
    pub fn mobility_factors(&self, n_segments: usize) -> Vec<f64> {
        (0..n_segments)
            .map(|i| {
                let movement = self.movement.get(i).copied().unwrap_or(0.0);
                let connection = self.connection.get(i).copied().unwrap_or(0.0);
                movement * connection
            })
            .collect()
    }

    /// No negative weights and one entry per segment
    pub fn is_valid_for(&self, n_segments: usize) -> bool {
        self.connection.len() == n_segments
            && self.movement.len() == n_segments
            && self.connection.iter().chain(&self.movement).all(|v| *v >= 0.0)
    }
}
