//! Scenario configuration for the reference grid host.
//!
//! A scenario describes a rectangular grid: its shape, whether edges wrap,
//! the neighborhood shape, the vicinity shared by every neighbor pair, and
//! default state/configuration with optional per-cell overrides.
//!
//! # Example
//!
//! ```
//! use sird_cell_core_rs::orchestrator::ScenarioConfig;
//!
//! let json = r#"{
//!     "shape": [3, 3],
//!     "default_vicinity": {"connection": [1.0], "movement": [0.5]},
//!     "default_state": {
//!         "population": 100,
//!         "susceptible": [1.0], "infected": [0.0],
//!         "recovered": [0.0], "deceased": [0.0]
//!     },
//!     "cells": [{
//!         "position": [1, 1],
//!         "state": {
//!             "population": 100,
//!             "susceptible": [0.7], "infected": [0.3],
//!             "recovered": [0.0], "deceased": [0.0]
//!         }
//!     }],
//!     "rng_seed": 7
//! }"#;
//!
//! let scenario = ScenarioConfig::from_json(json).unwrap();
//! assert_eq!(scenario.num_cells(), 9);
//! ```

use crate::config::CellConfig;
use crate::models::{CellState, Vicinity};
use crate::orchestrator::SimulationError;
use serde::{Deserialize, Serialize};

/// Neighborhood shape (radius 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// Orthogonal neighbors only (4 cells)
    #[default]
    VonNeumann,
    /// Orthogonal and diagonal neighbors (8 cells)
    Moore,
}

impl Neighborhood {
    /// Relative offsets of the neighbors
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Neighborhood::VonNeumann => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
            Neighborhood::Moore => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        }
    }
}

/// Per-cell deviation from the scenario defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellOverride {
    /// `[row, col]`
    pub position: [usize; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<CellState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CellConfig>,
}

/// Complete description of a grid run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// `[rows, cols]`
    pub shape: [usize; 2],

    /// Edges wrap around (torus)
    #[serde(default)]
    pub wrapped: bool,

    #[serde(default)]
    pub neighborhood: Neighborhood,

    /// Vicinity between every pair of neighboring cells
    pub default_vicinity: Vicinity,

    pub default_state: CellState,

    #[serde(default)]
    pub default_config: CellConfig,

    #[serde(default)]
    pub cells: Vec<CellOverride>,

    /// Global seed; each cell derives its own stream from it
    #[serde(default)]
    pub rng_seed: u64,
}

impl ScenarioConfig {
    /// Parse a scenario from JSON (cell configurations are validated while parsing)
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("Scenario parsing failed: {}", e)))
    }

    /// Number of grid positions (saturates for shapes `validate` rejects)
    pub fn num_cells(&self) -> usize {
        self.shape[0].saturating_mul(self.shape[1])
    }

    /// Override for a position, if any (the last one wins)
    pub fn override_at(&self, row: usize, col: usize) -> Option<&CellOverride> {
        self.cells.iter().rev().find(|o| o.position == [row, col])
    }

    /// Structural checks that do not depend on building cells
    pub fn validate(&self) -> Result<(), SimulationError> {
        let [rows, cols] = self.shape;
        if rows == 0 || cols == 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "Grid shape must be non-empty, got {}x{}",
                rows, cols
            )));
        }
        if rows.checked_mul(cols).is_none() {
            return Err(SimulationError::InvalidConfig(format!(
                "Grid shape {}x{} is too large",
                rows, cols
            )));
        }

        for cell in &self.cells {
            let [row, col] = cell.position;
            if row >= rows || col >= cols {
                return Err(SimulationError::InvalidConfig(format!(
                    "Cell override at [{}, {}] is outside the {}x{} grid",
                    row, col, rows, cols
                )));
            }
        }

        let n = self.default_config.n_segments();
        if !self.default_vicinity.is_valid_for(n) {
            return Err(SimulationError::InvalidConfig(format!(
                "default_vicinity must have {} non-negative entries in connection and movement",
                n
            )));
        }
        Ok(())
    }
}
