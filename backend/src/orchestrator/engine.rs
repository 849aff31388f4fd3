//! Orchestrator Engine
//!
//! Step loop of the reference grid host:
//!
//! ```text
//! For each step at clock t:
//! 1. Snapshot every cell's current state
//! 2. For every cell, gather the snapshot states of its neighbors
//! 3. Compute the cell's next state (transition engine) with clock t
//! 4. Commit all new states at once
//! 5. Advance the clock by the cells' output delay
//! ```
//!
//! Because every cell reads the same snapshot and owns its random stream,
//! the result of a step does not depend on the order cells are evaluated in.
//!
//! # Example
//!
//! ```rust
//! use sird_cell_core_rs::orchestrator::{Orchestrator, ScenarioConfig, Neighborhood};
//! use sird_cell_core_rs::{CellConfig, CellState, Vicinity};
//!
//! let scenario = ScenarioConfig {
//!     shape: [5, 5],
//!     wrapped: false,
//!     neighborhood: Neighborhood::VonNeumann,
//!     default_vicinity: Vicinity::uniform(1, 1.0, 0.5),
//!     default_state: CellState::new(100, vec![1.0], vec![0.0], vec![0.0], vec![0.0]),
//!     default_config: CellConfig::default(),
//!     cells: vec![],
//!     rng_seed: 12345,
//! };
//!
//! let mut orchestrator = Orchestrator::new(scenario).unwrap();
//! let result = orchestrator.tick().unwrap();
//! assert_eq!(result.time, 0);
//! assert_eq!(orchestrator.current_time(), 1);
//! ```

use crate::cell::{CellId, CellModel, OUTPUT_DELAY};
use crate::config::ConfigError;
use crate::core::time::TimeManager;
use crate::models::{CellState, Vicinity};
use crate::orchestrator::checkpoint::{
    compute_config_hash, validate_snapshot, CellSnapshot, ConservationTarget, StateSnapshot,
};
use crate::orchestrator::scenario::ScenarioConfig;
use crate::rng::RngManager;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

/// Identifier of the cell at `(row, col)`
pub fn cell_id(row: usize, col: usize) -> CellId {
    format!("({},{})", row, col)
}

/// Simulation error types
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid cell config at {cell}: {source}")]
    CellConfig {
        cell: CellId,
        #[source]
        source: ConfigError,
    },

    #[error("Cell not found: {0}")]
    CellNotFound(CellId),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("State validation error: {0}")]
    StateValidationError(String),
}

/// Population-weighted totals over the whole grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateState {
    pub population: u64,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub deceased: f64,
}

impl AggregateState {
    /// Weight every cell's ratios by its population
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a CellState>) -> Self {
        let mut weighted = [0.0f64; 4];
        let mut population = 0u64;
        for state in states {
            let weight = f64::from(state.population);
            population += u64::from(state.population);
            weighted[0] += state.susceptible_ratio() * weight;
            weighted[1] += state.infected_ratio() * weight;
            weighted[2] += state.recovered_ratio() * weight;
            weighted[3] += state.deceased_ratio() * weight;
        }
        if population == 0 {
            return Self::default();
        }
        let total = population as f64;
        Self {
            population,
            susceptible: weighted[0] / total,
            infected: weighted[1] / total,
            recovered: weighted[2] / total,
            deceased: weighted[3] / total,
        }
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    /// Clock value the step was evaluated at
    pub time: usize,
    /// Cells whose state differs from the previous step
    pub changed_cells: usize,
    /// Cells whose lockdown phase changed
    pub phase_changes: usize,
    /// Grid totals after the step
    pub totals: AggregateState,
}

/// One grid position: its model and the vicinities of its neighbors
#[derive(Debug)]
struct GridCell {
    id: CellId,
    model: CellModel,
    neighbors: BTreeMap<CellId, Vicinity>,
}

/// Reference host running a grid of cells
pub struct Orchestrator {
    /// Row-major
    cells: Vec<GridCell>,
    states: BTreeMap<CellId, CellState>,
    time_manager: TimeManager,
    rng_seed: u64,
    config_hash: String,
}

impl Orchestrator {
    /// Create new orchestrator from a scenario
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for structural problems (empty grid, overrides
    ///   outside the grid, vicinity or segment counts that do not match)
    /// - `CellConfig` when a cell's configuration or initial state is invalid
    pub fn new(scenario: ScenarioConfig) -> Result<Self, SimulationError> {
        scenario.validate()?;
        let config_hash = compute_config_hash(&scenario)?;

        let [rows, cols] = scenario.shape;
        let n_segments = scenario.default_config.n_segments();
        let mut cells = Vec::with_capacity(scenario.num_cells());
        let mut states = BTreeMap::new();

        for row in 0..rows {
            for col in 0..cols {
                let id = cell_id(row, col);
                let cell_override = scenario.override_at(row, col);
                let state = cell_override
                    .and_then(|o| o.state.clone())
                    .unwrap_or_else(|| scenario.default_state.clone());
                let config = cell_override
                    .and_then(|o| o.config.clone())
                    .unwrap_or_else(|| scenario.default_config.clone());

                if config.n_segments() != n_segments {
                    return Err(SimulationError::InvalidConfig(format!(
                        "Cell {} has {} age segments, the grid uses {}",
                        id,
                        config.n_segments(),
                        n_segments
                    )));
                }

                let rng = RngManager::for_cell(scenario.rng_seed, &id);
                let model = CellModel::new(config, &state, rng).map_err(|source| {
                    SimulationError::CellConfig {
                        cell: id.clone(),
                        source,
                    }
                })?;

                let neighbors = Self::neighbors_of(&scenario, row, col);
                states.insert(id.clone(), state);
                cells.push(GridCell {
                    id,
                    model,
                    neighbors,
                });
            }
        }

        info!(
            rows,
            cols,
            cells = cells.len(),
            seed = scenario.rng_seed,
            "grid initialized"
        );

        Ok(Self {
            cells,
            states,
            time_manager: TimeManager::new(),
            rng_seed: scenario.rng_seed,
            config_hash,
        })
    }

    fn neighbors_of(scenario: &ScenarioConfig, row: usize, col: usize) -> BTreeMap<CellId, Vicinity> {
        let [rows, cols] = scenario.shape;
        let mut neighbors = BTreeMap::new();

        for (d_row, d_col) in scenario.neighborhood.offsets() {
            let target_row = row as isize + d_row;
            let target_col = col as isize + d_col;
            let (target_row, target_col) = if scenario.wrapped {
                (
                    target_row.rem_euclid(rows as isize) as usize,
                    target_col.rem_euclid(cols as isize) as usize,
                )
            } else {
                if target_row < 0
                    || target_col < 0
                    || target_row >= rows as isize
                    || target_col >= cols as isize
                {
                    continue;
                }
                (target_row as usize, target_col as usize)
            };

            // Small wrapped grids can fold a neighbor back onto the cell itself
            if (target_row, target_col) == (row, col) {
                continue;
            }
            neighbors.insert(cell_id(target_row, target_col), scenario.default_vicinity.clone());
        }
        neighbors
    }

    /// Restore a run from a checkpoint
    ///
    /// The scenario must be the one the checkpoint was taken from.
    pub fn load_state(scenario: ScenarioConfig, snapshot: StateSnapshot) -> Result<Self, SimulationError> {
        let mut orchestrator = Self::new(scenario)?;

        if snapshot.config_hash != orchestrator.config_hash {
            return Err(SimulationError::StateValidationError(
                "Checkpoint was taken from a different scenario".to_string(),
            ));
        }
        if snapshot.rng_seed != orchestrator.rng_seed {
            return Err(SimulationError::StateValidationError(format!(
                "Checkpoint seed {} does not match scenario seed {}",
                snapshot.rng_seed, orchestrator.rng_seed
            )));
        }

        let targets: BTreeMap<CellId, ConservationTarget> = orchestrator
            .cells
            .iter()
            .map(|cell| {
                let target = ConservationTarget::new(
                    cell.model.age_ratio().to_vec(),
                    cell.model.config().precision,
                );
                (cell.id.clone(), target)
            })
            .collect();
        validate_snapshot(&snapshot, &targets)?;

        let mut restored: BTreeMap<CellId, CellSnapshot> = snapshot
            .cells
            .into_iter()
            .map(|cell| (cell.id.clone(), cell))
            .collect();

        for cell in &mut orchestrator.cells {
            let saved = restored
                .remove(&cell.id)
                .ok_or_else(|| SimulationError::CellNotFound(cell.id.clone()))?;
            cell.model.restore_rng_state(saved.rng_state);
            orchestrator.states.insert(cell.id.clone(), saved.state);
        }

        orchestrator.time_manager = TimeManager::resume(snapshot.current_time, snapshot.steps);
        info!(time = snapshot.current_time, "checkpoint restored");
        Ok(orchestrator)
    }

    /// Capture everything needed to resume the run
    pub fn save_state(&self) -> StateSnapshot {
        StateSnapshot {
            current_time: self.time_manager.current_time(),
            steps: self.time_manager.steps(),
            rng_seed: self.rng_seed,
            cells: self
                .cells
                .iter()
                .map(|cell| CellSnapshot {
                    id: cell.id.clone(),
                    state: self.states[&cell.id].clone(),
                    rng_state: cell.model.rng_state(),
                })
                .collect(),
            config_hash: self.config_hash.clone(),
        }
    }

    /// Execute one step
    pub fn tick(&mut self) -> Result<TickResult, SimulationError> {
        let clock = self.time_manager.current_time();
        let mut next_states = BTreeMap::new();
        let mut changed_cells = 0;
        let mut phase_changes = 0;
        let mut delay = OUTPUT_DELAY;

        for cell in &mut self.cells {
            let current = self
                .states
                .get(&cell.id)
                .ok_or_else(|| SimulationError::CellNotFound(cell.id.clone()))?;

            let neighbor_states: BTreeMap<CellId, CellState> = cell
                .neighbors
                .keys()
                .filter_map(|id| self.states.get(id).map(|state| (id.clone(), state.clone())))
                .collect();

            let transition = cell
                .model
                .compute_next(current, &neighbor_states, &cell.neighbors, clock);

            if transition.state != *current {
                changed_cells += 1;
            }
            if transition.state.phase != current.phase {
                phase_changes += 1;
            }
            delay = delay.max(transition.delay);
            next_states.insert(cell.id.clone(), transition.state);
        }

        self.states = next_states;
        self.time_manager.advance_by(delay);

        let totals = AggregateState::from_states(self.states.values());
        debug!(
            time = clock,
            changed_cells,
            phase_changes,
            infected = totals.infected,
            "step complete"
        );

        Ok(TickResult {
            time: clock,
            changed_cells,
            phase_changes,
            totals,
        })
    }

    /// Execute `steps` steps
    pub fn run(&mut self, steps: usize) -> Result<Vec<TickResult>, SimulationError> {
        (0..steps).map(|_| self.tick()).collect()
    }

    /// Current clock value
    pub fn current_time(&self) -> usize {
        self.time_manager.current_time()
    }

    /// Cell ids in row-major order
    pub fn cell_ids(&self) -> impl Iterator<Item = &CellId> {
        self.cells.iter().map(|cell| &cell.id)
    }

    /// Current state of a cell
    pub fn state_of(&self, id: &str) -> Result<&CellState, SimulationError> {
        self.states
            .get(id)
            .ok_or_else(|| SimulationError::CellNotFound(id.to_string()))
    }

    /// Vicinities of a cell's neighbors
    pub fn neighbors_of_cell(&self, id: &str) -> Result<&BTreeMap<CellId, Vicinity>, SimulationError> {
        self.cells
            .iter()
            .find(|cell| cell.id == id)
            .map(|cell| &cell.neighbors)
            .ok_or_else(|| SimulationError::CellNotFound(id.to_string()))
    }

    /// Grid totals for the current states
    pub fn totals(&self) -> AggregateState {
        AggregateState::from_states(self.states.values())
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("current_time", &self.time_manager.current_time())
            .field("num_cells", &self.cells.len())
            .field("rng_seed", &self.rng_seed)
            .finish()
    }
}
