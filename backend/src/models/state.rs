//! Cell State
//!
//! The epidemiological state of one cell: its population, its current
//! lockdown phase and, per age segment, the susceptible/infected/recovered/
//! deceased ratios.
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: for every segment, `S + I + R + D` equals the segment's
//!    age ratio fixed when the cell was created (within rounding precision)
//! 2. **Parallel segments**: the four ratio vectors always have the same length
//! 3. **Immutability per step**: a transition reads a state and returns a new
//!    one; a state is never edited while neighbors may still read it

use serde::{Deserialize, Serialize};
use std::fmt;

/// SIRD state of a single cell
///
/// # Example
///
/// ```rust
/// use sird_cell_core_rs::CellState;
///
/// let state = CellState::new(100, vec![0.7], vec![0.3], vec![0.0], vec![0.0]);
/// assert_eq!(state.n_segments(), 1);
/// assert!((state.infected_ratio() - 0.3).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    /// Number of people living in the cell
    pub population: u32,

    /// Current lockdown phase (read by neighbors evaluating this cell)
    #[serde(default)]
    pub phase: usize,

    pub susceptible: Vec<f64>,
    pub infected: Vec<f64>,
    pub recovered: Vec<f64>,
    pub deceased: Vec<f64>,
}

impl CellState {
    /// Create a state in phase 0
    pub fn new(
        population: u32,
        susceptible: Vec<f64>,
        infected: Vec<f64>,
        recovered: Vec<f64>,
        deceased: Vec<f64>,
    ) -> Self {
        Self {
            population,
            phase: 0,
            susceptible,
            infected,
            recovered,
            deceased,
        }
    }

    /// Builder-style phase override
    pub fn with_phase(mut self, phase: usize) -> Self {
        self.phase = phase;
        self
    }

    /// Number of age segments
    pub fn n_segments(&self) -> usize {
        self.susceptible.len()
    }

    /// True when all four ratio vectors have the same length
    pub fn is_well_formed(&self) -> bool {
        let n = self.susceptible.len();
        self.infected.len() == n && self.recovered.len() == n && self.deceased.len() == n
    }

    /// Sum of `S + I + R + D` for one segment
    pub fn segment_total(&self, segment: usize) -> f64 {
        self.susceptible[segment]
            + self.infected[segment]
            + self.recovered[segment]
            + self.deceased[segment]
    }

    pub fn susceptible_ratio(&self) -> f64 {
        self.susceptible.iter().sum()
    }

    /// Total infected ratio across all segments
    ///
    /// Drives both mask adoption and the reactive lockdowns.
    pub fn infected_ratio(&self) -> f64 {
        self.infected.iter().sum()
    }

    pub fn recovered_ratio(&self) -> f64 {
        self.recovered.iter().sum()
    }

    pub fn deceased_ratio(&self) -> f64 {
        self.deceased.iter().sum()
    }
}

/// Snapshot line: `<population,phase,S..,I..,R..,D..,S,I,R,D>`
impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}", self.population, self.phase)?;
        for column in [&self.susceptible, &self.infected, &self.recovered, &self.deceased] {
            for value in column {
                write!(f, ",{}", value)?;
            }
        }
        write!(
            f,
            ",{},{},{},{}>",
            self.susceptible_ratio(),
            self.infected_ratio(),
            self.recovered_ratio(),
            self.deceased_ratio()
        )
    }
}
