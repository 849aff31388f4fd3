//! Cell Transition Engine
//!
//! Computes a cell's next SIRD state from its previous state, the states of
//! its neighbors and the vicinities linking them.
//!
//! # Algorithm
//!
//! ```text
//! virulence_j[i]  = I_j[i] * pop_j * virulence[i] * mask_v(j)[i] * activity(j)[i]
//! total           = Σ_neighbors Σ_i virulence_j[i] * movement[i] * connection[i]
//!                 + Σ_i virulence_self[i]
//! new_inf[i]      = min(S[i], S[i] * total * susceptibility[i] * mask_s(self)[i] / pop * jitter)
//! new_rec[i]      = min(I[i], I[i] * recovery[i] * jitter)
//! new_dead[i]     = min(I[i], I[i] * mortality[i] * jitter * overload)
//! ```
//!
//! The update then rounds R, D and I to the configured precision and derives
//! S as the residual of the segment's age ratio, so `S + I + R + D` stays
//! exactly on the age ratio after every step.
//!
//! # Edge cases
//!
//! - A cell with zero population neither infects nor gets infected.
//! - Neighbors are the keys of the vicinity map; a neighbor without a known
//!   state contributes nothing.

use crate::config::{CellConfig, ConfigError};
use crate::lockdown::{create_lockdown, LockdownPolicy};
use crate::models::{CellState, Vicinity};
use crate::rates::RateSampler;
use crate::rng::RngManager;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Identifier of a neighboring cell
pub type CellId = String;

/// Delay, in time units, before a new state reaches the neighbors
pub const OUTPUT_DELAY: usize = 1;

/// Result of one cell evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The cell's new state
    pub state: CellState,
    /// When the host should propagate `state` to the neighbors
    pub delay: usize,
}

/// Which side of a contact a mask protects
#[derive(Debug, Clone, Copy)]
enum MaskSide {
    Virulence,
    Susceptibility,
}

/// One epidemiological cell: configuration, lockdown policy and rate sampler
///
/// # Example
///
/// ```
/// use sird_cell_core_rs::{CellConfig, CellModel, CellState, RngManager};
/// use std::collections::BTreeMap;
///
/// let initial = CellState::new(100, vec![0.7], vec![0.3], vec![0.0], vec![0.0]);
/// let mut cell = CellModel::new(CellConfig::default(), &initial, RngManager::new(1)).unwrap();
///
/// let next = cell.compute_next(&initial, &BTreeMap::new(), &BTreeMap::new(), 0);
/// assert_eq!(next.delay, 1);
/// assert!(next.state.infected[0] <= 0.7);
/// ```
#[derive(Debug)]
pub struct CellModel {
    config: CellConfig,
    lockdown: Box<dyn LockdownPolicy>,
    sampler: RateSampler,
    age_ratio: Vec<f64>,
}

impl CellModel {
    /// Build a cell from its configuration and initial state
    ///
    /// The age ratio of each segment is fixed here, rounded to the configured
    /// precision.
    ///
    /// # Errors
    ///
    /// - the configuration fails `CellConfig::validate`
    /// - the initial state does not have one entry per configured segment
    pub fn new(config: CellConfig, initial: &CellState, rng: RngManager) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = config.n_segments();
        if !initial.is_well_formed() || initial.n_segments() != n {
            return Err(ConfigError::InvalidState(format!(
                "expected {} age segments in every SIRD vector",
                n
            )));
        }

        let precision = config.precision;
        let age_ratio = (0..n)
            .map(|i| (precision * initial.segment_total(i)).round() / precision)
            .collect();

        Ok(Self {
            lockdown: create_lockdown(&config.lockdown),
            sampler: RateSampler::new(config.rate_distribution.clone(), rng),
            config,
            age_ratio,
        })
    }

    pub fn config(&self) -> &CellConfig {
        &self.config
    }

    pub fn n_segments(&self) -> usize {
        self.config.n_segments()
    }

    /// Fraction of the population in each segment, fixed at creation
    pub fn age_ratio(&self) -> &[f64] {
        &self.age_ratio
    }

    pub fn lockdown(&self) -> &dyn LockdownPolicy {
        self.lockdown.as_ref()
    }

    /// Position of this cell's random stream (for checkpoints)
    pub fn rng_state(&self) -> u64 {
        self.sampler.rng_state()
    }

    /// Continue the random stream from a checkpointed position
    pub fn restore_rng_state(&mut self, state: u64) {
        self.sampler.reseed(RngManager::new(state));
    }

    /// Delay before a new state is visible to the neighbors (always 1)
    pub fn output_delay(&self, _state: &CellState) -> usize {
        OUTPUT_DELAY
    }

    /// Compute the cell's next state
    ///
    /// `current` is never modified; the result is a fresh state.
    pub fn compute_next(
        &mut self,
        current: &CellState,
        neighbor_states: &BTreeMap<CellId, CellState>,
        neighbor_vicinities: &BTreeMap<CellId, Vicinity>,
        clock: usize,
    ) -> Transition {
        let new_infections = self.new_infections(current, neighbor_states, neighbor_vicinities);
        let new_recoveries = self.new_recoveries(current);
        let new_deaths = self.new_deaths(current);

        let precision = self.config.precision;
        let round = |value: f64| (value * precision).round() / precision;

        let mut next = current.clone();
        for i in 0..self.n_segments() {
            next.recovered[i] = round(next.recovered[i] + new_recoveries[i]);
            next.deceased[i] = round(next.deceased[i] + new_deaths[i]);
            next.infected[i] =
                round(next.infected[i] + new_infections[i] - new_recoveries[i] - new_deaths[i]);
            next.susceptible[i] =
                self.age_ratio[i] - (next.recovered[i] + next.infected[i] + next.deceased[i]);
        }

        next.phase = self.lockdown.next_phase(clock, &next);
        if next.phase != current.phase {
            debug!(
                clock,
                from = current.phase,
                to = next.phase,
                infected = next.infected_ratio(),
                "lockdown phase changed"
            );
        }
        trace!(clock, ?new_infections, ?new_recoveries, ?new_deaths, "cell transition");

        let delay = self.output_delay(&next);
        Transition { state: next, delay }
    }

    /// New infections per segment, never more than the susceptible ratio
    pub fn new_infections(
        &mut self,
        current: &CellState,
        neighbor_states: &BTreeMap<CellId, CellState>,
        neighbor_vicinities: &BTreeMap<CellId, Vicinity>,
    ) -> Vec<f64> {
        let n = self.n_segments();
        if current.population == 0 {
            return vec![0.0; n];
        }

        let mut virulence = vec![0.0; n];

        for (neighbor, vicinity) in neighbor_vicinities {
            let Some(neighbor_state) = neighbor_states.get(neighbor) else {
                trace!(%neighbor, "neighbor state unknown, skipped");
                continue;
            };
            let mobility = vicinity.mobility_factors(n);
            for (i, factor) in self.virulence_factors(neighbor_state).into_iter().enumerate() {
                virulence[i] += factor * mobility[i];
            }
        }

        // Local contacts: the cell also infects itself
        for (i, factor) in self.virulence_factors(current).into_iter().enumerate() {
            virulence[i] += factor;
        }
        let total_virulence: f64 = virulence.iter().sum();

        let population = f64::from(current.population);
        let susceptibility = self.susceptibility_factors(current);

        (0..n)
            .map(|i| {
                let susceptible = current.susceptible[i];
                let amount = susceptible * total_virulence * susceptibility[i] / population
                    * self.sampler.sample();
                amount.min(susceptible)
            })
            .collect()
    }

    /// New recoveries per segment, never more than the infected ratio
    pub fn new_recoveries(&mut self, current: &CellState) -> Vec<f64> {
        (0..self.n_segments())
            .map(|i| {
                let infected = current.infected[i];
                (infected * self.config.recovery[i] * self.sampler.sample()).min(infected)
            })
            .collect()
    }

    /// New deaths per segment, raised while healthcare is over capacity
    pub fn new_deaths(&mut self, current: &CellState) -> Vec<f64> {
        let n = self.n_segments();
        let mut deaths: Vec<f64> = (0..n)
            .map(|i| current.infected[i] * self.config.mortality[i] * self.sampler.sample())
            .collect();

        if current.infected_ratio() > self.config.infected_capacity {
            for death in &mut deaths {
                *death *= self.config.over_capacity_modifier;
            }
        }

        for (death, infected) in deaths.iter_mut().zip(&current.infected) {
            *death = death.min(*infected);
        }
        deaths
    }

    /// How strongly the infected people of `state` spread the disease, per segment
    pub fn virulence_factors(&self, state: &CellState) -> Vec<f64> {
        let mask_impact = self.mask_impact(state, MaskSide::Virulence);
        let activity = self.lockdown.activity_factors(state);
        let population = f64::from(state.population);

        (0..self.n_segments())
            .map(|i| {
                let infected = state.infected.get(i).copied().unwrap_or(0.0);
                let activity = activity.get(i).copied().unwrap_or(1.0);
                infected * population * self.config.virulence[i] * mask_impact[i] * activity
            })
            .collect()
    }

    /// How vulnerable the people of `state` are, per segment
    pub fn susceptibility_factors(&self, state: &CellState) -> Vec<f64> {
        self.mask_impact(state, MaskSide::Susceptibility)
            .into_iter()
            .zip(&self.config.susceptibility)
            .map(|(impact, susceptibility)| susceptibility * impact)
            .collect()
    }

    /// Fraction of each segment wearing masks, driven by observed infection
    pub fn mask_rates(&self, state: &CellState) -> Vec<f64> {
        let total_infected = state.infected_ratio();
        self.config
            .mask_use
            .iter()
            .map(|mask_use| (mask_use * self.config.mask_adoption * total_infected).min(1.0))
            .collect()
    }

    fn mask_impact(&self, state: &CellState, side: MaskSide) -> Vec<f64> {
        let reduction = match side {
            MaskSide::Virulence => self.config.mask_virulence_reduction,
            MaskSide::Susceptibility => self.config.mask_susceptibility_reduction,
        };
        self.mask_rates(state)
            .into_iter()
            .map(|rate| (1.0 - rate) + rate * reduction)
            .collect()
    }
}
