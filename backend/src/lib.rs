//! SIRD Cell Simulator Core - Rust Engine
//!
//! Cell transition engine for an age-segmented SIRD epidemic model on a
//! grid of interacting cells, with reactive mask adoption, lockdown policies
//! and stochastic rate jitter.
//!
//! # Architecture
//!
//! - **models**: Domain types (CellState, Vicinity)
//! - **config**: Cell configuration loading and validation
//! - **rates**: Stochastic rate sampler
//! - **lockdown**: Lockdown policies (activity factors, phase transitions)
//! - **cell**: Cell transition engine
//! - **orchestrator**: Reference grid host (step loop, checkpoints)
//! - **core**: Time management
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Per segment, `S + I + R + D` stays equal to the segment's age ratio
//! 2. All randomness is deterministic (seeded, one stream per cell)
//! 3. A transition never mutates the state it reads

// Module declarations
pub mod cell;
pub mod config;
pub mod core;
pub mod lockdown;
pub mod models;
pub mod orchestrator;
pub mod rates;
pub mod rng;

// Re-exports for convenience
pub use cell::{CellId, CellModel, Transition, OUTPUT_DELAY};
pub use config::{CellConfig, ConfigError};
pub use core::time::TimeManager;
pub use lockdown::{create_lockdown, LockdownConfig, LockdownPolicy};
pub use models::{CellState, Vicinity};
pub use orchestrator::{Orchestrator, ScenarioConfig, SimulationError, TickResult};
pub use rates::{RateDistribution, RateSampler};
pub use rng::RngManager;
