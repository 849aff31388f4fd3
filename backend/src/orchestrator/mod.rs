//! Orchestrator - reference grid host
//!
//! Lays cells out on a rectangular grid, feeds each cell the previous
//! step's states of its neighbors and advances the clock.
//!
//! See `engine.rs` for the step loop and `checkpoint.rs` for save/restore.

pub mod checkpoint;
pub mod engine;
pub mod scenario;

// Re-export main types for convenience
pub use engine::{cell_id, AggregateState, Orchestrator, SimulationError, TickResult};
pub use scenario::{CellOverride, Neighborhood, ScenarioConfig};

// Re-export checkpoint types
pub use checkpoint::{CellSnapshot, ConservationTarget, StateSnapshot};
