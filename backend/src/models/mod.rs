//! Domain models for the cell simulator

pub mod state;
pub mod vicinity;

// Re-exports
pub use state::CellState;
pub use vicinity::Vicinity;
