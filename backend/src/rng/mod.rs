//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm for fast, deterministic random number generation.
//! Every cell owns its own stream, derived from the run seed and the cell id,
//! so the order in which cells are evaluated never changes a draw.
//! CRITICAL: All randomness in the simulator MUST go through this module.

mod xorshift;

pub use xorshift::RngManager;
