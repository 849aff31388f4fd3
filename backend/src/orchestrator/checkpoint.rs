//! Checkpoint - Save/Load Simulation State
//!
//! Enables serialization and deserialization of a grid run for
//! pause/resume.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored run continues exactly like an uninterrupted one,
//!   because every cell's random stream position is saved
//! - **Conservation**: every saved segment still sums to its age ratio
//! - **Completeness**: every cell of the grid appears exactly once
//! - **Config Matching**: state can only be loaded with the scenario it came from

use crate::cell::CellId;
use crate::models::CellState;
use crate::orchestrator::SimulationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Float slack on top of the rounding margin when checking conservation
const CONSERVATION_TOLERANCE: f64 = 1e-6;

/// What every segment of a cell must add up to in a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ConservationTarget {
    /// Age ratio per segment, as fixed when the cell was built
    pub age_ratio: Vec<f64>,
    /// Largest accepted deviation from `age_ratio`
    pub tolerance: f64,
}

impl ConservationTarget {
    /// Target for a cell rounding to `1 / precision`.
    ///
    /// The age ratio is rounded when the cell is built but the initial state
    /// is not, so a snapshot taken before the first step may sit up to half a
    /// grid step away from it.
    pub fn new(age_ratio: Vec<f64>, precision: f64) -> Self {
        Self {
            age_ratio,
            tolerance: 0.5 / precision + CONSERVATION_TOLERANCE,
        }
    }
}

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete grid state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Clock value at the time of the snapshot
    pub current_time: usize,

    /// Steps completed
    pub steps: usize,

    /// Global seed of the run
    pub rng_seed: u64,

    /// All cell states, row-major
    pub cells: Vec<CellSnapshot>,

    /// SHA256 hash of the scenario (for validation)
    pub config_hash: String,
}

/// Cell state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub id: CellId,
    pub state: CellState,
    /// Position of the cell's random stream
    pub rng_state: u64,
}

impl StateSnapshot {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string(self).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot serialization failed: {}", e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot parsing failed: {}", e))
        })
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on field or map ordering.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    // Recursively sort all object keys for canonical representation
    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validate state snapshot integrity
///
/// `targets` maps every cell of the grid to its conservation target.
/// Checks:
/// - each grid cell appears exactly once, and no unknown cell appears
/// - every state has one entry per segment in each SIRD vector
/// - per-segment conservation `S + I + R + D == age_ratio` within the
///   target's tolerance
pub fn validate_snapshot(
    snapshot: &StateSnapshot,
    targets: &BTreeMap<CellId, ConservationTarget>,
) -> Result<(), SimulationError> {
    let mut seen = BTreeSet::new();

    for cell in &snapshot.cells {
        if !seen.insert(cell.id.as_str()) {
            return Err(SimulationError::StateValidationError(format!(
                "Duplicate cell in snapshot: {}",
                cell.id
            )));
        }

        let target = targets.get(&cell.id).ok_or_else(|| {
            SimulationError::StateValidationError(format!("Unknown cell in snapshot: {}", cell.id))
        })?;

        if !cell.state.is_well_formed() || cell.state.n_segments() != target.age_ratio.len() {
            return Err(SimulationError::StateValidationError(format!(
                "Cell {} has malformed SIRD vectors",
                cell.id
            )));
        }

        for (segment, ratio) in target.age_ratio.iter().enumerate() {
            let total = cell.state.segment_total(segment);
            if (total - ratio).abs() > target.tolerance {
                return Err(SimulationError::StateValidationError(format!(
                    "Conservation violated in cell {} segment {}: expected {}, got {}",
                    cell.id, segment, ratio, total
                )));
            }
        }
    }

    if let Some(missing) = targets.keys().find(|id| !seen.contains(id.as_str())) {
        return Err(SimulationError::StateValidationError(format!(
            "Cell missing from snapshot: {}",
            missing
        )));
    }

    Ok(())
}
