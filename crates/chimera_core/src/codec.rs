//! Interop codecs for organism state.
//!
//! Two formats: the flat state vector (positional, `FIELD_COUNT` reals in
//! [`StateField::ALL`] order) for numeric engines, and the named JSON
//! snapshot for save/restore. Both are deterministic and both leave the
//! state untouched when decoding fails.

use crate::error::{CoreError, Result};
use chimera_data::{OrganismSnapshot, OrganismState, StateField, FIELD_COUNT};

pub trait StateCodec {
    /// Field values in flat-vector order.
    fn state_vector(&self) -> Vec<f64>;

    /// Replaces every field from a flat vector, clamping per field.
    fn set_state_vector(&mut self, values: &[f64]) -> Result<()>;

    /// Structured, named copy of every field.
    fn snapshot(&self) -> OrganismSnapshot;

    /// Replaces the whole state with the snapshot's values.
    fn load_snapshot(&mut self, snapshot: &OrganismSnapshot);

    /// Snapshot rendered as compact JSON.
    fn snapshot_json(&self) -> Result<String>;

    /// Parses a JSON snapshot and loads it.
    fn load_snapshot_json(&mut self, json: &str) -> Result<()>;
}

impl StateCodec for OrganismState {
    fn state_vector(&self) -> Vec<f64> {
        StateField::ALL.iter().map(|&field| self.get(field)).collect()
    }

    fn set_state_vector(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != FIELD_COUNT {
            return Err(CoreError::shape(FIELD_COUNT, values.len()));
        }
        let mut next = OrganismState::new();
        for (&field, &value) in StateField::ALL.iter().zip(values) {
            next.set(field, value);
        }
        *self = next;
        Ok(())
    }

    fn snapshot(&self) -> OrganismSnapshot {
        OrganismSnapshot::from(self)
    }

    fn load_snapshot(&mut self, snapshot: &OrganismSnapshot) {
        *self = snapshot.to_state();
    }

    fn snapshot_json(&self) -> Result<String> {
        serde_json::to_string(&self.snapshot())
            .map_err(|e| CoreError::encode(format!("snapshot serialization failed: {e}")))
    }

    fn load_snapshot_json(&mut self, json: &str) -> Result<()> {
        if json.trim().is_empty() {
            return Err(CoreError::decode("empty snapshot"));
        }
        let snapshot: OrganismSnapshot = serde_json::from_str(json)
            .map_err(|e| CoreError::decode(format!("invalid snapshot: {e}")))?;
        self.load_snapshot(&snapshot);
        Ok(())
    }
}

/// Builds a fresh state from a flat vector.
pub fn state_from_vector(values: &[f64]) -> Result<OrganismState> {
    let mut state = OrganismState::new();
    state.set_state_vector(values)?;
    Ok(state)
}

/// Builds a fresh state from JSON snapshot text.
pub fn state_from_snapshot_json(json: &str) -> Result<OrganismState> {
    let mut state = OrganismState::new();
    state.load_snapshot_json(json)?;
    Ok(state)
}
