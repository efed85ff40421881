use super::organism::OrganismState;
use serde::{Deserialize, Serialize};

/// Version written into every snapshot produced by this crate.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

/// Named, self-describing serialization of an [`OrganismState`].
///
/// Unknown keys are ignored when deserializing so newer writers can add
/// fields without breaking older readers. All state keys are required.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganismSnapshot {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub population: f64,
    pub energy: f64,
    pub generation: u64,
    pub age: u64,
    pub mutation_rate: f64,
    pub selection_pressure: f64,
    pub adaptation_score: f64,
}

impl From<&OrganismState> for OrganismSnapshot {
    fn from(state: &OrganismState) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            population: state.population(),
            energy: state.energy(),
            generation: state.generation(),
            age: state.age(),
            mutation_rate: state.mutation_rate(),
            selection_pressure: state.selection_pressure(),
            adaptation_score: state.adaptation_score(),
        }
    }
}

impl OrganismSnapshot {
    /// Builds the state described by this snapshot, clamping each field.
    #[must_use]
    pub fn to_state(&self) -> OrganismState {
        let mut state = OrganismState::new();
        state.set_population(self.population);
        state.set_energy(self.energy);
        state.set_generation(self.generation);
        state.set_age(self.age);
        state.set_mutation_rate(self.mutation_rate);
        state.set_selection_pressure(self.selection_pressure);
        state.set_adaptation_score(self.adaptation_score);
        state
    }
}
