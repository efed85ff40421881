use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fields in the flat state vector.
pub const FIELD_COUNT: usize = 7;

/// One field of [`OrganismState`], in flat-vector order.
///
/// The discriminant is the field's position in the state vector. Reordering
/// the variants is a breaking change to every persisted vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateField {
    /// Organism size metric, never negative.
    Population = 0,
    /// Available resource budget, never negative.
    Energy = 1,
    /// Discrete evolution counter.
    Generation = 2,
    /// Number of steps taken.
    Age = 3,
    /// Probability-like tuning knob in `[0, 1]`.
    MutationRate = 4,
    /// Tuning knob in `[0, 1]`.
    SelectionPressure = 5,
    /// Last fitness signal computed by `step`.
    AdaptationScore = 6,
}

impl StateField {
    /// All fields in flat-vector order.
    pub const ALL: [StateField; FIELD_COUNT] = [
        StateField::Population,
        StateField::Energy,
        StateField::Generation,
        StateField::Age,
        StateField::MutationRate,
        StateField::SelectionPressure,
        StateField::AdaptationScore,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical (camelCase) name used by snapshots and bindings.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            StateField::Population => "population",
            StateField::Energy => "energy",
            StateField::Generation => "generation",
            StateField::Age => "age",
            StateField::MutationRate => "mutationRate",
            StateField::SelectionPressure => "selectionPressure",
            StateField::AdaptationScore => "adaptationScore",
        }
    }

    #[must_use]
    pub fn snake_name(self) -> &'static str {
        match self {
            StateField::MutationRate => "mutation_rate",
            StateField::SelectionPressure => "selection_pressure",
            StateField::AdaptationScore => "adaptation_score",
            other => other.name(),
        }
    }

    /// Resolves a field from either its camelCase or snake_case name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<StateField> {
        StateField::ALL
            .into_iter()
            .find(|f| f.name() == name || f.snake_name() == name)
    }

    /// True for the discrete counters (`generation`, `age`).
    #[must_use]
    pub fn is_counter(self) -> bool {
        matches!(self, StateField::Generation | StateField::Age)
    }

    /// Maps an arbitrary value into this field's domain.
    ///
    /// NaN becomes 0.0 everywhere. Counters are floored and saturate at
    /// `u64::MAX`; the returned value is the `f64` image of the stored count.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        match self {
            StateField::Population | StateField::Energy => non_negative(value),
            StateField::Generation | StateField::Age => to_count(value) as f64,
            StateField::MutationRate | StateField::SelectionPressure => unit_interval(value),
            StateField::AdaptationScore => {
                if value.is_finite() {
                    value
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keeps the value finite so snapshots can always encode it.
fn non_negative(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, f64::MAX)
    }
}

fn unit_interval(value: f64) -> f64 {
    value.max(0.0).min(1.0)
}

/// Converts a real into a step/generation counter. `as` saturates.
fn to_count(value: f64) -> u64 {
    value.max(0.0).floor() as u64
}

/// Fixed-schema numeric record evolved by the runtime.
///
/// Fields are private so every write goes through a clamping setter; a value
/// of this type is always inside its documented domain.
#[derive(Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct OrganismState {
    population: f64,
    energy: f64,
    generation: u64,
    age: u64,
    mutation_rate: f64,
    selection_pressure: f64,
    adaptation_score: f64,
}

impl Default for OrganismState {
    fn default() -> Self {
        Self {
            population: 100.0,
            energy: 1000.0,
            generation: 0,
            age: 0,
            mutation_rate: 0.0,
            selection_pressure: 0.0,
            adaptation_score: 0.0,
        }
    }
}

impl OrganismState {
    /// Creates a state with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn population(&self) -> f64 {
        self.population
    }

    #[must_use]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn age(&self) -> u64 {
        self.age
    }

    #[must_use]
    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    #[must_use]
    pub fn selection_pressure(&self) -> f64 {
        self.selection_pressure
    }

    #[must_use]
    pub fn adaptation_score(&self) -> f64 {
        self.adaptation_score
    }

    pub fn set_population(&mut self, value: f64) {
        self.population = non_negative(value);
    }

    pub fn set_energy(&mut self, value: f64) {
        self.energy = non_negative(value);
    }

    pub fn set_generation(&mut self, value: u64) {
        self.generation = value;
    }

    pub fn set_age(&mut self, value: u64) {
        self.age = value;
    }

    pub fn set_mutation_rate(&mut self, value: f64) {
        self.mutation_rate = unit_interval(value);
    }

    pub fn set_selection_pressure(&mut self, value: f64) {
        self.selection_pressure = unit_interval(value);
    }

    pub fn set_adaptation_score(&mut self, value: f64) {
        self.adaptation_score = StateField::AdaptationScore.clamp(value);
    }

    /// Reads a field as a real number.
    #[must_use]
    pub fn get(&self, field: StateField) -> f64 {
        match field {
            StateField::Population => self.population,
            StateField::Energy => self.energy,
            StateField::Generation => self.generation as f64,
            StateField::Age => self.age as f64,
            StateField::MutationRate => self.mutation_rate,
            StateField::SelectionPressure => self.selection_pressure,
            StateField::AdaptationScore => self.adaptation_score,
        }
    }

    /// Writes a field, clamping the value into the field's domain.
    pub fn set(&mut self, field: StateField, value: f64) {
        match field {
            StateField::Population => self.set_population(value),
            StateField::Energy => self.set_energy(value),
            StateField::Generation => self.generation = to_count(value),
            StateField::Age => self.age = to_count(value),
            StateField::MutationRate => self.set_mutation_rate(value),
            StateField::SelectionPressure => self.set_selection_pressure(value),
            StateField::AdaptationScore => self.set_adaptation_score(value),
        }
    }

    /// Re-applies every field's clamp. Used after decoding untrusted archives.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        for field in StateField::ALL.into_iter().filter(|f| !f.is_counter()) {
            let value = self.get(field);
            self.set(field, value);
        }
        self
    }
}
