//! Organism step function.
//!
//! `step` is a pure function of the current state and `delta_time`; there is
//! no hidden randomness, so replaying the same `delta_time` sequence from the
//! same snapshot reproduces every field bit-for-bit.

use crate::config::OrganismConfig;
use chimera_data::OrganismState;

/// `generation` advances whenever `age` reaches a multiple of this.
pub const GENERATION_INTERVAL: u64 = 100;

/// Reference population: `population / POPULATION_SCALE` feeds the score.
const POPULATION_SCALE: f64 = 100.0;
/// Reference energy, also the energy level at which growth equals `1 - mutationRate`.
const ENERGY_SCALE: f64 = 1000.0;
/// Age at which the age component of the score saturates.
const AGE_SCALE: f64 = 100.0;
/// Energy consumed per unit of population per unit time.
const CONSUMPTION_PER_CAPITA: f64 = 0.1;
/// Energy regenerated per unit time.
const ENERGY_REGEN: f64 = 10.0;
const MIN_POPULATION: f64 = 1.0;
const MAX_ENERGY: f64 = 10_000.0;

/// Time evolution of an organism.
pub trait OrganismLogic {
    /// Default state with `config` applied. Never fails.
    fn from_config(config: &OrganismConfig) -> Self
    where
        Self: Sized;

    /// Default state with the JSON configuration applied; malformed text
    /// yields the defaults.
    fn from_config_str(json: &str) -> Self
    where
        Self: Sized;

    /// Advances one tick scaled by `delta_time` and returns the new
    /// adaptation score, which is also stored in the state.
    fn step(&mut self, delta_time: f64) -> f64;

    /// Bumps `generation` outside the regular interval.
    fn advance_generation(&mut self);

    /// Fitness signal for the current field values.
    fn compute_adaptation_score(&self) -> f64;
}

impl OrganismLogic for OrganismState {
    fn from_config(config: &OrganismConfig) -> Self {
        config.build()
    }

    fn from_config_str(json: &str) -> Self {
        OrganismConfig::from_json_str(json).build()
    }

    fn step(&mut self, delta_time: f64) -> f64 {
        let dt = if delta_time.is_finite() && delta_time > 0.0 {
            delta_time
        } else {
            0.0
        };

        let age = self.age().saturating_add(1);
        self.set_age(age);
        if age % GENERATION_INTERVAL == 0 {
            self.advance_generation();
        }

        let mut population = self.population();
        let mut energy = self.energy();
        // A zero dt must not touch the terms: `inf * 0.0` would be NaN for a
        // saturated population.
        if dt > 0.0 {
            let growth_rate = (energy / ENERGY_SCALE) * (1.0 - self.mutation_rate());
            population += population * growth_rate * dt;
            // Consumption uses the grown population before the floor below.
            energy -= population * CONSUMPTION_PER_CAPITA * dt;
            energy += ENERGY_REGEN * dt;
        }
        population = population.max(MIN_POPULATION).min(f64::MAX);
        energy = energy.clamp(0.0, MAX_ENERGY);

        self.set_population(population);
        self.set_energy(energy);

        let score = self.compute_adaptation_score();
        self.set_adaptation_score(score);
        tracing::trace!(age, population, energy, score, "Organism step");
        score
    }

    fn advance_generation(&mut self) {
        self.set_generation(self.generation().saturating_add(1));
    }

    fn compute_adaptation_score(&self) -> f64 {
        let pop_score = (self.population() / POPULATION_SCALE).min(2.0);
        let energy_score = (self.energy() / ENERGY_SCALE).min(1.0);
        let age_score = (self.age() as f64 / AGE_SCALE).min(1.0);
        (pop_score + energy_score + age_score) / 3.0
    }
}
