//! A host-side simulation session: one organism, one rule registry.

use chimera_core::{
    AppConfig, CoreError, OrganismLogic, RuleEvaluator, RuleRegistry, RuntimeMetrics, StateCodec,
};
use chimera_data::{OrganismSnapshot, OrganismState, RegistryExport};
use serde::{Deserialize, Serialize};

/// Everything needed to resume a session: the organism snapshot plus the rule
/// bodies. Rule statistics are not carried over.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCheckpoint {
    pub organism: OrganismSnapshot,
    pub rules: RegistryExport,
}

/// Owns the organism and the registry and drives them the way an external
/// host would: steps first, rules after.
#[derive(Debug)]
pub struct Session {
    state: OrganismState,
    registry: RuleRegistry,
    metrics: RuntimeMetrics,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(OrganismState::new(), RuleRegistry::new())
    }
}

impl Session {
    #[must_use]
    pub fn new(state: OrganismState, registry: RuleRegistry) -> Self {
        Self {
            state,
            registry,
            metrics: RuntimeMetrics::default(),
        }
    }

    /// Builds the initial state and an empty registry from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let state = OrganismState::from_config(&config.organism);
        let registry = RuleRegistry::new().with_timing_window(config.runtime.timing_window);
        Self {
            state,
            registry,
            metrics: RuntimeMetrics::new(config.runtime.log_summary_every),
        }
    }

    /// Same as [`Session::from_config`] with a host-supplied evaluator.
    #[must_use]
    pub fn with_evaluator<E: RuleEvaluator + 'static>(config: &AppConfig, evaluator: E) -> Self {
        let mut session = Self::from_config(config);
        session.registry.set_evaluator(evaluator);
        session
    }

    #[must_use]
    pub fn state(&self) -> &OrganismState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut OrganismState {
        &mut self.state
    }

    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn metrics(&self) -> &RuntimeMetrics {
        &self.metrics
    }

    /// Replaces the organism wholesale, keeping rules.
    pub fn replace_state(&mut self, state: OrganismState) {
        self.state = state;
    }

    /// Restores the default organism, keeping rules.
    pub fn reset(&mut self) {
        self.replace_state(OrganismState::new());
    }

    /// Advances the organism one step.
    pub fn tick(&mut self, delta_time: f64) -> f64 {
        let score = self.state.step(delta_time);
        self.metrics.record_step(self.state.age(), score);
        score
    }

    /// Steps `steps` times and returns the final adaptation score (the
    /// current one if `steps` is zero).
    pub fn run(&mut self, steps: u64, delta_time: f64) -> f64 {
        for _ in 0..steps {
            self.tick(delta_time);
        }
        self.state.adaptation_score()
    }

    pub fn apply_rule(&mut self, id: &str, params: &[f64]) -> chimera_core::Result<f64> {
        let outcome = self.registry.apply(&mut self.state, id, params);
        match &outcome {
            Ok(_) | Err(CoreError::RuleExecution { .. }) => {
                self.metrics.record_rule(outcome.is_ok());
            }
            Err(_) => {}
        }
        outcome
    }

    /// Steps once, then applies every registered rule in id order. Rule
    /// failures are logged by the registry and do not stop the tick; the
    /// number of failed rules is returned alongside the score.
    pub fn tick_with_rules(&mut self, delta_time: f64, params: &[f64]) -> (f64, usize) {
        self.tick(delta_time);
        let mut failures = 0;
        for id in self.registry.rule_ids() {
            if self.apply_rule(&id, params).is_err() {
                failures += 1;
            }
        }
        (self.state.adaptation_score(), failures)
    }

    #[must_use]
    pub fn checkpoint(&self) -> SessionCheckpoint {
        SessionCheckpoint {
            organism: self.state.snapshot(),
            rules: self.registry.export_registry(),
        }
    }

    /// Loads the checkpoint's organism and merges its rules into the
    /// registry. On an invalid rule id nothing is changed.
    pub fn restore(&mut self, checkpoint: &SessionCheckpoint) -> chimera_core::Result<()> {
        self.registry.import_registry(checkpoint.rules.clone())?;
        self.state.load_snapshot(&checkpoint.organism);
        tracing::info!(
            age = self.state.age(),
            rules = self.registry.rule_count(),
            "Session restored"
        );
        Ok(())
    }
}
