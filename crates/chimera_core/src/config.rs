//! Configuration management for the organism runtime.
//!
//! Two layers:
//!
//! 1. [`OrganismConfig`]: a lenient record of initial state overrides. It never
//!    rejects input; unknown keys and values of the wrong type are skipped and
//!    out-of-domain numbers are clamped when applied.
//! 2. [`AppConfig`]: the `chimera.toml` file read by hosts, holding an
//!    `[organism]` table and a `[runtime]` table.
//!
//! ## Example `chimera.toml`
//!
//! ```toml
//! [organism]
//! population = 250.0
//! mutation_rate = 0.05
//!
//! [runtime]
//! steps = 1000
//! delta_time = 0.1
//! rules_path = "rules.json.gz"
//! ```

use chimera_data::{OrganismState, StateField, DEFAULT_TIMING_WINDOW};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Initial-state overrides keyed by field name (camelCase or snake_case).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct OrganismConfig {
    overrides: Map<String, Value>,
}

impl OrganismConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an arbitrary JSON value. Anything but an object yields an empty
    /// configuration.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(overrides) => Self { overrides },
            other => {
                tracing::warn!(kind = %json_kind(&other), "Organism config is not an object, using defaults");
                Self::default()
            }
        }
    }

    /// Parses JSON text. Malformed text yields an empty configuration.
    #[must_use]
    pub fn from_json_str(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed organism config, using defaults");
                Self::default()
            }
        }
    }

    /// Adds or replaces one override.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Writes every recognized override into `state`.
    pub fn apply_to(&self, state: &mut OrganismState) {
        for (key, value) in &self.overrides {
            let Some(field) = StateField::from_name(key) else {
                tracing::debug!(key = %key, "Ignoring unknown organism config key");
                continue;
            };
            // Counters go through u64 first so large integers stay exact.
            match (field, value.as_u64(), value.as_f64()) {
                (StateField::Generation, Some(count), _) => state.set_generation(count),
                (StateField::Age, Some(count), _) => state.set_age(count),
                (_, _, Some(number)) => state.set(field, number),
                _ => {
                    tracing::warn!(
                        field = %field,
                        kind = %json_kind(value),
                        "Organism config value is not a number, keeping default"
                    );
                }
            }
        }
    }

    /// Builds a default state with the overrides applied.
    #[must_use]
    pub fn build(&self) -> OrganismState {
        let mut state = OrganismState::new();
        self.apply_to(&mut state);
        state
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Settings for hosts that drive the runtime headlessly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of `step` calls per run.
    pub steps: u64,
    pub delta_time: f64,
    /// Per-rule duration window (N in "total duration of last N invocations").
    pub timing_window: usize,
    /// Snapshot written after the run (and read with `--resume`).
    pub snapshot_path: Option<String>,
    /// Rule archive loaded into the registry before the run.
    pub rules_path: Option<String>,
    /// Binary checkpoint written after the run.
    pub checkpoint_path: Option<String>,
    /// Emit a summary log line every this many steps (0 disables).
    pub log_summary_every: u64,
    /// Apply every registered rule (in id order) after each step.
    pub apply_rules: bool,
    /// Parameters passed to each rule when `apply_rules` is set.
    pub rule_params: Vec<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            delta_time: 0.1,
            timing_window: DEFAULT_TIMING_WINDOW,
            snapshot_path: None,
            rules_path: None,
            checkpoint_path: None,
            log_summary_every: 1000,
            apply_rules: false,
            rule_params: Vec::new(),
        }
    }
}

/// Top-level configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub organism: OrganismConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Parses TOML text.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads the file at `path`, falling back to defaults when it is missing
    /// or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overrides_and_clamping() {
        let config = OrganismConfig::from_value(json!({
            "population": 250.0,
            "mutationRate": 5.0,
            "selection_pressure": -2.0,
            "generation": 7,
        }));
        let state = config.build();
        assert_eq!(state.population(), 250.0);
        assert_eq!(state.mutation_rate(), 1.0);
        assert_eq!(state.selection_pressure(), 0.0);
        assert_eq!(state.generation(), 7);
        assert_eq!(state.energy(), 1000.0);
    }

    #[test]
    fn test_bad_values_fall_back_to_defaults() {
        let config = OrganismConfig::from_value(json!({
            "energy": "lots",
            "age": null,
            "wingspan": 3.0,
        }));
        assert_eq!(config.build(), OrganismState::new());
    }

    #[test]
    fn test_malformed_json_gives_defaults() {
        let config = OrganismConfig::from_json_str("{ population: ");
        assert!(config.is_empty());
        assert_eq!(OrganismConfig::from_json_str("[1, 2]").build(), OrganismState::new());
    }

    #[test]
    fn test_app_config_from_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [organism]
            population = 42.0
            mutation_rate = 0.25

            [runtime]
            steps = 10
            rules_path = "rules.json"
            "#,
        )
        .unwrap();
        let state = config.organism.build();
        assert_eq!(state.population(), 42.0);
        assert_eq!(state.mutation_rate(), 0.25);
        assert_eq!(config.runtime.steps, 10);
        assert_eq!(config.runtime.delta_time, 0.1);
        assert_eq!(config.runtime.rules_path.as_deref(), Some("rules.json"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = AppConfig::load("/nonexistent/chimera.toml");
        assert_eq!(config, AppConfig::default());
    }
}
