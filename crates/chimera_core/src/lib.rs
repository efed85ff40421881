//! # Chimera Core
//!
//! Deterministic organism runtime with a pluggable rule registry.
//!
//! This crate contains:
//! - The organism step function and generation policy
//! - Flat state-vector and structured snapshot codecs
//! - The rule evaluator boundary and the transactional [`RuleRegistry`]
//! - Lenient configuration records and logging setup
//!
//! ## Example
//!
//! ```
//! use chimera_core::{OrganismLogic, RuleRegistry, StateCodec};
//! use chimera_data::OrganismState;
//!
//! let mut state = OrganismState::new();
//! let score = state.step(0.1);
//! assert_eq!(state.age(), 1);
//! assert_eq!(score, state.adaptation_score());
//!
//! let mut registry = RuleRegistry::new();
//! registry.register_rule("nudge", "(nudge mutation-rate)").unwrap();
//! registry.apply(&mut state, "nudge", &[2.0]).unwrap();
//! assert!((state.mutation_rate() - 0.02).abs() < 1e-12);
//!
//! let vector = state.state_vector();
//! assert_eq!(vector.len(), chimera_data::FIELD_COUNT);
//! ```

/// Flat-vector and snapshot codecs for organism state
pub mod codec;
/// Configuration records (organism overrides, runtime settings)
pub mod config;
/// Error types and result alias
pub mod error;
/// Runtime counters and tracing subscriber setup
pub mod metrics;
/// Step function and generation policy
pub mod organism;
/// Rule evaluator boundary and registry
pub mod rules;

pub use codec::StateCodec;
pub use config::{AppConfig, OrganismConfig, RuntimeConfig};
pub use error::{CoreError, Result};
pub use metrics::{init_logging, RuntimeMetrics};
pub use organism::{OrganismLogic, GENERATION_INTERVAL};
pub use rules::{
    evaluator_fn, Bindings, EvalError, FnEvaluator, ParamNudgeEvaluator, RuleEvaluator,
    RuleRegistry,
};
