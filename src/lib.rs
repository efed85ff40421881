//! # Chimera
//!
//! Host-facing layer over the organism runtime: a [`Session`] that owns one
//! organism and one rule registry, and (on `wasm32`) JavaScript bindings.

pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use chimera_core::{
    evaluator_fn, AppConfig, Bindings, CoreError, EvalError, OrganismConfig, OrganismLogic,
    RuleEvaluator, RuleRegistry, RuntimeConfig, StateCodec,
};
pub use chimera_data::{OrganismSnapshot, OrganismState, RuleStats, StateField};
pub use session::{Session, SessionCheckpoint};
