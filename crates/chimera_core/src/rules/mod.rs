//! Named rules and their evaluation.

pub mod evaluator;
pub mod registry;

pub use evaluator::{
    evaluator_fn, Bindings, EvalError, FnEvaluator, ParamNudgeEvaluator, RuleEvaluator,
};
pub use registry::RuleRegistry;
