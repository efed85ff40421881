//! Evaluator boundary.
//!
//! The runtime never interprets rule text. A host supplies a [`RuleEvaluator`]
//! that reads and writes organism fields through [`Bindings`]; writes are
//! staged inside the bindings and only reach the live state once the
//! registry has seen the evaluation succeed.

use chimera_data::{OrganismState, StateField};
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure reported by an evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Evaluation failed: {0}")]
    Failed(String),

    /// The evaluator gave up after its own time budget.
    #[error("Evaluation timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    #[error("Unknown binding: {0}")]
    UnknownBinding(String),

    #[error("Non-finite value written to {field}")]
    NonFinite { field: StateField },

    #[error("Evaluation returned a non-finite result")]
    NonFiniteResult,

    /// Counters only move forward.
    #[error("Counter {field} cannot decrease")]
    CounterDecrease { field: StateField },
}

impl EvalError {
    #[must_use]
    pub fn failed<S: Into<String>>(msg: S) -> Self {
        Self::Failed(msg.into())
    }
}

/// Mutable view over organism fields plus the call's positional parameters.
///
/// Reads see earlier writes from the same evaluation. Writes are clamped to
/// the field's domain when staged.
#[derive(Debug)]
pub struct Bindings<'a> {
    base: &'a OrganismState,
    staged: BTreeMap<StateField, f64>,
    params: &'a [f64],
}

impl<'a> Bindings<'a> {
    #[must_use]
    pub fn new(base: &'a OrganismState, params: &'a [f64]) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
            params,
        }
    }

    #[must_use]
    pub fn get(&self, field: StateField) -> f64 {
        self.staged
            .get(&field)
            .copied()
            .unwrap_or_else(|| self.base.get(field))
    }

    /// Stages a write. NaN and infinities are rejected, as is lowering
    /// `generation` or `age`.
    pub fn set(&mut self, field: StateField, value: f64) -> Result<(), EvalError> {
        if !value.is_finite() {
            return Err(EvalError::NonFinite { field });
        }
        let value = field.clamp(value);
        if field.is_counter() && value < self.get(field) {
            return Err(EvalError::CounterDecrease { field });
        }
        self.staged.insert(field, value);
        Ok(())
    }

    #[must_use]
    pub fn params(&self) -> &[f64] {
        self.params
    }

    #[must_use]
    pub fn param(&self, index: usize) -> Option<f64> {
        self.params.get(index).copied()
    }

    /// Resolves a name: a field (camelCase or snake_case) or a parameter
    /// `p0`, `p1`, ...
    pub fn lookup(&self, name: &str) -> Result<f64, EvalError> {
        if let Some(field) = StateField::from_name(name) {
            return Ok(self.get(field));
        }
        param_index(name)
            .and_then(|i| self.param(i))
            .ok_or_else(|| EvalError::UnknownBinding(name.to_string()))
    }

    /// Stages a write by field name. Parameters are read-only.
    pub fn assign(&mut self, name: &str, value: f64) -> Result<(), EvalError> {
        match StateField::from_name(name) {
            Some(field) => self.set(field, value),
            None if param_index(name).is_some() => Err(EvalError::failed(format!(
                "parameter {name} is read-only"
            ))),
            None => Err(EvalError::UnknownBinding(name.to_string())),
        }
    }

    /// Writes staged so far, keyed by field.
    #[must_use]
    pub fn mutations(&self) -> &BTreeMap<StateField, f64> {
        &self.staged
    }

    #[must_use]
    pub fn into_mutations(self) -> BTreeMap<StateField, f64> {
        self.staged
    }
}

fn param_index(name: &str) -> Option<usize> {
    name.strip_prefix('p')?.parse().ok()
}

/// Interprets a rule's expression body against the given bindings.
pub trait RuleEvaluator {
    fn evaluate(&self, expression: &str, bindings: &mut Bindings<'_>) -> Result<f64, EvalError>;
}

impl<E: RuleEvaluator + ?Sized> RuleEvaluator for Box<E> {
    fn evaluate(&self, expression: &str, bindings: &mut Bindings<'_>) -> Result<f64, EvalError> {
        (**self).evaluate(expression, bindings)
    }
}

/// Adapter turning a closure into a [`RuleEvaluator`]; build it with
/// [`evaluator_fn`].
pub struct FnEvaluator<F>(F);

/// Wraps a closure as an evaluator.
pub fn evaluator_fn<F>(f: F) -> FnEvaluator<F>
where
    F: Fn(&str, &mut Bindings<'_>) -> Result<f64, EvalError>,
{
    FnEvaluator(f)
}

impl<F> RuleEvaluator for FnEvaluator<F>
where
    F: Fn(&str, &mut Bindings<'_>) -> Result<f64, EvalError>,
{
    fn evaluate(&self, expression: &str, bindings: &mut Bindings<'_>) -> Result<f64, EvalError> {
        (self.0)(expression, bindings)
    }
}

/// Fallback used when the host injects nothing: ignores the body, nudges
/// `mutationRate` by `p0 * 0.01` when a parameter is given and returns the
/// current adaptation score.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamNudgeEvaluator;

impl ParamNudgeEvaluator {
    const NUDGE_SCALE: f64 = 0.01;
}

impl RuleEvaluator for ParamNudgeEvaluator {
    fn evaluate(&self, _expression: &str, bindings: &mut Bindings<'_>) -> Result<f64, EvalError> {
        if let Some(adjustment) = bindings.param(0) {
            let rate = bindings.get(StateField::MutationRate);
            bindings.set(StateField::MutationRate, rate + adjustment * Self::NUDGE_SCALE)?;
        }
        Ok(bindings.get(StateField::AdaptationScore))
    }
}
