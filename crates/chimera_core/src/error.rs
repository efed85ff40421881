//! Error types for chimera_core.
//!
//! Every error here is local and recoverable; operations that return one
//! leave the organism state untouched.

use crate::rules::EvalError;
use thiserror::Error;

/// Main error type for runtime operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Flat state vector had the wrong number of values
    #[error("State vector has {actual} values, expected {expected}")]
    Shape { expected: usize, actual: usize },

    /// Malformed snapshot or registry export
    #[error("Decode error: {0}")]
    Decode(String),

    /// Snapshot or export could not be rendered as text
    #[error("Encode error: {0}")]
    Encode(String),

    /// Empty or whitespace-only rule identifier
    #[error("Invalid rule id: {0:?}")]
    InvalidRuleId(String),

    /// No rule registered under the identifier
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// The evaluator failed or timed out; the state was left unchanged
    #[error("Rule '{id}' failed: {source}")]
    RuleExecution { id: String, source: EvalError },
}

/// Result type alias for chimera_core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    #[must_use]
    pub fn shape(expected: usize, actual: usize) -> Self {
        Self::Shape { expected, actual }
    }

    #[must_use]
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    #[must_use]
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    #[must_use]
    pub fn invalid_rule_id<S: Into<String>>(id: S) -> Self {
        Self::InvalidRuleId(id.into())
    }

    #[must_use]
    pub fn rule_not_found<S: Into<String>>(id: S) -> Self {
        Self::RuleNotFound(id.into())
    }

    #[must_use]
    pub fn rule_execution<S: Into<String>>(id: S, source: EvalError) -> Self {
        Self::RuleExecution {
            id: id.into(),
            source,
        }
    }
}
