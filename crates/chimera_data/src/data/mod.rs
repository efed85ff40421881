//! Core data structures for the organism runtime.

pub mod organism;
pub mod rule;
pub mod snapshot;
