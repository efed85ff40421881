//! Core data structures for the Chimera organism runtime.
//!
//! Everything in this crate is plain data: the organism's fixed-schema state
//! record, its structured snapshot, and the bookkeeping records of the rule
//! registry. Behaviour (stepping, codecs, rule application) lives in
//! `chimera_core`.

pub mod data;

pub use data::organism::{OrganismState, StateField, FIELD_COUNT};
pub use data::rule::{RegistryExport, RuleStats, DEFAULT_TIMING_WINDOW};
pub use data::snapshot::{OrganismSnapshot, SNAPSHOT_FORMAT_VERSION};
