//! # Chimera IO
//!
//! File persistence for the organism runtime.
//!
//! This crate provides:
//! - Structured error handling for persistence operations
//! - JSON snapshot files
//! - Gzip-compressed rule archives
//! - Validated rkyv binary checkpoints

/// Error types and result aliases for I/O operations
pub mod error;
/// Snapshot files, rule archives and binary checkpoints
pub mod persistence;

pub use error::{IoError, Result};
pub use persistence::{
    load_checkpoint, load_rule_archive, read_snapshot_file, save_checkpoint, save_rule_archive,
    write_snapshot_file,
};
