//! Error types for chimera_io crate.

use chimera_core::CoreError;
use thiserror::Error;

/// Main error type for chimera_io operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File system errors
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Rkyv-specific errors
    #[error("Rkyv error: {0}")]
    Rkyv(String),

    /// Compression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Codec or registry errors raised while decoding file contents
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<IoError>,
    },
}

/// Result type alias for chimera_io operations.
pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    #[must_use]
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }

    #[must_use]
    pub fn rkyv<S: Into<String>>(msg: S) -> Self {
        Self::Rkyv(msg.into())
    }

    #[must_use]
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
