//! Error types for Mocktailverse.
//!
//! Library crates use [`MocktailverseError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::Stage;

/// Top-level error type for all Mocktailverse operations.
#[derive(Debug, thiserror::Error)]
pub enum MocktailverseError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the cocktail API or a probe target.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or record parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Key-value store / query engine error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Object store error (bucket or key level).
    #[error("object store error: {0}")]
    ObjectStore(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad partition, invalid pipeline definition, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A requested object, record or run does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A pipeline stage failed; wraps the underlying cause.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<MocktailverseError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MocktailverseError>;

impl MocktailverseError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute an error to the stage it happened in.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Whether retrying the failed operation may succeed.
    ///
    /// Only transient network failures qualify; everything else is either a
    /// data problem or a local fault that a retry will not fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Stage { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
