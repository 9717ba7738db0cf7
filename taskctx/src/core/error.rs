//! Error taxonomy for execution context operations.
//!
//! Every core operation is a deterministic in-memory computation, so these
//! errors are never transient and are never retried.

use thiserror::Error;

/// Failure returned by a core context operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The path contains syntax the active path style cannot represent.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A process launch request is missing or carries an unusable field.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A required variable is absent from the context (never set, or cleared).
    #[error("environment variable {name:?} is not set in this context")]
    MissingVariable { name: String },
}

impl ContextError {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ContextResult<T> = Result<T, ContextError>;
