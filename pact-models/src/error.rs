//! Model error types.

use thiserror::Error;

/// Errors raised while building or reading pact models.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A matching rule path expression could not be parsed
    #[error("Invalid path expression '{expr}': {reason}")]
    InvalidPath {
        /// The offending expression
        expr: String,
        /// Why it was rejected
        reason: String,
    },

    /// A matching rule definition was not understood
    #[error("Invalid matching rule: {0}")]
    InvalidMatcher(String),

    /// The pact document could not be read
    #[error("Invalid pact document: {0}")]
    InvalidPact(#[from] serde_json::Error),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Create an invalid path error.
    #[must_use]
    pub fn invalid_path(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid matcher error.
    #[must_use]
    pub fn invalid_matcher(msg: impl Into<String>) -> Self {
        Self::InvalidMatcher(msg.into())
    }
}
