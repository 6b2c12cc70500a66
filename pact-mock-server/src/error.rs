//! Mock server errors.

use pact_models::ModelError;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting, querying or persisting mock servers.
#[derive(Error, Debug)]
pub enum MockServerError {
    /// The pact document could not be read
    #[error("invalid pact: {0}")]
    InvalidPact(#[from] ModelError),

    /// The bind address is not a socket address
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    /// The listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The serving runtime could not be started
    #[error("mock server runtime failed: {0}")]
    Runtime(String),

    /// No mock server listens on the port
    #[error("no mock server on port {0}")]
    NotFound(u16),

    /// The pact file could not be written
    #[error("failed to write pact file {path}: {source}")]
    Write {
        /// Target file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The pact could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MockServerError {
    /// Create a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Whether the error concerns a resource (port, server, file) rather
    /// than caller input.
    #[must_use]
    pub const fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Self::Bind { .. } | Self::Runtime(_) | Self::NotFound(_) | Self::Write { .. }
        )
    }
}

/// Result type for mock server operations.
pub type MockServerResult<T> = Result<T, MockServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MockServerError::NotFound(1234).to_string(), "no mock server on port 1234");
        assert_eq!(
            MockServerError::InvalidAddress("nowhere".to_string()).to_string(),
            "invalid bind address 'nowhere'"
        );
    }

    #[test]
    fn test_resource_classification() {
        assert!(MockServerError::NotFound(1).is_resource_error());
        assert!(MockServerError::runtime("x").is_resource_error());
        assert!(!MockServerError::InvalidAddress(String::new()).is_resource_error());
    }
}
