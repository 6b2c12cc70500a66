//! Centralized error types for the pact crates.
//!
//! Component crates define their own error enums and wrap [`PactError`] for
//! the concern they share: talking to a provider or broker over HTTP.

use thiserror::Error;

/// Common error type for provider and broker calls.
///
/// Errors are classified as either retryable or non-retryable, which lets
/// the verifier tell an unavailable provider apart from a broken contract.
#[derive(Error, Debug)]
pub enum PactError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type for common pact operations.
pub type PactResult<T> = Result<T, PactError>;

impl PactError {
    /// Classify a transport failure of a call to `target`: timeouts and
    /// connection failures get their own retryable variants.
    #[must_use]
    pub fn from_transport(err: reqwest::Error, target: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(target.to_string())
        } else if err.is_connect() {
            Self::Unavailable(format!("{target}: {err}"))
        } else {
            Self::Http(err)
        }
    }

    /// Check if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use pact_common::PactError;
    ///
    /// let err = PactError::Timeout("GET http://localhost/data".to_string());
    /// assert!(err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Http(err) => err.is_timeout() || err.is_connect(),
        }
    }
}
