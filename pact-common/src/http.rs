//! Centralized HTTP client configuration and building.
//!
//! The verifier talks to providers (and state change endpoints) through a
//! client built here so timeouts and the user agent are consistent.

use crate::error::PactResult;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 10s)
    pub timeout: Duration,
    /// Connection timeout (default: 5s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("pact-core-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with custom timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Build a configured HTTP client.
///
/// Redirects are not followed: a provider answering with a redirect is a
/// response to be verified like any other.
///
/// # Errors
///
/// Returns [`crate::PactError::Http`] if the client cannot be built (e.g., TLS
/// initialization fails).
///
/// # Examples
///
/// ```
/// use pact_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_timeout(Duration::from_secs(60));
/// let client = build_http_client(&config).expect("Failed to build client");
/// ```
pub fn build_http_client(config: &HttpConfig) -> PactResult<Client> {
    let client = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .user_agent(&config.user_agent)
        .redirect(reqwest::redirect::Policy::none())
        .use_rustls_tls()
        .build()?;
    Ok(client)
}
