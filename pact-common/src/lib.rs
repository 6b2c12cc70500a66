//! Shared library for cross-cutting concerns in the pact contract testing crates.
//!
//! This crate provides centralized implementations for:
//! - Transport error classification with retryability
//! - HTTP client configuration and building
//! - Tracing subscriber initialisation driven by an environment variable

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod tracing_config;

pub use error::{PactError, PactResult};
pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{LOG_FORMAT_ENV_VAR, TracingConfig, init_tracing};
