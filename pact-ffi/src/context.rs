//! The process context behind the boundary.
//!
//! [`PactContext`] owns the model registry, the running mock servers and the
//! lazily generated CA certificate. Registry mutations take the write lock;
//! lookups share the read lock. The exported C functions operate on one
//! global instance, tests construct their own.

use crate::error::{FfiError, FfiResult};
use crate::tls::generate_ca_pem;
use once_cell::sync::OnceCell;
use pact_common::{TracingConfig, init_tracing};
use pact_mock_server::{MockServerConfig, MockServerManager};
use pact_models::{InteractionHandle, InteractionPart, ModelRegistry, PactHandle};
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Run `f`, turning a panic into `fallback`.
pub fn contain<T>(operation: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!(operation, "panic contained at the boundary");
        fallback
    })
}

/// Run a fallible `f`, turning a panic into [`FfiError::Panic`].
///
/// # Errors
///
/// Returns the error of `f`, or [`FfiError::Panic`] if it panicked.
pub fn contain_result<T>(operation: &'static str, f: impl FnOnce() -> FfiResult<T>) -> FfiResult<T> {
    contain(operation, Err(FfiError::Panic(operation)), f)
}

/// Initialise logging from `log_env_var` (default `LOG_LEVEL`), in JSON when
/// `LOG_FORMAT=json`. Repeated calls are no-ops.
pub fn init(log_env_var: Option<&str>) -> bool {
    let mut config = TracingConfig::default().with_format_from_env();
    if let Some(name) = log_env_var.filter(|name| !name.is_empty()) {
        config = config.with_env_var(name);
    }
    init_tracing(&config)
}

/// The crate version.
#[must_use]
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Registry, mock servers and certificate shared by boundary calls.
#[derive(Debug, Default)]
pub struct PactContext {
    registry: RwLock<ModelRegistry>,
    servers: MockServerManager,
    tls_ca: OnceCell<String>,
}

impl PactContext {
    /// Create an empty context.
    #[must_use]
    pub fn new(config: MockServerConfig) -> Self {
        Self {
            registry: RwLock::new(ModelRegistry::new()),
            servers: MockServerManager::new(config),
            tls_ca: OnceCell::new(),
        }
    }

    /// Create a new pact.
    pub fn new_pact(&self, consumer: &str, provider: &str) -> PactHandle {
        self.registry.write().new_pact(consumer, provider)
    }

    /// Append a new interaction to a pact.
    pub fn new_interaction(&self, pact: PactHandle, description: &str) -> InteractionHandle {
        self.registry.write().new_interaction(pact, description)
    }

    /// Add a provider state.
    pub fn given(&self, interaction: InteractionHandle, state: &str) -> bool {
        self.registry.write().given(interaction, state)
    }

    /// Add a provider state parameter.
    pub fn given_with_param(&self, interaction: InteractionHandle, state: &str, name: &str, value: &str) -> bool {
        self.registry.write().given_with_param(interaction, state, name, value)
    }

    /// Set the interaction description.
    pub fn upon_receiving(&self, interaction: InteractionHandle, description: &str) -> bool {
        self.registry.write().upon_receiving(interaction, description)
    }

    /// Set the expected request method and path.
    pub fn with_request(&self, interaction: InteractionHandle, method: &str, path: &str) -> bool {
        self.registry.write().with_request(interaction, method, path)
    }

    /// Set a query parameter value.
    pub fn with_query_parameter(&self, interaction: InteractionHandle, name: &str, index: usize, value: &str) -> bool {
        self.registry.write().with_query_parameter(interaction, name, index, value)
    }

    /// Set a header value.
    pub fn with_header(
        &self,
        interaction: InteractionHandle,
        part: InteractionPart,
        name: &str,
        index: usize,
        value: &str,
    ) -> bool {
        self.registry.write().with_header(interaction, part, name, index, value)
    }

    /// Set a body.
    pub fn with_body(&self, interaction: InteractionHandle, part: InteractionPart, content_type: &str, body: &str) -> bool {
        self.registry.write().with_body(interaction, part, content_type, body)
    }

    /// Set the response status.
    pub fn response_status(&self, interaction: InteractionHandle, status: u16) -> bool {
        self.registry.write().response_status(interaction, status)
    }

    /// The pact document for `pact`, if the handle is live.
    #[must_use]
    pub fn pact_json(&self, pact: PactHandle) -> Option<String> {
        self.registry.read().pact(pact).and_then(|p| p.to_json_pretty().ok())
    }

    /// Start a mock server from pact JSON.
    ///
    /// # Errors
    ///
    /// Returns the parse, address and bind errors of the mock server layer.
    pub fn create_mock_server(&self, pact_json: &str, addr: &str) -> FfiResult<u16> {
        Ok(self.servers.start_from_json(pact_json, addr)?)
    }

    /// Start a mock server for a pact in the registry. The server serves a
    /// snapshot of the pact taken now.
    ///
    /// # Errors
    ///
    /// Returns [`FfiError::InvalidHandle`] for a dead handle and the address
    /// and bind errors of the mock server layer.
    pub fn create_mock_server_for_pact(&self, pact: PactHandle, addr: &str) -> FfiResult<u16> {
        let snapshot = self
            .registry
            .read()
            .pact(pact)
            .cloned()
            .ok_or(FfiError::InvalidHandle(pact.pact))?;
        Ok(self.servers.start(snapshot, addr)?)
    }

    /// Stop the mock server on `port`.
    pub fn cleanup_mock_server(&self, port: u16) -> bool {
        self.servers.cleanup(port)
    }

    /// Whether the mock server on `port` saw exactly the expected requests.
    #[must_use]
    pub fn mock_server_matched(&self, port: u16) -> bool {
        self.servers.matched(port)
    }

    /// The mismatch ledger of the mock server on `port` as JSON text.
    #[must_use]
    pub fn mock_server_mismatches(&self, port: u16) -> Option<String> {
        self.servers.mismatches(port).map(|value| value.to_string())
    }

    /// Write the pact of the mock server on `port` into `dir` (the current
    /// directory when absent).
    ///
    /// # Errors
    ///
    /// Returns the not-found and write errors of the mock server layer.
    pub fn write_pact_file(&self, port: u16, dir: Option<&Path>) -> FfiResult<PathBuf> {
        Ok(self.servers.write_pact(port, dir)?)
    }

    /// The process CA certificate as PEM, generated on first use.
    ///
    /// # Errors
    ///
    /// Returns [`FfiError::Certificate`] if generation fails.
    pub fn tls_ca_certificate(&self) -> FfiResult<&str> {
        self.tls_ca
            .get_or_try_init(|| {
                debug!("generating mock server CA certificate");
                generate_ca_pem()
            })
            .map(String::as_str)
            .map_err(FfiError::from)
    }

    /// Stop every mock server and drop every pact.
    pub fn shutdown(&self) {
        self.servers.shutdown_all();
        *self.registry.write() = ModelRegistry::new();
        info!("pact context shut down");
    }
}
