//! Registry of running mock servers, keyed by port.

use crate::config::MockServerConfig;
use crate::error::{MockServerError, MockServerResult};
use crate::server::MockServer;
use pact_models::Pact;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Starts, tracks and tears down mock servers.
#[derive(Debug, Default)]
pub struct MockServerManager {
    servers: Mutex<BTreeMap<u16, Arc<MockServer>>>,
    config: MockServerConfig,
}

impl MockServerManager {
    /// Manager starting servers with `config`.
    #[must_use]
    pub fn new(config: MockServerConfig) -> Self {
        Self {
            servers: Mutex::new(BTreeMap::new()),
            config,
        }
    }

    /// The configuration servers are started with.
    #[must_use]
    pub const fn config(&self) -> &MockServerConfig {
        &self.config
    }

    /// Start a server for a pact document.
    ///
    /// # Errors
    ///
    /// Returns [`MockServerError::InvalidPact`] for an unreadable document and
    /// the errors of [`MockServer::start`].
    pub fn start_from_json(&self, pact_json: &str, addr: &str) -> MockServerResult<u16> {
        let pact = Pact::from_json(pact_json)?;
        self.start(pact, addr)
    }

    /// Start a server for a pact.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`MockServer::start`].
    pub fn start(&self, pact: Pact, addr: &str) -> MockServerResult<u16> {
        let server = MockServer::start(pact, addr, &self.config)?;
        let port = server.port();
        if let Some(previous) = self.servers.lock().insert(port, Arc::new(server)) {
            // The OS released the port since, so the old instance is gone.
            previous.shutdown();
        }
        Ok(port)
    }

    /// The server on `port`.
    #[must_use]
    pub fn get(&self, port: u16) -> Option<Arc<MockServer>> {
        self.servers.lock().get(&port).cloned()
    }

    /// Ports of the running servers.
    #[must_use]
    pub fn ports(&self) -> Vec<u16> {
        self.servers.lock().keys().copied().collect()
    }

    /// Stop the server on `port`. Returns false when there is none.
    pub fn cleanup(&self, port: u16) -> bool {
        let removed = self.servers.lock().remove(&port);
        match removed {
            Some(server) => {
                server.shutdown();
                info!(port, "mock server cleaned up");
                true
            }
            None => {
                debug!(port, "cleanup for unknown port");
                false
            }
        }
    }

    /// Whether the server on `port` was fully matched. False when there is
    /// no server.
    #[must_use]
    pub fn matched(&self, port: u16) -> bool {
        self.get(port).is_some_and(|server| server.matched())
    }

    /// Failures recorded by the server on `port`, or `None` when there is no
    /// server.
    #[must_use]
    pub fn mismatches(&self, port: u16) -> Option<Value> {
        self.get(port).map(|server| server.mismatches_json())
    }

    /// Write the pact served on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`MockServerError::NotFound`] when there is no server and the
    /// errors of [`MockServer::write_pact`].
    pub fn write_pact(&self, port: u16, dir: Option<&Path>) -> MockServerResult<PathBuf> {
        let server = self.get(port).ok_or(MockServerError::NotFound(port))?;
        server.write_pact(dir)
    }

    /// Stop every server.
    pub fn shutdown_all(&self) {
        let servers = std::mem::take(&mut *self.servers.lock());
        for (port, server) in servers {
            server.shutdown();
            debug!(port, "mock server stopped");
        }
    }
}
