//! Mock server configuration.

/// Configuration shared by the mock servers a manager starts.
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    /// Worker threads per mock server runtime (default: 2)
    pub worker_threads: usize,
    /// Answer unmatched `OPTIONS` requests as CORS pre-flights (default: false)
    pub cors_preflight: bool,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            cors_preflight: false,
        }
    }
}

impl MockServerConfig {
    /// Set the worker thread count; zero is raised to one.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Answer CORS pre-flight requests.
    #[must_use]
    pub const fn with_cors_preflight(mut self) -> Self {
        self.cors_preflight = true;
        self
    }
}
