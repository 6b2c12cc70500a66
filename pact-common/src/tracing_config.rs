//! Tracing subscriber initialisation.
//!
//! The log filter is read from a caller-chosen environment variable so host
//! test frameworks can pass their own (`LOG_LEVEL` by default). `LOG_FORMAT=json`
//! switches to JSON lines.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default environment variable holding the log filter.
pub const DEFAULT_LOG_ENV_VAR: &str = "LOG_LEVEL";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV_VAR: &str = "LOG_FORMAT";

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Environment variable the filter is read from
    pub env_var: String,
    /// Log level filter used when the variable is unset or invalid
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            env_var: DEFAULT_LOG_ENV_VAR.to_string(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Read the filter from a custom environment variable.
    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Create config with custom fallback log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Enable JSON output when `format` is `json` (any case).
    #[must_use]
    pub fn with_format(mut self, format: Option<&str>) -> Self {
        self.json_output = format.is_some_and(|format| format.trim().eq_ignore_ascii_case("json"));
        self
    }

    /// Take the output format from [`LOG_FORMAT_ENV_VAR`].
    #[must_use]
    pub fn with_format_from_env(self) -> Self {
        let format = std::env::var(LOG_FORMAT_ENV_VAR).ok();
        self.with_format(format.as_deref())
    }

    /// Resolve the filter from the environment, falling back to `log_level`.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(&self.env_var)
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing with the given configuration.
///
/// Returns `false` when a global subscriber was already installed, which
/// makes repeated initialisation a no-op.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let filter = config.filter();

    let result = if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    result.is_ok()
}
