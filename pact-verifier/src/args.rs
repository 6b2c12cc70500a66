//! Verifier arguments.
//!
//! Arguments arrive as newline-delimited text, one argument per line, exactly
//! as they would be passed on a command line.

use crate::error::{VerifierError, VerifierResult};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Verifier options.
#[derive(Parser, Debug, Clone)]
#[command(name = "pact-verifier", disable_help_subcommand = true)]
pub struct VerifierArgs {
    /// Pact files or URLs
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Pact file to verify (repeatable)
    #[arg(long = "file", short = 'f', value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Directory of pact files to verify (repeatable)
    #[arg(long = "dir", short = 'd', value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// URL of a pact to verify (repeatable)
    #[arg(long = "url", short = 'u', value_name = "URL")]
    pub urls: Vec<String>,

    /// Base URL of the provider under test
    #[arg(long, value_name = "URL")]
    pub provider_base_url: Url,

    /// URL provider state changes are posted to
    #[arg(long, value_name = "URL")]
    pub provider_states_setup_url: Option<Url>,

    /// Also post a teardown state change after each interaction
    #[arg(long, action = ArgAction::SetTrue)]
    pub state_change_teardown: bool,

    /// Only verify interactions whose description matches this regex
    #[arg(long, value_name = "REGEX", env = "PACT_DESCRIPTION")]
    pub filter_description: Option<String>,

    /// Only verify interactions with a provider state matching this regex
    #[arg(long, value_name = "REGEX", env = "PACT_PROVIDER_STATE")]
    pub filter_state: Option<String>,

    /// Only verify interactions without provider states
    #[arg(long, action = ArgAction::SetTrue, env = "PACT_PROVIDER_NO_STATE")]
    pub filter_no_state: bool,

    /// Only verify pacts from these consumers (repeatable)
    #[arg(long, value_name = "CONSUMER")]
    pub filter_consumer: Vec<String>,

    /// Header added to every provider request, as `Name: value` (repeatable)
    #[arg(long, value_name = "HEADER", value_parser = parse_header)]
    pub custom_provider_header: Vec<(String, String)>,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 10_000)]
    pub request_timeout: u64,

    /// Username for pact URLs
    #[arg(long, value_name = "USER", env = "PACT_BROKER_USERNAME")]
    pub broker_username: Option<String>,

    /// Password for pact URLs
    #[arg(long, value_name = "PASSWORD", env = "PACT_BROKER_PASSWORD", hide_env_values = true)]
    pub broker_password: Option<String>,

    /// Bearer token for pact URLs
    #[arg(long, value_name = "TOKEN", env = "PACT_BROKER_TOKEN", hide_env_values = true)]
    pub broker_token: Option<String>,

    /// Expected provider name; pacts for other providers are skipped
    #[arg(long = "provider", alias = "provider-name", value_name = "NAME")]
    pub provider: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl VerifierArgs {
    /// Parse newline-delimited argument text.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::InvalidArguments`] for unknown options or
    /// invalid values, and [`VerifierError::NoSources`] when no pact source
    /// is given.
    pub fn parse_blob(blob: &str) -> VerifierResult<Self> {
        let args = blob
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty());
        let parsed = Self::try_parse_from(std::iter::once("pact-verifier").chain(args))?;
        if !parsed.has_sources() {
            return Err(VerifierError::NoSources);
        }
        Ok(parsed)
    }

    /// Whether at least one pact source is configured.
    #[must_use]
    pub fn has_sources(&self) -> bool {
        !(self.sources.is_empty() && self.files.is_empty() && self.dirs.is_empty() && self.urls.is_empty())
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}
