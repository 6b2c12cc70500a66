//! Verification driver.

use crate::args::{ReportFormat, VerifierArgs};
use crate::error::{ExitCode, VerifierError, VerifierResult};
use crate::provider::{StateAction, change_state, send_request};
use crate::report::{InteractionResult, PactResult, VerificationReport};
use crate::source::{BrokerAuth, PactSource, load_all};
use pact_common::{HttpConfig, build_http_client};
use pact_matching::match_response;
use pact_models::{Interaction, Pact};
use regex::Regex;
use reqwest::Client;
use std::io::Write;
use tracing::{info, instrument, warn};

/// Interaction filters.
#[derive(Debug, Clone, Default)]
pub struct InteractionFilter {
    description: Option<Regex>,
    state: Option<Regex>,
    no_state: bool,
    consumers: Vec<String>,
}

impl InteractionFilter {
    /// Filters from the verifier arguments.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::InvalidArguments`] for an invalid regex.
    pub fn from_args(args: &VerifierArgs) -> VerifierResult<Self> {
        let compile = |flag: &str, pattern: &Option<String>| {
            pattern
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(Regex::new)
                .transpose()
                .map_err(|err| VerifierError::invalid_arguments(format!("invalid {flag} regex: {err}")))
        };
        Ok(Self {
            description: compile("--filter-description", &args.filter_description)?,
            state: compile("--filter-state", &args.filter_state)?,
            no_state: args.filter_no_state,
            consumers: args.filter_consumer.clone(),
        })
    }

    /// Whether interactions of `pact` are verified at all.
    #[must_use]
    pub fn accepts_consumer(&self, pact: &Pact) -> bool {
        self.consumers.is_empty() || self.consumers.iter().any(|c| *c == pact.consumer.name)
    }

    /// Whether `interaction` is verified.
    #[must_use]
    pub fn accepts(&self, interaction: &Interaction) -> bool {
        if let Some(description) = &self.description {
            if !description.is_match(&interaction.description) {
                return false;
            }
        }
        if self.no_state && !interaction.provider_states.is_empty() {
            return false;
        }
        if let Some(state) = &self.state {
            if !interaction.provider_states.iter().any(|s| state.is_match(&s.name)) {
                return false;
            }
        }
        true
    }
}

/// Replays pacts against a provider.
#[derive(Debug)]
pub struct Verifier {
    args: VerifierArgs,
    filter: InteractionFilter,
    client: Client,
}

impl Verifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::InvalidArguments`] for invalid filters and
    /// [`VerifierError::Client`] when the HTTP client cannot be built.
    pub fn new(args: VerifierArgs) -> VerifierResult<Self> {
        let filter = InteractionFilter::from_args(&args)?;
        let config = HttpConfig::default().with_timeout(args.timeout());
        let client = build_http_client(&config)?;
        Ok(Self { args, filter, client })
    }

    /// Verify every pact source. Interactions are replayed one at a time in
    /// declaration order; a failing interaction never stops the run.
    #[instrument(skip(self), fields(provider = %self.args.provider_base_url))]
    pub async fn run(&self) -> VerificationReport {
        let sources = PactSource::from_args(&self.args);
        let auth = BrokerAuth::from_args(&self.args);
        let loaded = load_all(&sources, &self.client, &auth).await;

        let mut report = VerificationReport::default();
        for entry in loaded {
            let result = match entry.pact {
                Ok(pact) => self.verify_pact(entry.source, &pact).await,
                Err(err) => {
                    warn!(source = %entry.source, error = %format!("{err:#}"), "pact could not be loaded");
                    PactResult {
                        source: entry.source,
                        consumer: None,
                        provider: None,
                        error: Some(format!("{err:#}")),
                        skipped: None,
                        interactions: Vec::new(),
                    }
                }
            };
            report.pacts.push(result);
        }
        info!(
            interactions = report.interaction_count(),
            failures = report.failure_count(),
            "verification finished"
        );
        report
    }

    async fn verify_pact(&self, source: String, pact: &Pact) -> PactResult {
        let mut result = PactResult {
            source,
            consumer: Some(pact.consumer.name.clone()),
            provider: Some(pact.provider.name.clone()),
            error: None,
            skipped: None,
            interactions: Vec::new(),
        };

        if let Some(expected) = &self.args.provider {
            if *expected != pact.provider.name {
                warn!(expected = %expected, actual = %pact.provider.name, "skipping pact for another provider");
                result.skipped = Some(format!("pact is for provider '{}'", pact.provider.name));
                return result;
            }
        }
        if !self.filter.accepts_consumer(pact) {
            result.skipped = Some(format!("consumer '{}' is filtered out", pact.consumer.name));
            return result;
        }

        for interaction in pact.interactions.iter().filter(|i| self.filter.accepts(i)) {
            result.interactions.push(self.verify_interaction(interaction).await);
        }
        result
    }

    async fn verify_interaction(&self, interaction: &Interaction) -> InteractionResult {
        let timeout = self.args.timeout();
        let mut mismatches = Vec::new();

        let mut retryable = false;
        let mut state_ok = true;
        if let Some(setup_url) = &self.args.provider_states_setup_url {
            for state in &interaction.provider_states {
                if let Err(mismatch) =
                    change_state(&self.client, setup_url, state, StateAction::Setup, timeout).await
                {
                    mismatches.push(mismatch);
                    state_ok = false;
                    break;
                }
            }
        }

        if state_ok {
            match send_request(
                &self.client,
                &self.args.provider_base_url,
                &interaction.request,
                &self.args.custom_provider_header,
                timeout,
            )
            .await
            {
                Ok(observed) => mismatches.extend(match_response(&interaction.response, &observed)),
                Err(failure) => {
                    retryable = failure.retryable;
                    mismatches.push(failure.mismatch);
                }
            }
        }

        if self.args.state_change_teardown {
            if let Some(setup_url) = &self.args.provider_states_setup_url {
                for state in interaction.provider_states.iter().rev() {
                    if let Err(mismatch) =
                        change_state(&self.client, setup_url, state, StateAction::Teardown, timeout).await
                    {
                        mismatches.push(mismatch);
                    }
                }
            }
        }

        if mismatches.is_empty() {
            info!(interaction = %interaction.description, "interaction verified");
        } else {
            warn!(interaction = %interaction.description, mismatches = mismatches.len(), "interaction failed");
        }
        InteractionResult {
            description: interaction.description.clone(),
            provider_states: interaction.provider_states.iter().map(|s| s.name.clone()).collect(),
            mismatches,
            retryable,
        }
    }
}

/// Run a verification from newline-delimited argument text, print the
/// report to stdout and return the exit code.
#[must_use]
pub fn verify(blob: &str) -> ExitCode {
    match run_blob(blob) {
        Ok((report, format)) => {
            let rendered = match format {
                ReportFormat::Text => report.to_text(),
                ReportFormat::Json => report.to_json().to_string(),
            };
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{rendered}");
            if report.success() {
                ExitCode::Success
            } else {
                ExitCode::Failures
            }
        }
        Err(err) => {
            warn!(error = %err, "verification could not run");
            let _ = writeln!(std::io::stderr().lock(), "{err}");
            err.exit_code()
        }
    }
}

/// Parse `blob`, run the verification on a fresh runtime and return the
/// report.
///
/// # Errors
///
/// Returns the argument, client and runtime errors of the setup.
pub fn run_blob(blob: &str) -> VerifierResult<(VerificationReport, ReportFormat)> {
    let args = VerifierArgs::parse_blob(blob)?;
    let format = args.format;
    let verifier = Verifier::new(args)?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let report = runtime.block_on(verifier.run());
    Ok((report, format))
}
