//! Verification reports.

use pact_matching::Mismatch;
use serde::Serialize;
use std::fmt::Write as _;

/// Outcome of one interaction.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionResult {
    /// Interaction description
    pub description: String,
    /// Provider state names in declaration order
    #[serde(rename = "providerStates")]
    pub provider_states: Vec<String>,
    /// Failures; empty when the interaction verified
    pub mismatches: Vec<Mismatch>,
    /// Whether the request failed on a transient provider error, so running
    /// the verification again could succeed
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl InteractionResult {
    /// Whether the interaction verified.
    #[must_use]
    pub fn success(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Outcome of one pact source.
#[derive(Debug, Clone, Serialize)]
pub struct PactResult {
    /// Textual form of the source
    pub source: String,
    /// Consumer name, when the pact loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<String>,
    /// Provider name, when the pact loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Why the pact could not be loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why the pact was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Interaction outcomes in declaration order
    pub interactions: Vec<InteractionResult>,
}

impl PactResult {
    /// Whether the pact loaded and every verified interaction passed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.error.is_none() && self.interactions.iter().all(InteractionResult::success)
    }
}

/// The full verification report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    /// Per-source outcomes
    pub pacts: Vec<PactResult>,
}

impl VerificationReport {
    /// Whether every pact verified.
    #[must_use]
    pub fn success(&self) -> bool {
        self.pacts.iter().all(PactResult::success)
    }

    /// Number of verified interactions.
    #[must_use]
    pub fn interaction_count(&self) -> usize {
        self.pacts.iter().map(|p| p.interactions.len()).sum()
    }

    /// Number of failed interactions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.pacts
            .iter()
            .flat_map(|p| &p.interactions)
            .filter(|i| !i.success())
            .count()
    }

    /// The JSON form of the report.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": self.success(),
            "interactions": self.interaction_count(),
            "failures": self.failure_count(),
            "pacts": self.pacts,
        })
    }

    /// The human-readable form of the report.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for pact in &self.pacts {
            match (&pact.consumer, &pact.provider) {
                (Some(consumer), Some(provider)) => {
                    let _ = writeln!(
                        out,
                        "Verifying a pact between {consumer} and {provider} ({})",
                        pact.source
                    );
                }
                _ => {
                    let _ = writeln!(out, "Verifying {}", pact.source);
                }
            }
            if let Some(error) = &pact.error {
                let _ = writeln!(out, "  ERROR: {error}");
                continue;
            }
            if let Some(reason) = &pact.skipped {
                let _ = writeln!(out, "  SKIPPED: {reason}");
                continue;
            }
            for interaction in &pact.interactions {
                let _ = writeln!(out, "  {}", interaction.description);
                for state in &interaction.provider_states {
                    let _ = writeln!(out, "    Given {state}");
                }
                if interaction.success() {
                    let _ = writeln!(out, "    OK");
                } else {
                    let retry = if interaction.retryable { " (provider unavailable, retryable)" } else { "" };
                    let _ = writeln!(out, "    FAILED{retry}");
                    for (n, mismatch) in interaction.mismatches.iter().enumerate() {
                        let _ = writeln!(out, "      {}) {mismatch}", n + 1);
                    }
                }
            }
        }
        let _ = writeln!(
            out,
            "\n{} interaction(s), {} failure(s)",
            self.interaction_count(),
            self.failure_count()
        );
        out
    }
}
