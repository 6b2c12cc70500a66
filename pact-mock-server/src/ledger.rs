//! Mismatch ledger.
//!
//! Every request a mock server handles leaves exactly one entry, appended
//! before the response for that request is returned. Interactions that never
//! received a request are derived when the ledger is queried.

use pact_matching::{Mismatch, ObservedRequest};
use pact_models::Interaction;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// Outcome of one handled request.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// The request matched an interaction
    RequestMatch {
        /// Index of the interaction in the pact
        interaction: usize,
    },
    /// The request was routed to an interaction but differed from it
    RequestMismatch {
        /// Index of the closest interaction
        interaction: usize,
        /// The request as received
        request: ObservedRequest,
        /// Differences found
        mismatches: Vec<Mismatch>,
    },
    /// No interaction has the request's method and path
    RequestNotFound {
        /// The request as received
        request: ObservedRequest,
    },
}

impl MatchResult {
    /// Whether the entry is a successful match.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::RequestMatch { .. })
    }
}

/// Append-only record of the requests one mock server handled.
#[derive(Debug, Default)]
pub struct MismatchLedger {
    entries: Mutex<Vec<MatchResult>>,
}

impl MismatchLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: MatchResult) {
        self.entries.lock().push(entry);
    }

    /// Append the entry `decide` derives from the set of interactions matched
    /// so far. The ledger stays locked until the entry is appended, so
    /// concurrent requests observe each other's matches. `decide` may return
    /// no entry.
    pub fn record_with<T>(&self, decide: impl FnOnce(&BTreeSet<usize>) -> (Option<MatchResult>, T)) -> T {
        let mut entries = self.entries.lock();
        let (entry, out) = decide(&matched_indices(&entries));
        if let Some(entry) = entry {
            entries.push(entry);
        }
        out
    }

    /// Snapshot of the entries in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<MatchResult> {
        self.entries.lock().clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no request was handled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Indices of interactions that neither matched nor were the closest
    /// candidate of a mismatched request.
    #[must_use]
    pub fn missing(&self, interactions: &[Interaction]) -> Vec<usize> {
        let seen: BTreeSet<usize> = self
            .entries
            .lock()
            .iter()
            .filter_map(|entry| match entry {
                MatchResult::RequestMatch { interaction }
                | MatchResult::RequestMismatch { interaction, .. } => Some(*interaction),
                MatchResult::RequestNotFound { .. } => None,
            })
            .collect();
        (0..interactions.len()).filter(|i| !seen.contains(i)).collect()
    }

    /// True iff every interaction matched at least once and no mismatched or
    /// unexpected request was recorded.
    #[must_use]
    pub fn all_matched(&self, interactions: &[Interaction]) -> bool {
        let entries = self.entries.lock();
        if entries.iter().any(|entry| !entry.is_match()) {
            return false;
        }
        matched_indices(&entries).len() == interactions.len()
    }

    /// The failures as a JSON array: recorded mismatches and unexpected
    /// requests in arrival order, followed by missing interactions in
    /// declaration order.
    #[must_use]
    pub fn mismatches_json(&self, interactions: &[Interaction]) -> Value {
        let mut out: Vec<Value> = self
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                MatchResult::RequestMatch { .. } => None,
                MatchResult::RequestMismatch {
                    interaction,
                    request,
                    mismatches,
                } => Some(json!({
                    "type": "request-mismatch",
                    "method": request.method,
                    "path": request.path,
                    "description": interactions.get(*interaction).map(|i| i.description.as_str()),
                    "mismatches": mismatches,
                })),
                MatchResult::RequestNotFound { request } => Some(json!({
                    "type": "request-not-found",
                    "method": request.method,
                    "path": request.path,
                    "request": request_json(request),
                })),
            })
            .collect();

        for index in self.missing(interactions) {
            let interaction = &interactions[index];
            out.push(json!({
                "type": "missing-request",
                "method": interaction.request.method,
                "path": interaction.request.path,
                "description": interaction.description,
                "request": interaction.request,
            }));
        }
        Value::Array(out)
    }
}

fn matched_indices(entries: &[MatchResult]) -> BTreeSet<usize> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            MatchResult::RequestMatch { interaction } => Some(*interaction),
            _ => None,
        })
        .collect()
}

fn request_json(request: &ObservedRequest) -> Value {
    let mut obj = Map::new();
    obj.insert("method".to_string(), json!(request.method));
    obj.insert("path".to_string(), json!(request.path));
    if !request.query.is_empty() {
        obj.insert("query".to_string(), json!(request.query));
    }
    if !request.headers.is_empty() {
        obj.insert("headers".to_string(), json!(request.headers));
    }
    if let Some(body) = &request.body {
        obj.insert("body".to_string(), json!(body));
    }
    Value::Object(obj)
}
