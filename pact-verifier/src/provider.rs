//! Provider calls: state changes and replayed requests.

use pact_matching::{Mismatch, MismatchKind, ObservedResponse};
use pact_models::{MultiMap, ProviderState, Request};
use pact_common::PactError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Whether a state change sets a state up or tears it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    /// Before the request
    Setup,
    /// After the request
    Teardown,
}

impl StateAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Teardown => "teardown",
        }
    }
}

/// Map a classified transport error to a mismatch kind distinct from
/// content mismatches.
#[must_use]
pub fn transport_mismatch(err: &PactError, target: &str) -> Mismatch {
    match err {
        PactError::Timeout(_) => {
            Mismatch::new(MismatchKind::RequestTimeout, format!("Request to {target} timed out"))
        }
        PactError::Unavailable(_) | PactError::Http(_) => Mismatch::new(
            MismatchKind::ProviderUnreachable,
            format!("Request to {target} failed: {err}"),
        ),
    }
}

/// A replayed request that produced no response to compare.
#[derive(Debug, Clone)]
pub struct ReplayFailure {
    /// The failure as reported
    pub mismatch: Mismatch,
    /// Whether repeating the request could succeed
    pub retryable: bool,
}

impl ReplayFailure {
    fn contract(mismatch: Mismatch) -> Self {
        Self {
            mismatch,
            retryable: false,
        }
    }

    fn transport(err: reqwest::Error, target: &str) -> Self {
        let err = PactError::from_transport(err, target);
        Self {
            mismatch: transport_mismatch(&err, target),
            retryable: err.is_retryable(),
        }
    }
}

/// Build the headers of a replayed request. Custom headers replace
/// interaction headers of the same name.
///
/// # Errors
///
/// Returns a [`MismatchKind::HeaderMismatch`] mismatch keyed by the header
/// when a name or value cannot be sent over HTTP.
pub fn request_headers(expected: &Request, custom_headers: &[(String, String)]) -> Result<HeaderMap, Mismatch> {
    let interaction = expected
        .headers
        .iter()
        .filter(|(name, _)| !custom_headers.iter().any(|(custom, _)| custom.eq_ignore_ascii_case(name)))
        .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value.as_str())));
    let custom = custom_headers.iter().map(|(name, value)| (name.as_str(), value.as_str()));

    let mut headers = HeaderMap::new();
    for (name, value) in interaction.chain(custom) {
        let invalid = |part: &str| {
            Mismatch::new(
                MismatchKind::HeaderMismatch,
                format!("Header '{name}' has a {part} that cannot be sent over HTTP"),
            )
            .for_key(name)
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid("name"))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid("value"))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

/// Post one provider state change.
///
/// # Errors
///
/// Returns a [`MismatchKind::StateChangeFailed`] mismatch when the call
/// fails or answers with a non-success status.
pub async fn change_state(
    client: &Client,
    setup_url: &Url,
    state: &ProviderState,
    action: StateAction,
    timeout: Duration,
) -> Result<(), Mismatch> {
    let body = json!({
        "state": state.name,
        "params": state.params,
        "action": action.as_str(),
    });
    debug!(state = %state.name, action = action.as_str(), "provider state change");

    let failed = |detail: String| {
        Mismatch::new(
            MismatchKind::StateChangeFailed,
            format!("Provider state {} for '{}' failed: {detail}", action.as_str(), state.name),
        )
        .for_key(state.name.clone())
    };

    let response = client
        .post(setup_url.clone())
        .timeout(timeout)
        .json(&body)
        .send()
        .await
        .map_err(|err| failed(err.to_string()))?;
    if response.status().is_success() {
        Ok(())
    } else {
        warn!(state = %state.name, status = %response.status(), "provider state change rejected");
        Err(failed(format!("status {}", response.status())))
    }
}

/// Build the provider URL for an expected request.
///
/// The request path is appended to the base URL's path so providers mounted
/// under a prefix can be verified.
#[must_use]
pub fn request_url(base: &Url, path: &str, query: &MultiMap) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, values) in query {
            for value in values {
                pairs.append_pair(name, value);
            }
        }
    }
    url
}

/// Replay an expected request against the provider.
///
/// # Errors
///
/// Returns a [`ReplayFailure`] when the interaction's method or headers
/// cannot be sent, or when the provider cannot be reached or does not answer
/// in time.
pub async fn send_request(
    client: &Client,
    base: &Url,
    expected: &Request,
    custom_headers: &[(String, String)],
    timeout: Duration,
) -> Result<ObservedResponse, ReplayFailure> {
    let url = request_url(base, &expected.path, &expected.query);
    let target = format!("{} {}", expected.method, url);
    let method = Method::from_bytes(expected.method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        ReplayFailure::contract(Mismatch::new(
            MismatchKind::MethodMismatch,
            format!("Interaction method '{}' is not a valid HTTP method", expected.method),
        ))
    })?;
    let headers = request_headers(expected, custom_headers).map_err(ReplayFailure::contract)?;

    let mut builder = client.request(method, url.clone()).timeout(timeout).headers(headers);
    if let Some(body) = expected.body_text() {
        if expected.content_type().is_none() && expected.body.as_ref().is_some_and(|b| !b.is_string()) {
            builder = builder.header("Content-Type", "application/json");
        }
        builder = builder.body(body);
    }

    debug!(request = %target, "replaying request");
    let response = builder.send().await.map_err(|err| ReplayFailure::transport(err, &target))?;

    let status = response.status().as_u16();
    let mut headers = MultiMap::new();
    for (name, value) in response.headers() {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    let body = response.text().await.map_err(|err| ReplayFailure::transport(err, &target))?;

    Ok(ObservedResponse {
        status,
        headers,
        body: (!body.is_empty()).then_some(body),
    })
}
