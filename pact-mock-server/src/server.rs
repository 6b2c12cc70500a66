//! A single mock server instance.
//!
//! Each instance owns a listener and a tokio runtime on a dedicated thread.
//! Requests are routed to an interaction by method and path, compared with
//! the matching engine, recorded in the instance's ledger and answered with
//! the interaction's response.

use crate::config::MockServerConfig;
use crate::error::{MockServerError, MockServerResult};
use crate::ledger::{MatchResult, MismatchLedger};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::Response;
use pact_matching::{Mismatch, ObservedRequest, match_request, route_match};
use pact_models::{DEFAULT_SPECIFICATION_VERSION, Interaction, MultiMap, Pact, parse_query_string};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr, TcpListener as StdTcpListener, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct ServerState {
    pact: Arc<Pact>,
    ledger: Arc<MismatchLedger>,
    active: Arc<AtomicBool>,
    config: Arc<MockServerConfig>,
}

/// A running mock provider for one pact.
pub struct MockServer {
    address: SocketAddr,
    pact: Arc<Pact>,
    ledger: Arc<MismatchLedger>,
    active: Arc<AtomicBool>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("address", &self.address)
            .field("consumer", &self.pact.consumer.name)
            .field("provider", &self.pact.provider.name)
            .finish_non_exhaustive()
    }
}

/// Resolve a bind address. A bare host binds an OS-assigned port.
///
/// # Errors
///
/// Returns [`MockServerError::InvalidAddress`] when the text does not
/// resolve to a socket address.
pub fn parse_bind_address(addr: &str) -> MockServerResult<SocketAddr> {
    let addr = addr.trim();
    if let Ok(parsed) = addr.parse::<SocketAddr>() {
        return Ok(parsed);
    }
    if let Ok(ip) = addr.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, 0));
    }
    let with_port = if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{addr}:0")
    };
    with_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| MockServerError::InvalidAddress(addr.to_string()))
}

impl MockServer {
    /// Bind `addr` and start serving `pact`.
    ///
    /// Returns once the listener accepts connections.
    ///
    /// # Errors
    ///
    /// Returns [`MockServerError::InvalidAddress`], [`MockServerError::Bind`]
    /// or [`MockServerError::Runtime`] when the server cannot start.
    pub fn start(pact: Pact, addr: &str, config: &MockServerConfig) -> MockServerResult<Self> {
        let requested = parse_bind_address(addr)?;
        let listener = StdTcpListener::bind(requested).map_err(|source| MockServerError::Bind {
            addr: requested,
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|err| MockServerError::runtime(format!("listener nonblocking failed: {err}")))?;
        let address = listener
            .local_addr()
            .map_err(|err| MockServerError::runtime(format!("listener local addr failed: {err}")))?;

        let pact = Arc::new(pact);
        let ledger = Arc::new(MismatchLedger::new());
        let active = Arc::new(AtomicBool::new(true));
        let state = ServerState {
            pact: Arc::clone(&pact),
            ledger: Arc::clone(&ledger),
            active: Arc::clone(&active),
            config: Arc::new(config.clone()),
        };
        let app = Router::new().fallback(handle_request).with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);
        let worker_threads = config.worker_threads.max(1);
        thread::Builder::new()
            .name(format!("pact-mock-{}", address.port()))
            .spawn(move || {
                let runtime = match Builder::new_multi_thread()
                    .worker_threads(worker_threads)
                    .thread_name("pact-mock-worker")
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = ready_tx.send(Err(format!("runtime build failed: {err}")));
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(err) => {
                            let _ = ready_tx.send(Err(format!("listener registration failed: {err}")));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                        let _ = shutdown_rx.await;
                    });
                    if let Err(err) = server.await {
                        warn!(error = %err, "mock server stopped with an error");
                    }
                });
            })
            .map_err(|err| MockServerError::runtime(format!("thread spawn failed: {err}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => return Err(MockServerError::Runtime(msg)),
            Err(_) => return Err(MockServerError::runtime("mock server thread exited during start")),
        }

        info!(
            port = address.port(),
            consumer = %pact.consumer.name,
            provider = %pact.provider.name,
            interactions = pact.interactions.len(),
            "mock server started"
        );
        Ok(Self {
            address,
            pact,
            ledger,
            active,
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }

    /// The bound port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.address.port()
    }

    /// The bound address.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    /// Base URL of the server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// The pact being served.
    #[must_use]
    pub fn pact(&self) -> &Pact {
        &self.pact
    }

    /// The request ledger.
    #[must_use]
    pub fn ledger(&self) -> &MismatchLedger {
        &self.ledger
    }

    /// Whether every interaction was exercised and nothing else was received.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.ledger.all_matched(&self.pact.interactions)
    }

    /// Recorded failures as a JSON array.
    #[must_use]
    pub fn mismatches_json(&self) -> Value {
        self.ledger.mismatches_json(&self.pact.interactions)
    }

    /// Write the served pact to `<dir>/<consumer>-<provider>.json`,
    /// replacing any previous file. `None` writes to the current directory.
    /// The document is labelled with the version whose layout it is written in.
    ///
    /// # Errors
    ///
    /// Returns [`MockServerError::Write`] when the directory or file cannot be
    /// written.
    pub fn write_pact(&self, dir: Option<&Path>) -> MockServerResult<PathBuf> {
        let mut pact = (*self.pact).clone();
        pact.metadata.pact_specification.version = DEFAULT_SPECIFICATION_VERSION.to_string();

        let dir = dir.unwrap_or_else(|| Path::new("."));
        let path = dir.join(pact.file_name());
        // Going through `Value` sorts object keys.
        let document = serde_json::to_value(&pact)?;
        let mut text = serde_json::to_string_pretty(&document)?;
        text.push('\n');

        std::fs::create_dir_all(dir)
            .and_then(|()| std::fs::write(&path, text))
            .map_err(|source| MockServerError::Write {
                path: path.clone(),
                source,
            })?;
        info!(port = self.port(), path = %path.display(), "pact file written");
        Ok(path)
    }

    /// Stop accepting connections. Connections still open are answered
    /// `410 Gone`.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
            debug!(port = self.port(), "mock server shut down");
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Routing {
    Matched(usize),
    Mismatched(usize, Vec<Mismatch>),
    NotFound,
}

/// Pick the interaction for a request. Among full matches an interaction
/// not yet in `matched` wins, then literal path before path rule, then
/// declaration order. Without a full match the routed interaction with the
/// fewest mismatches is chosen.
fn route(interactions: &[Interaction], request: &ObservedRequest, matched: &BTreeSet<usize>) -> Routing {
    let mut candidates: Vec<(usize, _, Vec<Mismatch>)> = interactions
        .iter()
        .enumerate()
        .filter_map(|(index, interaction)| {
            route_match(&interaction.request, &request.method, &request.path)
                .map(|kind| (index, kind, match_request(&interaction.request, request)))
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.2.len()
            .cmp(&b.2.len())
            .then_with(|| matched.contains(&a.0).cmp(&matched.contains(&b.0)))
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    match candidates.into_iter().next() {
        None => Routing::NotFound,
        Some((index, _, mismatches)) if mismatches.is_empty() => Routing::Matched(index),
        Some((index, _, mismatches)) => Routing::Mismatched(index, mismatches),
    }
}

fn to_multimap(headers: &HeaderMap) -> MultiMap {
    let mut out = MultiMap::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

async fn handle_request(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.active.load(Ordering::SeqCst) {
        return json_response(
            StatusCode::GONE,
            &json!({"error": "mock server has been shut down"}),
        );
    }

    let request = ObservedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: parse_query_string(uri.query().unwrap_or_default()),
        headers: to_multimap(&headers),
        body: (!body.is_empty()).then(|| String::from_utf8_lossy(&body).into_owned()),
    };

    let preflight = state.config.cors_preflight && method == Method::OPTIONS;
    let routing = state.ledger.record_with(|matched| {
        let routing = route(&state.pact.interactions, &request, matched);
        let entry = match &routing {
            Routing::Matched(index) => Some(MatchResult::RequestMatch { interaction: *index }),
            Routing::Mismatched(index, mismatches) => Some(MatchResult::RequestMismatch {
                interaction: *index,
                request: request.clone(),
                mismatches: mismatches.clone(),
            }),
            Routing::NotFound => (!preflight)
                .then(|| MatchResult::RequestNotFound { request: request.clone() }),
        };
        (entry, routing)
    });

    match routing {
        Routing::Matched(index) => {
            let interaction = &state.pact.interactions[index];
            debug!(method = %request.method, path = %request.path, interaction = %interaction.description, "request matched");
            interaction_response(interaction)
        }
        Routing::Mismatched(index, mismatches) => {
            let interaction = &state.pact.interactions[index];
            warn!(
                method = %request.method,
                path = %request.path,
                interaction = %interaction.description,
                mismatches = mismatches.len(),
                "request mismatch"
            );
            let body = json!({
                "error": format!("Request-Mismatch : {} {}", request.method, request.path),
                "interaction": interaction.description,
                "mismatches": mismatches,
            });
            json_response(StatusCode::INTERNAL_SERVER_ERROR, &body)
        }
        Routing::NotFound if preflight => {
            debug!(path = %request.path, "answering CORS pre-flight");
            cors_preflight(&headers)
        }
        Routing::NotFound => {
            warn!(method = %request.method, path = %request.path, "unexpected request");
            let body = json!({
                "error": format!("Unexpected-Request : {} {}", request.method, request.path),
            });
            json_response(StatusCode::INTERNAL_SERVER_ERROR, &body)
        }
    }
}

fn interaction_response(interaction: &Interaction) -> Response {
    let expected = &interaction.response;
    let status = StatusCode::from_u16(expected.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, values) in &expected.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!(header = %name, "skipping invalid response header name");
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(name.clone(), value);
                }
                Err(_) => warn!(header = %name, "skipping invalid response header value"),
            }
        }
    }

    if matches!(&expected.body, Some(body) if !body.is_string()) && !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    let body = expected.body_text().unwrap_or_default().into_bytes();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn json_response(status: StatusCode, body: &Value) -> Response {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn cors_preflight(request_headers: &HeaderMap) -> Response {
    let origin = request_headers
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));
    let allow_headers = request_headers
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
    headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_models::{MatchingRule, Request};

    fn interaction(description: &str, method: &str, path: &str) -> Interaction {
        let mut interaction = Interaction::new(description);
        interaction.request = Request {
            method: method.to_string(),
            path: path.to_string(),
            ..Request::default()
        };
        interaction
    }

    fn observed(method: &str, path: &str) -> ObservedRequest {
        ObservedRequest {
            method: method.to_string(),
            path: path.to_string(),
            ..ObservedRequest::default()
        }
    }

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(parse_bind_address("127.0.0.1:0").unwrap().port(), 0);
        assert_eq!(parse_bind_address("127.0.0.1").unwrap().port(), 0);
        assert_eq!(parse_bind_address("[::1]:8080").unwrap().port(), 8080);
        assert!(parse_bind_address("not an address").is_err());
        assert!(parse_bind_address("127.0.0.1:notaport").is_err());
    }

    #[test]
    fn test_route_not_found() {
        let interactions = vec![interaction("a", "GET", "/a")];
        assert!(matches!(route(&interactions, &observed("GET", "/b"), &BTreeSet::new()), Routing::NotFound));
        assert!(matches!(route(&interactions, &observed("POST", "/a"), &BTreeSet::new()), Routing::NotFound));
    }

    #[test]
    fn test_route_prefers_full_match_then_literal() {
        let mut by_rule = interaction("rule", "GET", "/items/1");
        by_rule
            .request
            .matching_rules
            .add_path_rule(MatchingRule::Regex("/items/\\d+".to_string()));
        let literal = interaction("literal", "GET", "/items/2");
        let interactions = vec![by_rule, literal];

        assert!(matches!(route(&interactions, &observed("GET", "/items/2"), &BTreeSet::new()), Routing::Matched(1)));
        assert!(matches!(route(&interactions, &observed("GET", "/items/7"), &BTreeSet::new()), Routing::Matched(0)));
    }

    #[test]
    fn test_route_prefers_unmatched_duplicate() {
        let interactions = vec![
            interaction("get user when user exists", "GET", "/user"),
            interaction("get user when user is banned", "GET", "/user"),
        ];
        let request = observed("GET", "/user");
        assert!(matches!(route(&interactions, &request, &BTreeSet::new()), Routing::Matched(0)));
        assert!(matches!(route(&interactions, &request, &BTreeSet::from([0])), Routing::Matched(1)));
        assert!(matches!(route(&interactions, &request, &BTreeSet::from([0, 1])), Routing::Matched(0)));
    }

    #[test]
    fn test_route_closest_mismatch() {
        let mut with_query = interaction("with query", "GET", "/data");
        with_query
            .request
            .query
            .insert("a".to_string(), vec!["1".to_string()]);
        let interactions = vec![with_query];
        let mut request = observed("GET", "/data");
        request.query.insert("b".to_string(), vec!["2".to_string()]);

        match route(&interactions, &request, &BTreeSet::new()) {
            Routing::Mismatched(0, mismatches) => assert_eq!(mismatches.len(), 2),
            _ => panic!("expected a mismatch against interaction 0"),
        }
    }

    #[test]
    fn test_interaction_response_defaults_json_content_type() {
        let mut interaction = interaction("a", "GET", "/a");
        interaction.response.status = 201;
        interaction.response.body = Some(json!({"value": 1}));
        let response = interaction_response(&interaction);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
