//! Verifier tests against wiremock providers.

use pact_matching::MismatchKind;
use pact_verifier::{ExitCode, Verifier, VerifierArgs, verify};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATA_PACT: &str = r#"{
  "consumer": {"name": "C"},
  "provider": {"name": "P"},
  "interactions": [
    {
      "description": "a request for data",
      "providerStates": [{"name": "data exists"}],
      "request": {"method": "GET", "path": "/data"},
      "response": {
        "status": 200,
        "headers": {"Content-Type": "application/json"},
        "body": {"id": 10, "name": "widget"},
        "matchingRules": {"body": {"$.id": {"matchers": [{"match": "integer"}]}}}
      }
    },
    {
      "description": "a health check",
      "request": {"method": "GET", "path": "/health"},
      "response": {"status": 204}
    }
  ],
  "metadata": {"pactSpecification": {"version": "3.0.0"}}
}"#;

fn write_pact(dir: &TempDir) -> PathBuf {
    let file = dir.path().join("C-P.json");
    std::fs::write(&file, DATA_PACT).unwrap();
    file
}

fn blob(base: &str, file: &Path, extra: &[&str]) -> String {
    let mut lines = vec![
        "--provider-base-url".to_string(),
        base.to_string(),
        "--file".to_string(),
        file.display().to_string(),
    ];
    lines.extend(extra.iter().map(ToString::to_string));
    lines.join("\n")
}

async fn mount_provider(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn run(blob: &str) -> pact_verifier::VerificationReport {
    let args = VerifierArgs::parse_blob(blob).unwrap();
    Verifier::new(args).unwrap().run().await
}

#[tokio::test]
async fn test_provider_honouring_the_pact_verifies() {
    let server = MockServer::start().await;
    mount_provider(&server, json!({"id": 42, "name": "widget"})).await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);

    let report = run(&blob(&server.uri(), &file, &[])).await;
    assert!(report.success(), "{}", report.to_text());
    assert_eq!(report.interaction_count(), 2);
    assert_eq!(report.pacts[0].consumer.as_deref(), Some("C"));
}

#[tokio::test]
async fn test_body_mismatch_is_reported() {
    let server = MockServer::start().await;
    mount_provider(&server, json!({"id": "forty-two", "name": "gadget"})).await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);

    let report = run(&blob(&server.uri(), &file, &[])).await;
    assert!(!report.success());
    assert_eq!(report.failure_count(), 1);

    let failed = &report.pacts[0].interactions[0];
    assert_eq!(failed.description, "a request for data");
    let paths: Vec<_> = failed.mismatches.iter().filter_map(|m| m.path.as_deref()).collect();
    assert!(paths.contains(&"$.id"));
    assert!(paths.contains(&"$.name"));
    assert!(!failed.retryable);
    assert!(report.pacts[0].interactions[1].success());
}

#[tokio::test]
async fn test_unreachable_provider_is_a_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let report = run(&blob(&format!("http://127.0.0.1:{port}"), &file, &[])).await;
    assert_eq!(report.failure_count(), 2);
    for interaction in &report.pacts[0].interactions {
        assert_eq!(interaction.mismatches.len(), 1);
        assert_eq!(interaction.mismatches[0].kind, MismatchKind::ProviderUnreachable);
        assert!(interaction.retryable);
    }
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);

    let report = run(&blob(
        &server.uri(),
        &file,
        &["--filter-description", "health", "--request-timeout", "200"],
    ))
    .await;
    assert_eq!(report.interaction_count(), 1);
    let mismatches = &report.pacts[0].interactions[0].mismatches;
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].kind, MismatchKind::RequestTimeout);
    assert!(report.pacts[0].interactions[0].retryable);
}

#[tokio::test]
async fn test_provider_states_are_posted_before_and_after() {
    let server = MockServer::start().await;
    mount_provider(&server, json!({"id": 1, "name": "widget"})).await;
    Mock::given(method("POST"))
        .and(path("/_pact/state"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);
    let setup_url = format!("{}/_pact/state", server.uri());

    let report = run(&blob(
        &server.uri(),
        &file,
        &["--provider-states-setup-url", &setup_url, "--state-change-teardown"],
    ))
    .await;
    assert!(report.success(), "{}", report.to_text());

    let requests = server.received_requests().await.unwrap();
    let changes: Vec<Value> = requests
        .iter()
        .filter(|r| r.url.path() == "/_pact/state")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["state"], "data exists");
    assert_eq!(changes[0]["action"], "setup");
    assert_eq!(changes[1]["action"], "teardown");
}

#[tokio::test]
async fn test_failed_state_change_skips_the_request() {
    let server = MockServer::start().await;
    mount_provider(&server, json!({"id": 1, "name": "widget"})).await;
    Mock::given(method("POST"))
        .and(path("/_pact/state"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);
    let setup_url = format!("{}/_pact/state", server.uri());

    let report = run(&blob(
        &server.uri(),
        &file,
        &["--provider-states-setup-url", &setup_url],
    ))
    .await;
    let failed = &report.pacts[0].interactions[0];
    assert_eq!(failed.mismatches.len(), 1);
    assert_eq!(failed.mismatches[0].kind, MismatchKind::StateChangeFailed);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/data"));
}

#[tokio::test]
async fn test_custom_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(wiremock::matchers::header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);

    let report = run(&blob(
        &server.uri(),
        &file,
        &["--filter-no-state", "--custom-provider-header", "Authorization: Bearer abc"],
    ))
    .await;
    assert_eq!(report.interaction_count(), 1);
    assert!(report.success(), "{}", report.to_text());
}

#[tokio::test]
async fn test_other_provider_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);

    let report = run(&blob("http://127.0.0.1:1", &file, &["--provider", "Q"])).await;
    assert!(report.success());
    assert_eq!(report.interaction_count(), 0);
    assert!(report.pacts[0].skipped.is_some());
}

#[tokio::test]
async fn test_directory_source_and_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    write_pact(&dir);
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    let server = MockServer::start().await;
    mount_provider(&server, json!({"id": 1, "name": "widget"})).await;

    let blob = format!("--provider-base-url\n{}\n--dir\n{}", server.uri(), dir.path().display());
    let report = run(&blob).await;
    assert_eq!(report.pacts.len(), 2);
    assert!(report.pacts[0].success());
    assert!(report.pacts[1].error.is_some());
    assert!(!report.success());
}

#[test]
fn test_verify_exit_codes() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(mount_provider(&server, json!({"id": 1, "name": "widget"})));
    let dir = tempfile::tempdir().unwrap();
    let file = write_pact(&dir);

    assert_eq!(verify(&blob(&server.uri(), &file, &[])), ExitCode::Success);
    assert_eq!(
        verify(&blob(&server.uri(), &file, &["--format", "json"])),
        ExitCode::Success
    );

    let missing = dir.path().join("missing.json");
    assert_eq!(verify(&blob(&server.uri(), &missing, &[])), ExitCode::Failures);
    assert_eq!(verify("--provider-base-url\n::nope"), ExitCode::InvalidArguments);
}

#[tokio::test]
async fn test_unsendable_header_is_a_contract_failure() {
    let server = MockServer::start().await;
    mount_provider(&server, json!({"id": 1, "name": "widget"})).await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("C-P.json");
    let pact = json!({
        "consumer": {"name": "C"},
        "provider": {"name": "P"},
        "interactions": [{
            "description": "a health check with a broken header",
            "request": {"method": "GET", "path": "/health", "headers": {"X-Trace": "a\nb"}},
            "response": {"status": 204}
        }]
    });
    std::fs::write(&file, pact.to_string()).unwrap();

    let report = run(&blob(&server.uri(), &file, &[])).await;
    let interaction = &report.pacts[0].interactions[0];
    assert_eq!(interaction.mismatches.len(), 1);
    assert_eq!(interaction.mismatches[0].kind, MismatchKind::HeaderMismatch);
    assert_eq!(interaction.mismatches[0].key.as_deref(), Some("X-Trace"));
    assert!(!interaction.retryable);
}

#[tokio::test]
async fn test_json_string_request_body_is_sent_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/greeting"))
        .and(header("content-type", "application/json"))
        .and(body_string(r#""hello""#))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("C-P.json");
    let pact = json!({
        "consumer": {"name": "C"},
        "provider": {"name": "P"},
        "interactions": [{
            "description": "a greeting",
            "request": {
                "method": "POST",
                "path": "/greeting",
                "headers": {"Content-Type": "application/json"},
                "body": "hello"
            },
            "response": {"status": 201}
        }]
    });
    std::fs::write(&file, pact.to_string()).unwrap();

    let report = run(&blob(&server.uri(), &file, &[])).await;
    assert!(report.success(), "{}", report.to_text());
}
