//! End-to-end tests: a consumer records a pact against a mock server, the
//! pact file is written, and the provider side verifies it.

use pact_ffi::{InteractionPart, PactContext};
use pact_integration_tests::{replay, runtime, verify_file};
use pact_mock_server::MockServerManager;
use pact_models::Pact;
use pact_verifier::ExitCode;
use proptest::prelude::*;
use serde_json::{Value, json};
use test_utils::{EchoProvider, orders_pact, pact_strategy};

#[test]
fn test_data_scenario_round_trip() {
    let rt = runtime().unwrap();
    let context = PactContext::default();
    let pact = context.new_pact("C", "P");
    let interaction = context.new_interaction(pact, "a request for data");
    assert!(context.given(interaction, "data exists"));
    assert!(context.with_request(interaction, "GET", "/data"));
    assert!(context.response_status(interaction, 200));
    assert!(context.with_body(interaction, InteractionPart::Response, "application/json", r#"{"value": 1}"#));

    let port = context.create_mock_server_for_pact(pact, "127.0.0.1:0").unwrap();
    let body: Value = rt.block_on(async {
        reqwest::get(format!("http://127.0.0.1:{port}/data"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    });
    assert_eq!(body, json!({"value": 1}));
    assert!(context.mock_server_matched(port));
    assert_eq!(context.mock_server_mismatches(port).as_deref(), Some("[]"));

    let dir = tempfile::tempdir().unwrap();
    let file = context.write_pact_file(port, Some(dir.path())).unwrap();
    let first = std::fs::read(&file).unwrap();
    context.write_pact_file(port, Some(dir.path())).unwrap();
    assert_eq!(first, std::fs::read(&file).unwrap());
    assert!(context.cleanup_mock_server(port));

    let written = Pact::from_json(&String::from_utf8(first).unwrap()).unwrap();
    let provider = rt.block_on(EchoProvider::start(&written));
    let setup_url = provider.state_change_url();
    assert_eq!(
        verify_file(&provider, &file, &["--provider-states-setup-url", &setup_url]),
        ExitCode::Success
    );
    let states = rt.block_on(provider.received_states());
    assert_eq!(states.len(), 1);
    assert_eq!(states[0]["state"], "data exists");
}

#[test]
fn test_matchers_survive_the_round_trip() {
    let rt = runtime().unwrap();
    let manager = MockServerManager::default();
    let pact = orders_pact();
    let port = manager.start(pact.clone(), "127.0.0.1:0").unwrap();
    rt.block_on(replay(&pact, port)).unwrap();
    assert!(manager.matched(port), "{:?}", manager.mismatches(port));

    let dir = tempfile::tempdir().unwrap();
    let file = manager.write_pact(port, Some(dir.path())).unwrap();
    assert_eq!(file.file_name().and_then(|n| n.to_str()), Some("OrderWeb-OrderService.json"));
    let written = Pact::from_json(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(written.interactions, pact.interactions);

    let document: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    let rules = &document["interactions"][0]["response"]["matchingRules"]["body"];
    assert_eq!(rules["$.status"]["matchers"][0]["match"], "regex");
    assert_eq!(document["metadata"]["pactSpecification"]["version"], "3.0.0");
    manager.cleanup(port);

    let provider = rt.block_on(EchoProvider::start(&written));
    let setup_url = provider.state_change_url();
    assert_eq!(
        verify_file(&provider, &file, &["--provider-states-setup-url", &setup_url]),
        ExitCode::Success
    );
    let states = rt.block_on(provider.received_states());
    assert_eq!(states[0]["params"]["id"], 42);
}

#[test]
fn test_provider_drift_fails_verification() {
    let rt = runtime().unwrap();
    let mut drifted = orders_pact();
    drifted.interactions[0].response.body = Some(json!({"id": 42, "status": "lost", "items": []}));
    let provider = rt.block_on(EchoProvider::start(&drifted));

    let dir = tempfile::tempdir().unwrap();
    let pact = orders_pact();
    let file = dir.path().join(pact.file_name());
    std::fs::write(&file, pact.to_json_pretty().unwrap()).unwrap();

    assert_eq!(verify_file(&provider, &file, &[]), ExitCode::Failures);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Replaying exactly the defined requests leaves a mock server matched
    /// with no mismatches, and the written pact verifies against a provider
    /// that answers with the expected responses.
    #[test]
    fn prop_replayed_pact_matches_and_verifies(pact in pact_strategy()) {
        let rt = runtime().unwrap();
        let manager = MockServerManager::default();
        let port = manager.start(pact.clone(), "127.0.0.1:0").unwrap();
        rt.block_on(replay(&pact, port)).unwrap();
        prop_assert!(manager.matched(port));
        prop_assert_eq!(manager.mismatches(port), Some(json!([])));

        let dir = tempfile::tempdir().unwrap();
        let file = manager.write_pact(port, Some(dir.path())).unwrap();
        manager.cleanup(port);

        let provider = rt.block_on(EchoProvider::start(&pact));
        prop_assert_eq!(verify_file(&provider, &file, &[]), ExitCode::Success);
    }
}
