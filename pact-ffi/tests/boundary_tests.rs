//! Boundary tests through the exported functions.

use pact_ffi::exports::{
    pactffi_cleanup_mock_server, pactffi_create_mock_server, pactffi_free_string, pactffi_given,
    pactffi_mock_server_matched, pactffi_mock_server_mismatches, pactffi_new_interaction,
    pactffi_new_pact, pactffi_with_request,
};
use serde_json::Value;
use std::ffi::{CStr, CString};

const DATA_PACT: &str = r#"{
  "consumer": {"name": "C"},
  "provider": {"name": "P"},
  "interactions": [{
    "description": "a request for data",
    "request": {"method": "GET", "path": "/data"},
    "response": {"status": 200, "headers": {"Content-Type": "application/json"}, "body": {"value": 1}}
  }]
}"#;

fn c(text: &str) -> CString {
    CString::new(text).unwrap()
}

#[allow(unsafe_code)]
fn mismatches(port: i32) -> Option<Value> {
    let ptr = pactffi_mock_server_mismatches(port);
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
    unsafe { pactffi_free_string(ptr) };
    Some(serde_json::from_str(&text).unwrap())
}

#[tokio::test]
async fn test_data_scenario_matches() {
    let port = pactffi_create_mock_server(c(DATA_PACT).as_ptr(), c("127.0.0.1:0").as_ptr());
    assert!(port > 0, "start failed with {port}");

    let body: Value = reqwest::get(format!("http://127.0.0.1:{port}/data"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"], 1);
    assert!(pactffi_mock_server_matched(port));
    assert_eq!(mismatches(port), Some(Value::Array(Vec::new())));

    assert!(pactffi_cleanup_mock_server(port));
    assert!(!pactffi_mock_server_matched(port));
    assert_eq!(mismatches(port), None);
}

#[tokio::test]
async fn test_unexpected_query_parameter() {
    let port = pactffi_create_mock_server(c(DATA_PACT).as_ptr(), c("127.0.0.1:0").as_ptr());
    let response = reqwest::get(format!("http://127.0.0.1:{port}/data?x=1")).await.unwrap();
    assert_eq!(response.status(), 500);

    assert!(!pactffi_mock_server_matched(port));
    let entries = mismatches(port).unwrap();
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["mismatches"][0]["type"], "QueryMismatch");
    pactffi_cleanup_mock_server(port);
}

#[test]
fn test_concurrent_handle_creation() {
    let handles: Vec<_> = (0..8)
        .map(|n| {
            std::thread::spawn(move || {
                let pact = pactffi_new_pact(c(&format!("C{n}")).as_ptr(), c("P").as_ptr());
                let interaction = pactffi_new_interaction(pact, c("a request").as_ptr());
                assert!(pactffi_given(interaction, c("state").as_ptr()));
                assert!(pactffi_with_request(interaction, c("GET").as_ptr(), c("/").as_ptr()));
                pact
            })
        })
        .collect();
    let mut pacts: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap().pact).collect();
    pacts.sort_unstable();
    pacts.dedup();
    assert_eq!(pacts.len(), 8);
    assert!(pacts.iter().all(|&p| p != 0));
}
