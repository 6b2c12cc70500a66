//! Helpers for the cross-crate tests under `tests/`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use pact_models::Pact;
use pact_verifier::{ExitCode, verify};
use reqwest::Method;
use std::path::Path;
use test_utils::EchoProvider;

/// Replay every interaction's expected request against the mock server on
/// `port`, in declaration order.
///
/// # Errors
///
/// Returns the first transport error.
pub async fn replay(pact: &Pact, port: u16) -> Result<(), reqwest::Error> {
    let client = reqwest::Client::new();
    for interaction in &pact.interactions {
        let request = &interaction.request;
        let method = Method::from_bytes(request.method.as_bytes()).unwrap_or(Method::GET);
        let mut builder = client.request(method, format!("http://127.0.0.1:{port}{}", request.path));
        for (name, values) in &request.query {
            for value in values {
                builder = builder.query(&[(name, value)]);
            }
        }
        for (name, values) in &request.headers {
            builder = builder.header(name.as_str(), values.join(", "));
        }
        if let Some(body) = &request.body {
            builder = match body {
                serde_json::Value::String(text) => builder.body(text.clone()),
                json => builder.json(json),
            };
        }
        builder.send().await?;
    }
    Ok(())
}

/// Verify the pact in `file` against `provider`, with extra verifier
/// arguments.
#[must_use]
pub fn verify_file(provider: &EchoProvider, file: &Path, extra: &[&str]) -> ExitCode {
    let mut lines = vec![
        "--provider-base-url".to_string(),
        provider.uri(),
        "--file".to_string(),
        file.display().to_string(),
    ];
    lines.extend(extra.iter().map(ToString::to_string));
    verify(&lines.join("\n"))
}

/// A multi-threaded runtime for driving async helpers from plain tests.
///
/// # Errors
///
/// Returns the runtime build error.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
}
