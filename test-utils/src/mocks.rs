//! Mock providers for verification tests.

use pact_models::{Interaction, Pact};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the echo provider accepts provider state changes on.
pub const STATE_CHANGE_PATH: &str = "/_pact/state";

/// A provider that answers every interaction's request with exactly the
/// interaction's expected response.
#[derive(Debug)]
pub struct EchoProvider {
    server: MockServer,
}

impl EchoProvider {
    /// Start an echo provider for every interaction in `pact`.
    pub async fn start(pact: &Pact) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATE_CHANGE_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        for interaction in &pact.interactions {
            Mock::given(method(interaction.request.method.as_str()))
                .and(path(interaction.request.path.as_str()))
                .respond_with(response_template(interaction))
                .mount(&server)
                .await;
        }
        Self { server }
    }

    /// Base URL of the provider.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// URL state changes are posted to.
    #[must_use]
    pub fn state_change_url(&self) -> String {
        format!("{}{STATE_CHANGE_PATH}", self.server.uri())
    }

    /// Provider states received so far, in order.
    pub async fn received_states(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == STATE_CHANGE_PATH)
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }
}

fn response_template(interaction: &Interaction) -> ResponseTemplate {
    let response = &interaction.response;
    let mut template = ResponseTemplate::new(response.status);
    for (name, values) in &response.headers {
        template = template.insert_header(name.as_str(), values.join(", ").as_str());
    }
    if response.content_type().is_none() && response.body.as_ref().is_some_and(|b| !b.is_string()) {
        template = template.insert_header("Content-Type", "application/json");
    }
    match response.body_text() {
        None => template,
        Some(body) => template.set_body_bytes(body.into_bytes()),
    }
}
