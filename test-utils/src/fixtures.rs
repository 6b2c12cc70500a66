//! Test fixtures with sample pacts.

use pact_models::{InteractionPart, ModelRegistry, Pact};

/// The consumer `C` / provider `P` pact with one interaction,
/// `GET /data` answered `200 {"value": 1}`.
pub const DATA_PACT_JSON: &str = r#"{
  "consumer": {"name": "C"},
  "provider": {"name": "P"},
  "interactions": [
    {
      "description": "a request for data",
      "request": {"method": "GET", "path": "/data"},
      "response": {
        "status": 200,
        "headers": {"Content-Type": "application/json"},
        "body": {"value": 1}
      }
    }
  ],
  "metadata": {"pactSpecification": {"version": "3.0.0"}}
}"#;

/// The data pact, built through the handle API.
#[must_use]
pub fn data_pact() -> Pact {
    let mut registry = ModelRegistry::new();
    let pact = registry.new_pact("C", "P");
    let interaction = registry.new_interaction(pact, "a request for data");
    registry.with_request(interaction, "GET", "/data");
    registry.response_status(interaction, 200);
    registry.with_body(interaction, InteractionPart::Response, "application/json", r#"{"value": 1}"#);
    registry.remove_pact(pact).unwrap_or_else(|| Pact::new("C", "P"))
}

/// A pact whose interactions carry matchers: a regex on a body field, a
/// type-matched array, a provider state with parameters and a query
/// parameter.
#[must_use]
pub fn orders_pact() -> Pact {
    let mut registry = ModelRegistry::new();
    let pact = registry.new_pact("OrderWeb", "OrderService");

    let order = registry.new_interaction(pact, "a request for an order");
    registry.given_with_param(order, "an order exists", "id", "42");
    registry.with_request(order, "GET", "/orders/42");
    registry.with_header(order, InteractionPart::Request, "Accept", 0, "application/json");
    registry.response_status(order, 200);
    registry.with_body(
        order,
        InteractionPart::Response,
        "application/json",
        r#"{
            "id": {"pact:matcher:type": "integer", "value": 42},
            "status": {"pact:matcher:type": "regex", "regex": "open|closed", "value": "open"},
            "items": {"pact:matcher:type": "type", "min": 1, "value": [{"sku": "A-1", "quantity": 2}]}
        }"#,
    );

    let search = registry.new_interaction(pact, "a search for open orders");
    registry.with_request(search, "GET", "/orders");
    registry.with_query_parameter(search, "status", 0, "open");
    registry.response_status(search, 200);
    registry.with_body(search, InteractionPart::Response, "application/json", r"[]");

    registry.remove_pact(pact).unwrap_or_else(|| Pact::new("OrderWeb", "OrderService"))
}
