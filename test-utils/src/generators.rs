//! Shared proptest generators for the pact crates.

use pact_models::{Interaction, Pact, ProviderState};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Generate consumer and provider names.
pub fn participant_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z]{2,12}"
}

/// Generate HTTP methods used by interactions.
pub fn method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("DELETE".to_string()),
        Just("PATCH".to_string()),
    ]
}

/// Generate absolute request paths.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,7}", 1..4).prop_map(|segments| format!("/{}", segments.join("/")))
}

/// Generate JSON scalars.
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

/// Generate JSON bodies up to two levels deep.
pub fn json_body_strategy() -> impl Strategy<Value = Value> {
    json_scalar_strategy().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate JSON object bodies.
pub fn json_object_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,8}", json_body_strategy(), 1..5)
        .prop_map(|fields| Value::Object(fields.into_iter().collect()))
}

/// Generate interactions without matching rules.
pub fn interaction_strategy() -> impl Strategy<Value = Interaction> {
    (
        "[a-z][a-z ]{4,24}",
        prop::option::of("[a-z][a-z ]{2,16}"),
        method_strategy(),
        path_strategy(),
        prop_oneof![Just(200u16), Just(201), Just(202), Just(404)],
        prop::option::of(json_object_strategy()),
    )
        .prop_map(|(description, state, method, path, status, body)| {
            let mut interaction = Interaction::new(description);
            interaction.provider_states = state.into_iter().map(ProviderState::new).collect();
            interaction.request.method = method;
            interaction.request.path = path;
            interaction.response.status = status;
            if body.is_some() {
                interaction
                    .response
                    .headers
                    .insert("Content-Type".to_string(), vec!["application/json".to_string()]);
            }
            interaction.response.body = body;
            interaction
        })
}

/// Generate pacts that may define the same method and path more than once.
///
/// Interactions sharing a route also share the first one's response, so a
/// provider answering by route satisfies all of them. Descriptions are made
/// distinct.
pub fn pact_strategy() -> impl Strategy<Value = Pact> {
    (
        participant_name_strategy(),
        participant_name_strategy(),
        prop::collection::vec(interaction_strategy(), 1..5),
        prop::collection::vec(any::<prop::sample::Index>(), 0..3),
    )
        .prop_map(|(consumer, provider, mut interactions, repeats)| {
            let mut pact = Pact::new(consumer, provider);
            let routes: Vec<(String, String)> = interactions
                .iter()
                .map(|i| (i.request.method.clone(), i.request.path.clone()))
                .collect();
            for (n, index) in repeats.into_iter().enumerate() {
                let (method, path) = index.get(&routes).clone();
                let mut repeat = Interaction::new(format!("repeat {n}"));
                repeat.provider_states = vec![ProviderState::new(format!("variant {n}"))];
                repeat.request.method = method;
                repeat.request.path = path;
                interactions.push(repeat);
            }
            for (n, mut interaction) in interactions.into_iter().enumerate() {
                interaction.description = format!("{} #{n}", interaction.description);
                let first = pact.interactions.iter().find(|existing| {
                    existing.request.method == interaction.request.method
                        && existing.request.path == interaction.request.path
                });
                if let Some(first) = first {
                    interaction.response = first.response.clone();
                }
                pact.interactions.push(interaction);
            }
            pact
        })
}
