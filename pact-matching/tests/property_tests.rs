//! Property-based tests for the matching engine.
//!
//! Tests validate:
//! - Determinism of request matching
//! - Tolerance of unspecified extra body fields
//! - Exactly one mismatch for a regex-covered field with a non-conforming value

use pact_matching::{MismatchKind, ObservedRequest, match_request};
use pact_models::{DocPath, MatchingRule, Request};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

// Strategy for generating JSON scalars
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

// Strategy for generating flat JSON objects
fn object_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", scalar_strategy(), 0..6)
        .prop_map(|entries| entries.into_iter().collect())
}

fn post_request(body: &Value) -> Request {
    let mut request = Request {
        method: "POST".to_string(),
        path: "/things".to_string(),
        body: Some(body.clone()),
        ..Request::default()
    };
    request
        .headers
        .insert("Content-Type".to_string(), vec!["application/json".to_string()]);
    request
}

fn observed(body: &Value) -> ObservedRequest {
    let mut request = ObservedRequest {
        method: "POST".to_string(),
        path: "/things".to_string(),
        body: Some(body.to_string()),
        ..ObservedRequest::default()
    };
    request
        .headers
        .insert("content-type".to_string(), vec!["application/json".to_string()]);
    request
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* expected and observed bodies, matching twice yields the
    /// same mismatch list.
    #[test]
    fn prop_matching_is_deterministic(
        expected in object_strategy(),
        actual in object_strategy(),
    ) {
        let request = post_request(&Value::Object(expected));
        let observed = observed(&Value::Object(actual));
        prop_assert_eq!(match_request(&request, &observed), match_request(&request, &observed));
    }

    /// *For any* body, an observed request carrying an additional field
    /// that the expectation does not mention matches.
    #[test]
    fn prop_extra_body_fields_are_tolerated(
        expected in object_strategy(),
        extra in scalar_strategy(),
    ) {
        let request = post_request(&Value::Object(expected.clone()));
        let mut actual = expected;
        actual.insert("unspecifiedField".to_string(), extra);
        prop_assert!(match_request(&request, &observed(&Value::Object(actual))).is_empty());
    }

    /// *For any* body with a regex-covered field, a non-conforming value
    /// yields exactly one body mismatch at that field.
    #[test]
    fn prop_regex_violation_is_one_mismatch(
        mut expected in object_strategy(),
        good in "[0-9]{1,6}",
        bad in "[a-z]{1,6}",
    ) {
        expected.insert("code".to_string(), json!("1"));
        let mut request = post_request(&Value::Object(expected.clone()));
        request
            .matching_rules
            .add_body_rule(DocPath::root().join("code"), MatchingRule::Regex("[0-9]+".to_string()));

        let mut conforming = expected.clone();
        conforming.insert("code".to_string(), json!(good));
        prop_assert!(match_request(&request, &observed(&Value::Object(conforming))).is_empty());

        let mut violating = expected;
        violating.insert("code".to_string(), json!(bad));
        let mismatches = match_request(&request, &observed(&Value::Object(violating)));
        prop_assert_eq!(mismatches.len(), 1);
        prop_assert_eq!(mismatches[0].kind, MismatchKind::BodyMismatch);
        prop_assert_eq!(mismatches[0].path.as_deref(), Some("$.code"));
    }
}
