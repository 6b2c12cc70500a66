//! Body comparison.

use crate::mismatch::{Mismatch, MismatchKind};
use crate::rules::{evaluate, match_json, match_text, type_name};
use pact_models::{ArrayVariant, DocPath, MatchingRules, is_json_content_type};
use serde_json::Value;

/// Compare an observed body against the expected body.
///
/// No expected body means the body is not checked. JSON bodies are compared
/// structurally under the body rules; other bodies are compared as text.
#[must_use]
pub fn match_body(
    expected: Option<&Value>,
    content_type: Option<&str>,
    actual: Option<&str>,
    rules: &MatchingRules,
) -> Vec<Mismatch> {
    let Some(expected) = expected else {
        return Vec::new();
    };
    let root = DocPath::root();
    let actual = actual.unwrap_or_default();

    let expects_json = content_type.is_some_and(is_json_content_type) || !expected.is_string();
    if !expects_json {
        let expected_text = expected.as_str().unwrap_or_default();
        return match_text_body(expected_text, actual, rules);
    }

    if actual.trim().is_empty() {
        return vec![
            Mismatch::new(MismatchKind::BodyMissing, "Expected a body but received none")
                .at(root.as_str())
                .values(Some(expected.clone()), None),
        ];
    }

    match serde_json::from_str::<Value>(actual) {
        Ok(actual) => {
            let mut mismatches = Vec::new();
            compare_value(&root, expected, &actual, rules, &mut mismatches);
            mismatches
        }
        Err(err) => vec![
            Mismatch::new(
                MismatchKind::BodyMismatch,
                format!("Failed to parse the body as JSON: {err}"),
            )
            .at(root.as_str())
            .values(Some(expected.clone()), Some(Value::String(actual.to_string()))),
        ],
    }
}

fn match_text_body(expected: &str, actual: &str, rules: &MatchingRules) -> Vec<Mismatch> {
    let root = DocPath::root();
    if actual.is_empty() && !expected.is_empty() {
        return vec![
            Mismatch::new(MismatchKind::BodyMissing, "Expected a body but received none")
                .at(root.as_str())
                .values(Some(Value::String(expected.to_string())), None),
        ];
    }
    let outcome = match rules.resolve_body(&root) {
        Some(list) => evaluate(list, |rule| match_text(rule, expected, actual)),
        None if expected == actual => Ok(()),
        None => Err(format!("Expected body '{expected}' but received '{actual}'")),
    };
    match outcome {
        Ok(()) => Vec::new(),
        Err(description) => vec![
            Mismatch::new(MismatchKind::BodyMismatch, description)
                .at(root.as_str())
                .values(
                    Some(Value::String(expected.to_string())),
                    Some(Value::String(actual.to_string())),
                ),
        ],
    }
}

/// Compare a JSON value at `path`, appending mismatches to `out`.
///
/// The most specific rule applying to `path` decides how the value is
/// compared:
/// - `equality` compares the whole subtree for equality;
/// - non-type rules (regex, integer, ...) are checked against the value itself;
/// - type rules check the value's type, then descend, comparing every actual
///   array element against the first expected element;
/// - without a rule, objects compare by expected keys (extra keys are
///   tolerated) and arrays compare element by element.
pub fn compare_value(
    path: &DocPath,
    expected: &Value,
    actual: &Value,
    rules: &MatchingRules,
    out: &mut Vec<Mismatch>,
) {
    let rule = rules.resolve_body(path);

    if let Some(list) = rule {
        if list.is_equality() {
            if expected != actual {
                out.push(value_mismatch(
                    path,
                    expected,
                    actual,
                    format!("Expected {expected} but received {actual}"),
                ));
            }
            return;
        }
        if let Err(description) = evaluate(list, |r| match_json(r, expected, actual)) {
            out.push(value_mismatch(path, expected, actual, description));
            return;
        }
        if let Some(variants) = list.array_variants() {
            compare_variants(path, expected, actual, variants, out);
            return;
        }
        if list.has_values_matcher() {
            compare_map_values(path, expected, actual, rules, out);
            return;
        }
        if !list.has_type_matcher() {
            return;
        }
    }
    let cascading = rule.is_some();

    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            for (key, expected_child) in expected_map {
                let child = path.join(key);
                match actual_map.get(key) {
                    Some(actual_child) => compare_value(&child, expected_child, actual_child, rules, out),
                    None => out.push(
                        Mismatch::new(
                            MismatchKind::BodyMissing,
                            format!("Expected key '{key}' but was missing"),
                        )
                        .at(child.as_str())
                        .values(Some(expected_child.clone()), None),
                    ),
                }
            }
        }
        (Value::Array(expected_items), Value::Array(actual_items)) if cascading => {
            if let Some(template) = expected_items.first() {
                for (i, item) in actual_items.iter().enumerate() {
                    compare_value(&path.join_index(i), template, item, rules, out);
                }
            }
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            for (i, expected_item) in expected_items.iter().enumerate() {
                let child = path.join_index(i);
                match actual_items.get(i) {
                    Some(actual_item) => compare_value(&child, expected_item, actual_item, rules, out),
                    None => out.push(
                        Mismatch::new(
                            MismatchKind::BodyMissing,
                            format!("Expected an element at index {i} but the array has {} element(s)", actual_items.len()),
                        )
                        .at(child.as_str())
                        .values(Some(expected_item.clone()), None),
                    ),
                }
            }
            if actual_items.len() > expected_items.len() {
                out.push(
                    Mismatch::new(
                        MismatchKind::BodyUnexpected,
                        format!(
                            "Expected an array with {} element(s) but received {}",
                            expected_items.len(),
                            actual_items.len()
                        ),
                    )
                    .at(path.as_str())
                    .values(
                        None,
                        Some(Value::Array(actual_items[expected_items.len()..].to_vec())),
                    ),
                );
            }
        }
        // Type-checked scalars
        _ if cascading => {}
        _ if type_name(expected) != type_name(actual) => out.push(value_mismatch(
            path,
            expected,
            actual,
            format!(
                "Type mismatch: expected {} but received {}",
                type_name(expected),
                type_name(actual)
            ),
        )),
        _ if expected != actual => out.push(value_mismatch(
            path,
            expected,
            actual,
            format!("Expected {expected} but received {actual}"),
        )),
        _ => {}
    }
}

/// Each variant must be matched, under its own rules, by at least one
/// actual element.
fn compare_variants(
    path: &DocPath,
    expected: &Value,
    actual: &Value,
    variants: &[ArrayVariant],
    out: &mut Vec<Mismatch>,
) {
    let (Value::Array(expected_items), Value::Array(actual_items)) = (expected, actual) else {
        return;
    };
    let root = DocPath::root();
    for variant in variants {
        let Some(example) = expected_items.get(variant.index) else {
            continue;
        };
        let found = actual_items.iter().any(|item| {
            let mut mismatches = Vec::new();
            compare_value(&root, example, item, &variant.rules, &mut mismatches);
            mismatches.is_empty()
        });
        if !found {
            out.push(
                Mismatch::new(
                    MismatchKind::BodyMismatch,
                    format!("Variant at index {} ({example}) was not found in the actual list", variant.index),
                )
                .at(path.as_str())
                .values(Some(example.clone()), Some(actual.clone())),
            );
        }
    }
}

/// Every actual map value is compared against the first expected value;
/// keys are not checked.
fn compare_map_values(
    path: &DocPath,
    expected: &Value,
    actual: &Value,
    rules: &MatchingRules,
    out: &mut Vec<Mismatch>,
) {
    let (Value::Object(expected_map), Value::Object(actual_map)) = (expected, actual) else {
        return;
    };
    let Some(template) = expected_map.values().next() else {
        return;
    };
    for (key, value) in actual_map {
        compare_value(&path.join(key), template, value, rules, out);
    }
}

fn value_mismatch(path: &DocPath, expected: &Value, actual: &Value, description: String) -> Mismatch {
    Mismatch::new(MismatchKind::BodyMismatch, description)
        .at(path.as_str())
        .values(Some(expected.clone()), Some(actual.clone()))
}
