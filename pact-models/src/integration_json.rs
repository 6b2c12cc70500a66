//! Matcher extraction from integration JSON.
//!
//! Test code describes example values with embedded matchers:
//!
//! ```json
//! {"id": {"pact:matcher:type": "integer", "value": 42},
//!  "tags": {"pact:matcher:type": "type", "min": 1, "value": ["a"]}}
//! ```
//!
//! Extraction replaces each matcher object with its example value and records
//! the matcher as a rule at the value's path.

use crate::error::{ModelError, ModelResult};
use crate::matching_rules::{ArrayVariant, Category, MatchingRule, MatchingRules};
use crate::path::DocPath;
use serde_json::{Map, Value};

/// Key marking an object as an embedded matcher.
pub const MATCHER_KEY: &str = "pact:matcher:type";

/// Whether a JSON value is an embedded matcher object.
#[must_use]
pub fn is_matcher(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| obj.contains_key(MATCHER_KEY))
}

/// Extract example values and body rules from an integration JSON tree.
///
/// # Errors
///
/// Returns [`crate::ModelError::InvalidMatcher`] for an embedded matcher
/// with an unknown kind or missing parameters.
pub fn extract_body(value: &Value, rules: &mut MatchingRules) -> ModelResult<Value> {
    extract_at(value, &DocPath::root(), rules)
}

fn extract_at(value: &Value, path: &DocPath, rules: &mut MatchingRules) -> ModelResult<Value> {
    match value {
        Value::Object(obj) if obj.contains_key(MATCHER_KEY) => extract_matcher(obj, path, rules),
        Value::Object(obj) => {
            let mut out = Map::with_capacity(obj.len());
            for (key, child) in obj {
                out.insert(key.clone(), extract_at(child, &path.join(key), rules)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| extract_at(item, &path.join_index(i), rules))
            .collect::<ModelResult<Vec<_>>>()
            .map(Value::Array),
        scalar => Ok(scalar.clone()),
    }
}

fn extract_matcher(
    obj: &Map<String, Value>,
    path: &DocPath,
    rules: &mut MatchingRules,
) -> ModelResult<Value> {
    if obj.get(MATCHER_KEY).and_then(Value::as_str) == Some("arrayContains") {
        return extract_array_contains(obj, path, rules);
    }
    let rule = MatchingRule::from_json(&Value::Object(obj.clone()))?;
    let example = obj.get("value").cloned().unwrap_or(Value::Null);
    let min_items = match rule {
        MatchingRule::MinType(min) | MatchingRule::MinMaxType(min, _) => Some(min),
        MatchingRule::MaxType(_) => Some(1),
        _ => None,
    };
    rules.add_body_rule(path.clone(), rule);

    match (min_items, example) {
        // Array matchers constrain every element, so nested matchers are
        // recorded against `[*]`.
        (Some(_), Value::Array(items)) => items
            .iter()
            .map(|item| extract_at(item, &path.join_star_index(), rules))
            .collect::<ModelResult<Vec<_>>>()
            .map(Value::Array),
        (Some(min), Value::Object(template)) => {
            let element = extract_at(&Value::Object(template), &path.join_star_index(), rules)?;
            Ok(Value::Array(vec![element; min.max(1)]))
        }
        (_, example) => extract_at(&example, path, rules),
    }
}

/// Each variant is an integration JSON example whose matchers are recorded
/// in the variant's own rules, rooted at the array element. The example
/// array holds the variants in order.
fn extract_array_contains(
    obj: &Map<String, Value>,
    path: &DocPath,
    rules: &mut MatchingRules,
) -> ModelResult<Value> {
    let Some(Value::Array(examples)) = obj.get("variants") else {
        return Err(ModelError::invalid_matcher("arrayContains matcher without a 'variants' array"));
    };
    let mut variants = Vec::with_capacity(examples.len());
    let mut items = Vec::with_capacity(examples.len());
    for (index, example) in examples.iter().enumerate() {
        let mut variant_rules = MatchingRules::new();
        items.push(extract_body(example, &mut variant_rules)?);
        variants.push(ArrayVariant {
            index,
            rules: variant_rules,
        });
    }
    rules.add_body_rule(path.clone(), MatchingRule::ArrayContains(variants));
    Ok(Value::Array(items))
}

/// Extract the example text for a header, query or path value.
///
/// Plain strings are returned unchanged. A string holding an embedded
/// matcher object yields the matcher's example and records the rule under
/// `category` and `key`.
///
/// # Errors
///
/// Returns [`crate::ModelError::InvalidMatcher`] for an invalid embedded
/// matcher.
pub fn extract_text(
    text: &str,
    category: Category,
    key: &str,
    rules: &mut MatchingRules,
) -> ModelResult<String> {
    let parsed: Option<Value> = if text.trim_start().starts_with('{') {
        serde_json::from_str(text).ok()
    } else {
        None
    };
    let Some(Value::Object(obj)) = parsed.filter(is_matcher) else {
        return Ok(text.to_string());
    };

    let rule = MatchingRule::from_json(&Value::Object(obj.clone()))?;
    rules.add_rule(category, key, rule)?;
    Ok(match obj.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}
