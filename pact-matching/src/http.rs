//! Request and response comparison.

use crate::body::match_body;
use crate::mismatch::{Mismatch, MismatchKind};
use crate::rules::{evaluate, match_text};
use pact_models::{MatchingRules, MultiMap, Request, Response};
use serde_json::{Value, json};

/// An HTTP request as observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedRequest {
    /// Request method
    pub method: String,
    /// Request path, without the query string
    pub path: String,
    /// Decoded query parameters
    pub query: MultiMap,
    /// Headers by name as received
    pub headers: MultiMap,
    /// Raw body text
    pub body: Option<String>,
}

impl ObservedRequest {
    /// The received `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        find_header(&self.headers, "content-type").and_then(|values| values.first().map(String::as_str))
    }
}

/// An HTTP response as observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedResponse {
    /// Status code
    pub status: u16,
    /// Headers by name as received
    pub headers: MultiMap,
    /// Raw body text
    pub body: Option<String>,
}

/// How an expected request's path matched an observed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RouteMatch {
    /// Satisfied the path matching rule
    Rule,
    /// Equal to the literal path
    Literal,
}

/// Whether `expected` is routed to by `method` and `path`.
///
/// Returns `None` when the method differs or the path matches neither
/// literally nor through a path rule. Literal matches rank above rule matches.
#[must_use]
pub fn route_match(expected: &Request, method: &str, path: &str) -> Option<RouteMatch> {
    if !expected.method.eq_ignore_ascii_case(method) {
        return None;
    }
    if expected.path == path {
        return Some(RouteMatch::Literal);
    }
    let rules = expected.matching_rules.path()?;
    evaluate(rules, |rule| match_text(rule, &expected.path, path))
        .ok()
        .map(|()| RouteMatch::Rule)
}

/// Compare an observed request against an expected request.
///
/// Mismatches are reported in a fixed order: method, path, query, headers,
/// body.
#[must_use]
pub fn match_request(expected: &Request, actual: &ObservedRequest) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    let rules = &expected.matching_rules;

    if !expected.method.eq_ignore_ascii_case(&actual.method) {
        mismatches.push(
            Mismatch::new(
                MismatchKind::MethodMismatch,
                format!("Expected method {} but received {}", expected.method, actual.method),
            )
            .values(Some(json!(expected.method)), Some(json!(actual.method))),
        );
    }
    mismatches.extend(match_path(&expected.path, &actual.path, rules));
    mismatches.extend(match_query(&expected.query, &actual.query, rules));
    mismatches.extend(match_headers(&expected.headers, &actual.headers, rules));
    mismatches.extend(match_body(
        expected.body.as_ref(),
        expected.content_type(),
        actual.body.as_deref(),
        rules,
    ));
    mismatches
}

/// Compare an observed response against an expected response.
#[must_use]
pub fn match_response(expected: &Response, actual: &ObservedResponse) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    let rules = &expected.matching_rules;

    if expected.status != actual.status {
        mismatches.push(
            Mismatch::new(
                MismatchKind::StatusMismatch,
                format!("Expected status {} but received {}", expected.status, actual.status),
            )
            .values(Some(json!(expected.status)), Some(json!(actual.status))),
        );
    }
    mismatches.extend(match_headers(&expected.headers, &actual.headers, rules));
    mismatches.extend(match_body(
        expected.body.as_ref(),
        expected.content_type(),
        actual.body.as_deref(),
        rules,
    ));
    mismatches
}

/// Compare a request path.
#[must_use]
pub fn match_path(expected: &str, actual: &str, rules: &MatchingRules) -> Vec<Mismatch> {
    let outcome = match rules.path() {
        Some(list) => evaluate(list, |rule| match_text(rule, expected, actual)),
        None if expected == actual => Ok(()),
        None => Err(format!("Expected path '{expected}' but received '{actual}'")),
    };
    outcome.err().map_or_else(Vec::new, |description| {
        vec![
            Mismatch::new(MismatchKind::PathMismatch, description)
                .values(Some(json!(expected)), Some(json!(actual))),
        ]
    })
}

/// Compare query parameters.
///
/// Parameter names are case-sensitive. Without a rule the values of a
/// parameter compare as a multiset; an `equality` rule makes the order
/// significant and any other rule is applied to every received value.
/// Parameters that were not expected are mismatches.
#[must_use]
pub fn match_query(expected: &MultiMap, actual: &MultiMap, rules: &MatchingRules) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    for (name, expected_values) in expected {
        let Some(actual_values) = actual.get(name) else {
            mismatches.push(
                Mismatch::new(
                    MismatchKind::QueryMismatch,
                    format!("Expected query parameter '{name}' but was missing"),
                )
                .for_key(name)
                .values(Some(json!(expected_values)), None),
            );
            continue;
        };

        let outcome = match rules.query(name) {
            Some(list) if list.is_equality() => {
                if expected_values == actual_values {
                    Ok(())
                } else {
                    Err(format!(
                        "Expected query parameter '{name}' values {expected_values:?} in order but received {actual_values:?}"
                    ))
                }
            }
            Some(list) => {
                let template = expected_values.first().map_or("", String::as_str);
                actual_values
                    .iter()
                    .try_for_each(|value| evaluate(list, |rule| match_text(rule, template, value)))
                    .map_err(|failure| format!("Query parameter '{name}': {failure}"))
            }
            None => {
                let mut left = expected_values.clone();
                let mut right = actual_values.clone();
                left.sort();
                right.sort();
                if left == right {
                    Ok(())
                } else {
                    Err(format!(
                        "Expected query parameter '{name}' with value(s) {expected_values:?} but received {actual_values:?}"
                    ))
                }
            }
        };

        if let Err(description) = outcome {
            mismatches.push(
                Mismatch::new(MismatchKind::QueryMismatch, description)
                    .for_key(name)
                    .values(Some(json!(expected_values)), Some(json!(actual_values))),
            );
        }
    }

    for (name, actual_values) in actual {
        if !expected.contains_key(name) {
            mismatches.push(
                Mismatch::new(
                    MismatchKind::QueryMismatch,
                    format!("Unexpected query parameter '{name}' received"),
                )
                .for_key(name)
                .values(None, Some(json!(actual_values))),
            );
        }
    }

    mismatches
}

/// Compare headers. Headers that were not expected are tolerated.
///
/// Names are looked up exactly first, then case-insensitively. Without a
/// rule, comma-separated values compare as sets; `Content-Type` compares by
/// media type and the expected parameters.
#[must_use]
pub fn match_headers(expected: &MultiMap, actual: &MultiMap, rules: &MatchingRules) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    for (name, expected_values) in expected {
        let expected_joined = expected_values.join(", ");
        let Some(actual_values) = find_header(actual, name) else {
            mismatches.push(
                Mismatch::new(
                    MismatchKind::HeaderMismatch,
                    format!("Expected header '{name}' but was missing"),
                )
                .for_key(name)
                .values(Some(Value::String(expected_joined)), None),
            );
            continue;
        };
        let actual_joined = actual_values.join(", ");

        let outcome = match rules.header(name) {
            Some(list) => evaluate(list, |rule| match_text(rule, &expected_joined, &actual_joined)),
            None if name.eq_ignore_ascii_case("content-type") => {
                match_content_type(&expected_joined, &actual_joined)
            }
            None => match_header_values(&expected_joined, &actual_joined),
        };

        if let Err(description) = outcome {
            mismatches.push(
                Mismatch::new(MismatchKind::HeaderMismatch, description)
                    .for_key(name)
                    .values(Some(Value::String(expected_joined)), Some(Value::String(actual_joined))),
            );
        }
    }

    mismatches
}

fn find_header<'a>(headers: &'a MultiMap, name: &str) -> Option<&'a Vec<String>> {
    headers.get(name).or_else(|| {
        headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, values)| values)
    })
}

fn split_values(value: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = value.split(',').map(str::trim).filter(|v| !v.is_empty()).collect();
    parts.sort_unstable();
    parts.dedup();
    parts
}

fn match_header_values(expected: &str, actual: &str) -> Result<(), String> {
    if expected == actual || split_values(expected) == split_values(actual) {
        Ok(())
    } else {
        Err(format!("Expected '{expected}' but received '{actual}'"))
    }
}

fn match_content_type(expected: &str, actual: &str) -> Result<(), String> {
    let parse = |value: &str| {
        let mut parts = value.split(';').map(str::trim);
        let essence = parts.next().unwrap_or_default().to_ascii_lowercase();
        let params: Vec<(String, String)> = parts
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().trim_matches('"').to_string()))
            .collect();
        (essence, params)
    };
    let (expected_essence, expected_params) = parse(expected);
    let (actual_essence, actual_params) = parse(actual);

    if expected_essence != actual_essence {
        return Err(format!("Expected content type '{expected}' but received '{actual}'"));
    }
    for (key, value) in &expected_params {
        let found = actual_params
            .iter()
            .any(|(k, v)| k == key && v.eq_ignore_ascii_case(value));
        if !found {
            return Err(format!(
                "Expected content type parameter '{key}={value}' but received '{actual}'"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_models::MatchingRule;

    fn multimap(entries: &[(&str, &[&str])]) -> MultiMap {
        entries
            .iter()
            .map(|(k, vs)| ((*k).to_string(), vs.iter().map(|v| (*v).to_string()).collect()))
            .collect()
    }

    fn get_data() -> Request {
        Request {
            path: "/data".to_string(),
            ..Request::default()
        }
    }

    fn observed(method: &str, path: &str) -> ObservedRequest {
        ObservedRequest {
            method: method.to_string(),
            path: path.to_string(),
            ..ObservedRequest::default()
        }
    }

    #[test]
    fn test_exact_request_matches() {
        assert!(match_request(&get_data(), &observed("GET", "/data")).is_empty());
        assert!(match_request(&get_data(), &observed("get", "/data")).is_empty());
    }

    #[test]
    fn test_unexpected_query_parameter() {
        let mut request = observed("GET", "/data");
        request.query = multimap(&[("x", &["1"])]);
        let mismatches = match_request(&get_data(), &request);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].kind, MismatchKind::QueryMismatch);
        assert_eq!(mismatches[0].key.as_deref(), Some("x"));
    }

    #[test]
    fn test_method_and_path_mismatch() {
        let mismatches = match_request(&get_data(), &observed("POST", "/other"));
        let kinds: Vec<_> = mismatches.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MismatchKind::MethodMismatch, MismatchKind::PathMismatch]);
    }

    #[test]
    fn test_query_values_compare_as_sets() {
        let expected = multimap(&[("a", &["1", "2"])]);
        let none = MatchingRules::new();
        assert!(match_query(&expected, &multimap(&[("a", &["2", "1"])]), &none).is_empty());
        assert_eq!(match_query(&expected, &multimap(&[("a", &["1"])]), &none).len(), 1);
        assert_eq!(match_query(&expected, &MultiMap::new(), &none).len(), 1);
    }

    #[test]
    fn test_query_equality_rule_is_ordered() {
        let expected = multimap(&[("a", &["1", "2"])]);
        let mut rules = MatchingRules::new();
        rules.add_query_rule("a", MatchingRule::Equality);
        assert_eq!(match_query(&expected, &multimap(&[("a", &["2", "1"])]), &rules).len(), 1);
        assert!(match_query(&expected, &multimap(&[("a", &["1", "2"])]), &rules).is_empty());
    }

    #[test]
    fn test_query_rule_applies_to_each_value() {
        let expected = multimap(&[("id", &["1"])]);
        let mut rules = MatchingRules::new();
        rules.add_query_rule("id", MatchingRule::Integer);
        assert!(match_query(&expected, &multimap(&[("id", &["5", "6"])]), &rules).is_empty());
        assert_eq!(match_query(&expected, &multimap(&[("id", &["5", "x"])]), &rules).len(), 1);
    }

    #[test]
    fn test_query_names_are_case_sensitive() {
        let expected = multimap(&[("page", &["1"])]);
        let mismatches = match_query(&expected, &multimap(&[("Page", &["1"])]), &MatchingRules::new());
        assert_eq!(mismatches.len(), 2);
    }

    #[test]
    fn test_headers() {
        let expected = multimap(&[("Accept", &["a, b"])]);
        let none = MatchingRules::new();
        assert!(match_headers(&expected, &multimap(&[("accept", &["b,a"])]), &none).is_empty());
        assert!(match_headers(&expected, &multimap(&[("Accept", &["a", "b"]), ("X-Extra", &["1"])]), &none).is_empty());

        let missing = match_headers(&expected, &MultiMap::new(), &none);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].kind, MismatchKind::HeaderMismatch);
        assert_eq!(match_headers(&expected, &multimap(&[("Accept", &["c"])]), &none).len(), 1);
    }

    #[test]
    fn test_header_exact_name_preferred() {
        let expected = multimap(&[("X-Id", &["1"])]);
        let actual = multimap(&[("X-Id", &["1"]), ("x-id", &["2"])]);
        assert!(match_headers(&expected, &actual, &MatchingRules::new()).is_empty());
    }

    #[test]
    fn test_header_rule() {
        let expected = multimap(&[("X-Id", &["abc"])]);
        let mut rules = MatchingRules::new();
        rules.add_header_rule("X-Id", MatchingRule::Regex("[a-z]+".to_string()));
        assert!(match_headers(&expected, &multimap(&[("X-Id", &["xyz"])]), &rules).is_empty());
        assert_eq!(match_headers(&expected, &multimap(&[("X-Id", &["123"])]), &rules).len(), 1);
    }

    #[test]
    fn test_content_type() {
        assert!(match_content_type("application/json", "application/json; charset=utf-8").is_ok());
        assert!(match_content_type("application/json; charset=UTF-8", "application/json;charset=utf-8").is_ok());
        assert!(match_content_type("application/json; charset=utf-8", "application/json").is_err());
        assert!(match_content_type("application/json", "text/html").is_err());
    }

    #[test]
    fn test_route_match() {
        let mut request = get_data();
        assert_eq!(route_match(&request, "GET", "/data"), Some(RouteMatch::Literal));
        assert_eq!(route_match(&request, "POST", "/data"), None);
        assert_eq!(route_match(&request, "GET", "/data/1"), None);

        request.path = "/items/1".to_string();
        request
            .matching_rules
            .add_path_rule(MatchingRule::Regex("/items/\\d+".to_string()));
        assert_eq!(route_match(&request, "GET", "/items/42"), Some(RouteMatch::Rule));
        assert_eq!(route_match(&request, "GET", "/items/x"), None);
        assert!(RouteMatch::Literal > RouteMatch::Rule);
    }

    #[test]
    fn test_response_matching() {
        let expected = Response {
            status: 200,
            headers: multimap(&[("Content-Type", &["application/json"])]),
            body: Some(json!({"value": 1})),
            ..Response::default()
        };
        let actual = ObservedResponse {
            status: 200,
            headers: multimap(&[("content-type", &["application/json"])]),
            body: Some(r#"{"value": 1}"#.to_string()),
        };
        assert!(match_response(&expected, &actual).is_empty());

        let wrong = ObservedResponse {
            status: 404,
            ..actual
        };
        let mismatches = match_response(&expected, &wrong);
        assert_eq!(mismatches[0].kind, MismatchKind::StatusMismatch);
    }
}
