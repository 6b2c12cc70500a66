//! Evaluation of individual matching rules.
//!
//! Body values are checked as JSON, so `integer` requires a JSON integer.
//! Header, query and path values only exist as text, so numeric rules parse
//! the text instead.

use crate::datetime;
use pact_models::{MatchingRule, RuleList, RuleLogic};
use regex::Regex;
use serde_json::Value;

/// Outcome of a rule check; the error is a human-readable description.
pub type RuleResult = Result<(), String>;

/// Evaluate a rule list with its combination logic.
pub fn evaluate(list: &RuleList, mut check: impl FnMut(&MatchingRule) -> RuleResult) -> RuleResult {
    match list.logic {
        RuleLogic::And => list.rules.iter().try_for_each(check),
        RuleLogic::Or => {
            let mut failures = Vec::new();
            for rule in &list.rules {
                match check(rule) {
                    Ok(()) => return Ok(()),
                    Err(failure) => failures.push(failure),
                }
            }
            if failures.is_empty() {
                Ok(())
            } else {
                Err(failures.join(" or "))
            }
        }
    }
}

/// Check a JSON value against one rule.
pub fn match_json(rule: &MatchingRule, expected: &Value, actual: &Value) -> RuleResult {
    match rule {
        MatchingRule::Equality => {
            if expected == actual {
                Ok(())
            } else {
                Err(format!("Expected {expected} to equal {actual}"))
            }
        }
        MatchingRule::Type => same_type(expected, actual),
        MatchingRule::MinType(min) => {
            same_type(expected, actual)?;
            check_length(actual, Some(*min), None)
        }
        MatchingRule::MaxType(max) => {
            same_type(expected, actual)?;
            check_length(actual, None, Some(*max))
        }
        MatchingRule::MinMaxType(min, max) => {
            same_type(expected, actual)?;
            check_length(actual, Some(*min), Some(*max))
        }
        MatchingRule::Regex(pattern) => match text_form(actual) {
            Some(text) => match_regex(pattern, &text),
            None => Err(format!("Expected {actual} to match '{pattern}' but it is not a scalar")),
        },
        MatchingRule::Include(needle) => match text_form(actual) {
            Some(text) if text.contains(needle.as_str()) => Ok(()),
            _ => Err(format!("Expected {actual} to include '{needle}'")),
        },
        MatchingRule::Integer => {
            if actual.is_i64() || actual.is_u64() {
                Ok(())
            } else {
                Err(format!("Expected {actual} to be an integer"))
            }
        }
        MatchingRule::Decimal => {
            if actual.is_f64() {
                Ok(())
            } else {
                Err(format!("Expected {actual} to be a decimal number"))
            }
        }
        MatchingRule::Number => {
            if actual.is_number() {
                Ok(())
            } else {
                Err(format!("Expected {actual} to be a number"))
            }
        }
        MatchingRule::Null => {
            if actual.is_null() {
                Ok(())
            } else {
                Err(format!("Expected {actual} to be null"))
            }
        }
        MatchingRule::Boolean => {
            if actual.is_boolean() {
                Ok(())
            } else {
                Err(format!("Expected {actual} to be a boolean"))
            }
        }
        MatchingRule::Date(_) | MatchingRule::Time(_) | MatchingRule::Timestamp(_) => match actual {
            Value::String(text) => match_format(rule, text),
            other => Err(format!("Expected {other} to be a {} string", rule.name())),
        },
        MatchingRule::Values => same_type(expected, actual),
        MatchingRule::ArrayContains(_) => {
            if actual.is_array() {
                Ok(())
            } else {
                Err(format!("Expected {actual} to be an array"))
            }
        }
    }
}

/// Check a textual value (header, query parameter or path) against one rule.
pub fn match_text(rule: &MatchingRule, expected: &str, actual: &str) -> RuleResult {
    match rule {
        MatchingRule::Equality => {
            if expected == actual {
                Ok(())
            } else {
                Err(format!("Expected '{expected}' to equal '{actual}'"))
            }
        }
        MatchingRule::Type
        | MatchingRule::MinType(_)
        | MatchingRule::MaxType(_)
        | MatchingRule::MinMaxType(..) => Ok(()),
        MatchingRule::Regex(pattern) => match_regex(pattern, actual),
        MatchingRule::Include(needle) => {
            if actual.contains(needle.as_str()) {
                Ok(())
            } else {
                Err(format!("Expected '{actual}' to include '{needle}'"))
            }
        }
        MatchingRule::Integer => actual
            .parse::<i64>()
            .map(|_| ())
            .map_err(|_| format!("Expected '{actual}' to be an integer")),
        MatchingRule::Decimal => {
            if actual.contains('.') && actual.parse::<f64>().is_ok() {
                Ok(())
            } else {
                Err(format!("Expected '{actual}' to be a decimal number"))
            }
        }
        MatchingRule::Number => actual
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| format!("Expected '{actual}' to be a number")),
        MatchingRule::Null => {
            if actual.is_empty() {
                Ok(())
            } else {
                Err(format!("Expected '{actual}' to be empty"))
            }
        }
        MatchingRule::Boolean => match actual {
            "true" | "false" => Ok(()),
            _ => Err(format!("Expected '{actual}' to be a boolean")),
        },
        MatchingRule::Date(_) | MatchingRule::Time(_) | MatchingRule::Timestamp(_) => match_format(rule, actual),
        // Structural rules only constrain bodies
        MatchingRule::Values | MatchingRule::ArrayContains(_) => Ok(()),
    }
}

fn match_format(rule: &MatchingRule, text: &str) -> RuleResult {
    match rule {
        MatchingRule::Date(format) => {
            datetime::check_pattern("date", format.as_deref().unwrap_or(datetime::DEFAULT_DATE_FORMAT), text)
        }
        MatchingRule::Time(format) => {
            datetime::check_pattern("time", format.as_deref().unwrap_or(datetime::DEFAULT_TIME_FORMAT), text)
        }
        MatchingRule::Timestamp(format) => datetime::check_timestamp(format.as_deref(), text),
        _ => Ok(()),
    }
}

fn match_regex(pattern: &str, text: &str) -> RuleResult {
    let anchored = Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|err| format!("Invalid regular expression '{pattern}': {err}"))?;
    if anchored.is_match(text) {
        Ok(())
    } else {
        Err(format!("Expected '{text}' to match '{pattern}'"))
    }
}

fn text_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Name of a JSON value's type, as used in mismatch descriptions.
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn same_type(expected: &Value, actual: &Value) -> RuleResult {
    if type_name(expected) == type_name(actual) {
        Ok(())
    } else {
        Err(format!(
            "Expected {actual} ({}) to be the same type as {expected} ({})",
            type_name(actual),
            type_name(expected)
        ))
    }
}

fn check_length(actual: &Value, min: Option<usize>, max: Option<usize>) -> RuleResult {
    let Value::Array(items) = actual else {
        return Ok(());
    };
    if let Some(min) = min {
        if items.len() < min {
            return Err(format!(
                "Expected an array with at least {min} element(s) but received {}",
                items.len()
            ));
        }
    }
    if let Some(max) = max {
        if items.len() > max {
            return Err(format!(
                "Expected an array with at most {max} element(s) but received {}",
                items.len()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_rule() {
        assert!(match_json(&MatchingRule::Type, &json!("a"), &json!("b")).is_ok());
        assert!(match_json(&MatchingRule::Type, &json!(1), &json!(2.5)).is_ok());
        assert!(match_json(&MatchingRule::Type, &json!(1), &json!("1")).is_err());
        assert!(match_json(&MatchingRule::Type, &json!({}), &json!([])).is_err());
    }

    #[test]
    fn test_length_rules() {
        assert!(match_json(&MatchingRule::MinType(2), &json!([1]), &json!([1, 2])).is_ok());
        assert!(match_json(&MatchingRule::MinType(2), &json!([1]), &json!([1])).is_err());
        assert!(match_json(&MatchingRule::MaxType(1), &json!([1]), &json!([1, 2])).is_err());
        assert!(match_json(&MatchingRule::MinMaxType(1, 2), &json!([1]), &json!([])).is_err());
        assert!(match_json(&MatchingRule::MinType(5), &json!("a"), &json!("b")).is_ok());
    }

    #[test]
    fn test_regex_is_anchored() {
        let rule = MatchingRule::Regex("\\d+".to_string());
        assert!(match_json(&rule, &json!("1"), &json!("123")).is_ok());
        assert!(match_json(&rule, &json!("1"), &json!(123)).is_ok());
        assert!(match_json(&rule, &json!("1"), &json!("a123")).is_err());
        assert!(match_json(&rule, &json!("1"), &json!(["1"])).is_err());
        assert!(match_text(&rule, "1", "12x").is_err());
    }

    #[test]
    fn test_invalid_regex_is_a_failure() {
        let rule = MatchingRule::Regex("(".to_string());
        let err = match_text(&rule, "", "anything").unwrap_err();
        assert!(err.contains("Invalid regular expression"));
    }

    #[test]
    fn test_numeric_rules_on_json() {
        assert!(match_json(&MatchingRule::Integer, &json!(1), &json!(7)).is_ok());
        assert!(match_json(&MatchingRule::Integer, &json!(1), &json!("7")).is_err());
        assert!(match_json(&MatchingRule::Decimal, &json!(1.5), &json!(2.25)).is_ok());
        assert!(match_json(&MatchingRule::Decimal, &json!(1.5), &json!(2)).is_err());
        assert!(match_json(&MatchingRule::Number, &json!(1), &json!(2.5)).is_ok());
        assert!(match_json(&MatchingRule::Null, &json!(null), &json!(null)).is_ok());
    }

    #[test]
    fn test_numeric_rules_on_text() {
        assert!(match_text(&MatchingRule::Integer, "1", "42").is_ok());
        assert!(match_text(&MatchingRule::Integer, "1", "4.2").is_err());
        assert!(match_text(&MatchingRule::Decimal, "1.0", "4.2").is_ok());
        assert!(match_text(&MatchingRule::Number, "1", "abc").is_err());
    }

    #[test]
    fn test_include() {
        let rule = MatchingRule::Include("json".to_string());
        assert!(match_text(&rule, "", "application/json").is_ok());
        assert!(match_json(&rule, &json!(""), &json!("text/plain")).is_err());
    }

    #[test]
    fn test_boolean_rule() {
        assert!(match_json(&MatchingRule::Boolean, &json!(true), &json!(false)).is_ok());
        assert!(match_json(&MatchingRule::Boolean, &json!(true), &json!("true")).is_err());
        assert!(match_text(&MatchingRule::Boolean, "true", "false").is_ok());
        assert!(match_text(&MatchingRule::Boolean, "true", "yes").is_err());
    }

    #[test]
    fn test_date_time_rules() {
        let date = MatchingRule::Date(Some("yyyy-MM-dd".to_string()));
        assert!(match_json(&date, &json!("2000-01-01"), &json!("2024-06-30")).is_ok());
        assert!(match_json(&date, &json!("2000-01-01"), &json!("30/06/2024")).is_err());
        assert!(match_json(&date, &json!("2000-01-01"), &json!(20_240_630)).is_err());
        assert!(match_text(&MatchingRule::Time(None), "", "12:00:00").is_ok());
        assert!(match_text(&MatchingRule::Timestamp(None), "", "2024-06-30T12:00:00Z").is_ok());
        assert!(match_text(&MatchingRule::Timestamp(None), "", "noon").is_err());
    }

    #[test]
    fn test_or_logic() {
        let list = RuleList {
            rules: vec![MatchingRule::Integer, MatchingRule::Null],
            logic: RuleLogic::Or,
        };
        assert!(evaluate(&list, |r| match_json(r, &json!(1), &json!(null))).is_ok());
        assert!(evaluate(&list, |r| match_json(r, &json!(1), &json!(3))).is_ok());
        let err = evaluate(&list, |r| match_json(r, &json!(1), &json!("x"))).unwrap_err();
        assert!(err.contains(" or "));
    }

    #[test]
    fn test_and_logic_reports_first_failure() {
        let list = RuleList {
            rules: vec![MatchingRule::Type, MatchingRule::Regex("a+".to_string())],
            logic: RuleLogic::And,
        };
        assert!(evaluate(&list, |r| match_json(r, &json!("a"), &json!("aaa"))).is_ok());
        let err = evaluate(&list, |r| match_json(r, &json!("a"), &json!(1))).unwrap_err();
        assert!(err.contains("same type"));
    }
}
