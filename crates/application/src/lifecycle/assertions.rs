//! Declarative assertion checks against the final response.

use regex::Regex;
use relay_domain::{
    Assertion, AssertionResult, ComparisonOperator, HttpResponse, StatusExpectation,
};
use serde_json::Value;

use crate::variable_resolver::VariableResolver;

/// Interpolates operands and checks every assertion, in order.
#[must_use]
pub fn evaluate_all(
    assertions: &[Assertion],
    response: &HttpResponse,
    resolver: &VariableResolver,
) -> Vec<AssertionResult> {
    assertions
        .iter()
        .map(|assertion| {
            let resolved = assertion.map_operands(|operand| resolver.resolve(operand));
            evaluate(&resolved, response)
        })
        .collect()
}

/// Checks one assertion.
#[must_use]
pub fn evaluate(assertion: &Assertion, response: &HttpResponse) -> AssertionResult {
    let body = response.body_text();
    match assertion {
        Assertion::StatusCode { expected } => check_status_code(assertion, response, expected),
        Assertion::ResponseTime { max_ms } => check_response_time(assertion, response, *max_ms),
        Assertion::HeaderExists { name, value } => {
            check_header_exists(assertion, response, name, value.as_deref())
        }
        Assertion::HeaderMatches { name, pattern } => {
            check_header_matches(assertion, response, name, pattern)
        }
        Assertion::BodyContains { text, ignore_case } => {
            check_body_contains(assertion, &body, text, *ignore_case)
        }
        Assertion::BodyMatches { pattern } => match Regex::new(pattern) {
            Ok(re) if re.is_match(&body) => AssertionResult::pass(assertion.clone()),
            Ok(_) => AssertionResult::fail_with_value(
                assertion.clone(),
                preview(&body),
                format!("Body does not match /{pattern}/"),
            ),
            Err(e) => invalid_pattern(assertion, pattern, &e),
        },
        Assertion::JsonPath { path, expected } => {
            check_json_path(assertion, &body, path, expected.as_deref())
        }
        Assertion::JsonPathMatches {
            path,
            operator,
            value,
        } => check_json_path_matches(assertion, &body, path, *operator, value),
        Assertion::BodyEquals { expected } => {
            if body == *expected {
                AssertionResult::pass(assertion.clone())
            } else {
                AssertionResult::fail_with_value(
                    assertion.clone(),
                    preview(&body),
                    "Body does not match expected value",
                )
            }
        }
        Assertion::IsJson => match serde_json::from_str::<Value>(&body) {
            Ok(_) => AssertionResult::pass(assertion.clone()),
            Err(e) => AssertionResult::fail(assertion.clone(), format!("Body is not valid JSON: {e}")),
        },
        Assertion::ContentType { expected } => match response.content_type() {
            Some(actual) if actual.contains(expected.as_str()) => {
                AssertionResult::pass_with_value(assertion.clone(), actual)
            }
            Some(actual) => AssertionResult::fail_with_value(
                assertion.clone(),
                actual,
                format!("Content-Type '{actual}' does not contain '{expected}'"),
            ),
            None => AssertionResult::fail(assertion.clone(), "No Content-Type header present"),
        },
        Assertion::BodyLength { operator, length } => {
            check_body_length(assertion, response.body.len(), *operator, *length)
        }
    }
}

fn check_status_code(
    assertion: &Assertion,
    response: &HttpResponse,
    expected: &StatusExpectation,
) -> AssertionResult {
    let actual = response.status;
    if expected.matches(actual) {
        AssertionResult::pass_with_value(assertion.clone(), actual.to_string())
    } else {
        AssertionResult::fail_with_value(
            assertion.clone(),
            actual.to_string(),
            format!("Expected status {}, got {actual}", expected.description()),
        )
    }
}

fn check_response_time(assertion: &Assertion, response: &HttpResponse, max_ms: u64) -> AssertionResult {
    let actual_ms = response.duration_millis();
    if actual_ms <= max_ms {
        AssertionResult::pass_with_value(assertion.clone(), format!("{actual_ms}ms"))
    } else {
        AssertionResult::fail_with_value(
            assertion.clone(),
            format!("{actual_ms}ms"),
            format!("Response took {actual_ms}ms, expected <= {max_ms}ms"),
        )
    }
}

fn check_header_exists(
    assertion: &Assertion,
    response: &HttpResponse,
    name: &str,
    expected: Option<&str>,
) -> AssertionResult {
    match (response.header(name), expected) {
        (None, _) => AssertionResult::fail(assertion.clone(), format!("Header '{name}' not found")),
        (Some(actual), None) => AssertionResult::pass_with_value(assertion.clone(), actual),
        (Some(actual), Some(expected)) if actual == expected => {
            AssertionResult::pass_with_value(assertion.clone(), actual)
        }
        (Some(actual), Some(expected)) => AssertionResult::fail_with_value(
            assertion.clone(),
            actual,
            format!("Header '{name}' is '{actual}', expected '{expected}'"),
        ),
    }
}

fn check_header_matches(
    assertion: &Assertion,
    response: &HttpResponse,
    name: &str,
    pattern: &str,
) -> AssertionResult {
    let Some(actual) = response.header(name) else {
        return AssertionResult::fail(assertion.clone(), format!("Header '{name}' not found"));
    };
    match Regex::new(pattern) {
        Ok(re) if re.is_match(actual) => AssertionResult::pass_with_value(assertion.clone(), actual),
        Ok(_) => AssertionResult::fail_with_value(
            assertion.clone(),
            actual,
            format!("Header '{name}' does not match /{pattern}/"),
        ),
        Err(e) => invalid_pattern(assertion, pattern, &e),
    }
}

fn check_body_contains(
    assertion: &Assertion,
    body: &str,
    text: &str,
    ignore_case: bool,
) -> AssertionResult {
    let found = if ignore_case {
        body.to_lowercase().contains(&text.to_lowercase())
    } else {
        body.contains(text)
    };
    if found {
        AssertionResult::pass(assertion.clone())
    } else {
        AssertionResult::fail_with_value(
            assertion.clone(),
            preview(body),
            format!("Body does not contain '{text}'"),
        )
    }
}

fn check_json_path(
    assertion: &Assertion,
    body: &str,
    path: &str,
    expected: Option<&str>,
) -> AssertionResult {
    let json = match serde_json::from_str::<Value>(body) {
        Ok(json) => json,
        Err(e) => {
            return AssertionResult::fail(
                assertion.clone(),
                format!("Failed to parse body as JSON: {e}"),
            );
        }
    };

    match query_json_path(&json, path) {
        Ok(Some(value)) => match expected.map(parse_operand) {
            Some(expected_value) if value != expected_value => AssertionResult::fail_with_value(
                assertion.clone(),
                value.to_string(),
                format!("JSON path '{path}' value mismatch: expected {expected_value}, got {value}"),
            ),
            _ => AssertionResult::pass_with_value(assertion.clone(), value.to_string()),
        },
        Ok(None) => AssertionResult::fail(assertion.clone(), format!("JSON path '{path}' not found")),
        Err(e) => AssertionResult::fail(assertion.clone(), format!("Invalid JSON path '{path}': {e}")),
    }
}

fn check_json_path_matches(
    assertion: &Assertion,
    body: &str,
    path: &str,
    operator: ComparisonOperator,
    operand: &str,
) -> AssertionResult {
    let json = match serde_json::from_str::<Value>(body) {
        Ok(json) => json,
        Err(e) => {
            return AssertionResult::fail(
                assertion.clone(),
                format!("Failed to parse body as JSON: {e}"),
            );
        }
    };
    let expected = parse_operand(operand);

    match query_json_path(&json, path) {
        Ok(Some(value)) if compare_json_values(&value, operator, &expected) => {
            AssertionResult::pass_with_value(assertion.clone(), value.to_string())
        }
        Ok(Some(value)) => AssertionResult::fail_with_value(
            assertion.clone(),
            value.to_string(),
            format!(
                "JSON path '{path}' comparison failed: {value} {} {expected}",
                operator.symbol()
            ),
        ),
        Ok(None) => AssertionResult::fail(assertion.clone(), format!("JSON path '{path}' not found")),
        Err(e) => AssertionResult::fail(assertion.clone(), format!("Invalid JSON path '{path}': {e}")),
    }
}

fn check_body_length(
    assertion: &Assertion,
    actual_length: usize,
    operator: ComparisonOperator,
    expected_length: usize,
) -> AssertionResult {
    let matches = match operator {
        ComparisonOperator::Equals => actual_length == expected_length,
        ComparisonOperator::NotEquals => actual_length != expected_length,
        ComparisonOperator::GreaterThan => actual_length > expected_length,
        ComparisonOperator::GreaterThanOrEqual => actual_length >= expected_length,
        ComparisonOperator::LessThan => actual_length < expected_length,
        ComparisonOperator::LessThanOrEqual => actual_length <= expected_length,
        ComparisonOperator::Contains | ComparisonOperator::Matches => false,
    };

    if matches {
        AssertionResult::pass_with_value(assertion.clone(), actual_length.to_string())
    } else {
        AssertionResult::fail_with_value(
            assertion.clone(),
            actual_length.to_string(),
            format!(
                "Body length {actual_length} does not {} {expected_length}",
                operator.symbol()
            ),
        )
    }
}

fn invalid_pattern(assertion: &Assertion, pattern: &str, error: &regex::Error) -> AssertionResult {
    AssertionResult::fail(
        assertion.clone(),
        format!("Invalid regex pattern '{pattern}': {error}"),
    )
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(100) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Operands are JSON text; anything that does not parse compares as a string.
fn parse_operand(operand: &str) -> Value {
    serde_json::from_str(operand).unwrap_or_else(|_| Value::String(operand.to_string()))
}

/// Queries a JSON value with `$.field`, `$.a.b`, `$.items[0]` and `$.items[*]`.
fn query_json_path(json: &Value, path: &str) -> Result<Option<Value>, String> {
    let path = path.trim();
    let Some(rest) = path.strip_prefix('$') else {
        return Err("JSON path must start with '$'".to_string());
    };
    let rest = rest.strip_prefix('.').unwrap_or(rest);

    let mut current = json;
    for segment in split_path_segments(rest) {
        let (name, index) = parse_array_access(&segment)
            .map_or((segment.as_str(), None), |(name, index)| (name, Some(index)));

        if !name.is_empty() {
            match current.get(name) {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        match index {
            None => {}
            Some("*") => return Ok(Some(current.clone())),
            Some(index) => {
                let idx: usize = index
                    .parse()
                    .map_err(|_| format!("Invalid array index: {index}"))?;
                match current.get(idx) {
                    Some(value) => current = value,
                    None => return Ok(None),
                }
            }
        }
    }

    Ok(Some(current.clone()))
}

fn split_path_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_bracket = false;

    for ch in path.chars() {
        match ch {
            '.' if !in_bracket => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                in_bracket = true;
                current.push(ch);
            }
            ']' => {
                in_bracket = false;
                current.push(ch);
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// `field[0]` → `("field", "0")`.
fn parse_array_access(segment: &str) -> Option<(&str, &str)> {
    let start = segment.find('[')?;
    let inner = segment.strip_suffix(']')?;
    Some((&segment[..start], &inner[start + 1..]))
}

fn compare_json_values(actual: &Value, operator: ComparisonOperator, expected: &Value) -> bool {
    match operator {
        ComparisonOperator::Equals => actual == expected,
        ComparisonOperator::NotEquals => actual != expected,
        ComparisonOperator::GreaterThan => compare_numeric(actual, expected, |a, b| a > b),
        ComparisonOperator::GreaterThanOrEqual => compare_numeric(actual, expected, |a, b| a >= b),
        ComparisonOperator::LessThan => compare_numeric(actual, expected, |a, b| a < b),
        ComparisonOperator::LessThanOrEqual => compare_numeric(actual, expected, |a, b| a <= b),
        ComparisonOperator::Contains => match (actual, expected) {
            (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
            (Value::Array(items), _) => items.contains(expected),
            _ => false,
        },
        ComparisonOperator::Matches => match (actual, expected) {
            (Value::String(s), Value::String(pattern)) => {
                Regex::new(pattern).is_ok_and(|re| re.is_match(s))
            }
            _ => false,
        },
    }
}

fn compare_numeric(actual: &Value, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_domain::{Headers, VariableScopes};
    use serde_json::json;
    use std::time::Duration;

    fn json_response(status: u16, body: &str) -> HttpResponse {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();
        HttpResponse::new(status, headers, body.as_bytes().to_vec(), Duration::from_millis(50))
    }

    #[test]
    fn status_code_exact_and_range() {
        let response = json_response(201, "{}");
        assert!(evaluate(&Assertion::StatusCode { expected: StatusExpectation::Exact(201) }, &response).passed);
        let failed = evaluate(
            &Assertion::StatusCode {
                expected: StatusExpectation::Range { min: 400, max: 499 },
            },
            &response,
        );
        assert!(!failed.passed);
        assert_eq!(failed.actual.as_deref(), Some("201"));
    }

    #[test]
    fn response_time_limit() {
        let response = json_response(200, "{}");
        assert!(evaluate(&Assertion::ResponseTime { max_ms: 100 }, &response).passed);
        assert!(!evaluate(&Assertion::ResponseTime { max_ms: 10 }, &response).passed);
    }

    #[test]
    fn header_checks_are_case_insensitive() {
        let response = json_response(200, "{}");
        let exists = Assertion::HeaderExists {
            name: "content-type".into(),
            value: Some("application/json".into()),
        };
        assert!(evaluate(&exists, &response).passed);

        let matches = Assertion::HeaderMatches {
            name: "CONTENT-TYPE".into(),
            pattern: "^application/".into(),
        };
        assert!(evaluate(&matches, &response).passed);

        let missing = Assertion::HeaderExists {
            name: "x-missing".into(),
            value: None,
        };
        assert_eq!(
            evaluate(&missing, &response).error.as_deref(),
            Some("Header 'x-missing' not found")
        );
    }

    #[test]
    fn body_contains_and_matches() {
        let response = json_response(200, r#"{"message":"Hello World"}"#);
        let contains = Assertion::BodyContains {
            text: "hello".into(),
            ignore_case: true,
        };
        assert!(evaluate(&contains, &response).passed);
        let exact_case = Assertion::BodyContains {
            text: "hello".into(),
            ignore_case: false,
        };
        assert!(!evaluate(&exact_case, &response).passed);
        assert!(evaluate(&Assertion::BodyMatches { pattern: "Hel+o".into() }, &response).passed);
        assert!(!evaluate(&Assertion::BodyMatches { pattern: "(".into() }, &response).passed);
    }

    #[test]
    fn json_path_lookup_and_equality() {
        let response = json_response(200, r#"{"data":{"id":7,"tags":["a","b"]}}"#);
        let exists = Assertion::JsonPath {
            path: "$.data.tags[1]".into(),
            expected: Some("b".into()),
        };
        assert!(evaluate(&exists, &response).passed);

        let number = Assertion::JsonPath {
            path: "$.data.id".into(),
            expected: Some("7".into()),
        };
        assert!(evaluate(&number, &response).passed);

        let missing = Assertion::JsonPath {
            path: "$.data.nope".into(),
            expected: None,
        };
        assert!(!evaluate(&missing, &response).passed);
    }

    #[test]
    fn json_path_comparisons() {
        let response = json_response(200, r#"{"count":10,"name":"relay","items":[1,2,3]}"#);
        let cases = [
            ("$.count", ComparisonOperator::GreaterThan, "5", true),
            ("$.count", ComparisonOperator::LessThanOrEqual, "10", true),
            ("$.count", ComparisonOperator::LessThan, "3", false),
            ("$.name", ComparisonOperator::Contains, "ela", true),
            ("$.name", ComparisonOperator::Matches, "^rel", true),
            ("$.items", ComparisonOperator::Contains, "2", true),
            ("$.name", ComparisonOperator::NotEquals, "other", true),
        ];
        for (path, operator, value, expected) in cases {
            let assertion = Assertion::JsonPathMatches {
                path: path.into(),
                operator,
                value: value.into(),
            };
            assert_eq!(evaluate(&assertion, &response).passed, expected, "{path} {value}");
        }
    }

    #[test]
    fn json_path_requires_root() {
        assert!(query_json_path(&json!({"a": 1}), "a").is_err());
        assert_eq!(query_json_path(&json!({"a": 1}), "$").unwrap(), Some(json!({"a": 1})));
        assert_eq!(
            query_json_path(&json!({"a": [1, 2]}), "$.a[*]").unwrap(),
            Some(json!([1, 2]))
        );
    }

    #[test]
    fn is_json_content_type_and_length() {
        let response = json_response(200, r#"{"ok":true}"#);
        assert!(evaluate(&Assertion::IsJson, &response).passed);
        assert!(
            evaluate(
                &Assertion::ContentType {
                    expected: "json".into()
                },
                &response
            )
            .passed
        );
        let length = Assertion::BodyLength {
            operator: ComparisonOperator::Equals,
            length: 11,
        };
        assert!(evaluate(&length, &response).passed);
        assert!(!evaluate(&Assertion::IsJson, &json_response(200, "nope")).passed);
    }

    #[test]
    fn operands_are_interpolated_before_checking() {
        let response = json_response(200, r#"{"user":"alice"}"#);
        let mut scopes = VariableScopes::new();
        scopes.runtime.insert("expectedUser".into(), json!("alice"));
        let resolver = VariableResolver::new(&scopes);

        let results = evaluate_all(
            &[Assertion::JsonPath {
                path: "$.user".into(),
                expected: Some("{{expectedUser}}".into()),
            }],
            &response,
            &resolver,
        );

        assert!(results[0].passed);
        assert_eq!(
            results[0].assertion,
            Assertion::JsonPath {
                path: "$.user".into(),
                expected: Some("alice".into()),
            }
        );
    }
}
