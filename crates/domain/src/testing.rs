//! Declarative response assertions.
//!
//! Operands are strings so they can carry placeholders; the lifecycle
//! interpolates them right before evaluation.

use serde::{Deserialize, Serialize};

/// A declarative assertion checked against the final response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Assertion {
    /// Check response status code.
    StatusCode {
        /// Expected status code or range.
        expected: StatusExpectation,
    },
    /// Check response time.
    ResponseTime {
        /// Maximum allowed time in milliseconds.
        max_ms: u64,
    },
    /// Check header exists and optionally its value.
    HeaderExists {
        /// Header name (case-insensitive).
        name: String,
        /// Optional expected value.
        #[serde(default)]
        value: Option<String>,
    },
    /// Check header value matches a regex.
    HeaderMatches {
        /// Header name.
        name: String,
        /// Regex pattern.
        pattern: String,
    },
    /// Check body contains text.
    BodyContains {
        /// Text to search for.
        text: String,
        /// Case-insensitive search.
        #[serde(default)]
        ignore_case: bool,
    },
    /// Check body matches a regex.
    BodyMatches {
        /// Regex pattern.
        pattern: String,
    },
    /// Check a JSON path exists and optionally equals a value.
    JsonPath {
        /// Path such as `$.data.id` or `$.items[0]`.
        path: String,
        /// Expected value as JSON text; non-JSON text compares as a string.
        #[serde(default)]
        expected: Option<String>,
    },
    /// Compare a JSON path value.
    JsonPathMatches {
        /// Path expression.
        path: String,
        /// Comparison operator.
        operator: ComparisonOperator,
        /// Operand as JSON text; non-JSON text compares as a string.
        value: String,
    },
    /// Check body equals expected text.
    BodyEquals {
        /// Expected body.
        expected: String,
    },
    /// Check body is valid JSON.
    IsJson,
    /// Check content type contains a value.
    ContentType {
        /// Expected fragment.
        expected: String,
    },
    /// Check body length.
    BodyLength {
        /// Comparison operator.
        operator: ComparisonOperator,
        /// Length to compare against.
        length: usize,
    },
}

impl Assertion {
    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::StatusCode { expected } => format!("Status code {}", expected.description()),
            Self::ResponseTime { max_ms } => format!("Response time <= {max_ms}ms"),
            Self::HeaderExists {
                name,
                value: Some(v),
            } => format!("Header '{name}' equals '{v}'"),
            Self::HeaderExists { name, value: None } => format!("Header '{name}' exists"),
            Self::HeaderMatches { name, pattern } => format!("Header '{name}' matches /{pattern}/"),
            Self::BodyContains { text, .. } => format!("Body contains '{text}'"),
            Self::BodyMatches { pattern } => format!("Body matches /{pattern}/"),
            Self::JsonPath {
                path,
                expected: Some(v),
            } => format!("JSON {path} equals {v}"),
            Self::JsonPath {
                path,
                expected: None,
            } => format!("JSON {path} exists"),
            Self::JsonPathMatches {
                path,
                operator,
                value,
            } => format!("JSON {path} {} {value}", operator.symbol()),
            Self::BodyEquals { .. } => "Body equals expected".to_string(),
            Self::IsJson => "Body is valid JSON".to_string(),
            Self::ContentType { expected } => format!("Content-Type contains '{expected}'"),
            Self::BodyLength { operator, length } => {
                format!("Body length {} {length}", operator.symbol())
            }
        }
    }

    /// Returns a copy with every string operand passed through `f`.
    #[must_use]
    pub fn map_operands(&self, mut f: impl FnMut(&str) -> String) -> Self {
        match self {
            Self::HeaderExists { name, value } => Self::HeaderExists {
                name: f(name),
                value: value.as_deref().map(&mut f),
            },
            Self::HeaderMatches { name, pattern } => Self::HeaderMatches {
                name: f(name),
                pattern: f(pattern),
            },
            Self::BodyContains { text, ignore_case } => Self::BodyContains {
                text: f(text),
                ignore_case: *ignore_case,
            },
            Self::BodyMatches { pattern } => Self::BodyMatches { pattern: f(pattern) },
            Self::JsonPath { path, expected } => Self::JsonPath {
                path: f(path),
                expected: expected.as_deref().map(&mut f),
            },
            Self::JsonPathMatches {
                path,
                operator,
                value,
            } => Self::JsonPathMatches {
                path: f(path),
                operator: *operator,
                value: f(value),
            },
            Self::BodyEquals { expected } => Self::BodyEquals {
                expected: f(expected),
            },
            Self::ContentType { expected } => Self::ContentType {
                expected: f(expected),
            },
            other => other.clone(),
        }
    }
}

/// Expected status code value or range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusExpectation {
    /// Exact status code.
    Exact(u16),
    /// Inclusive range.
    Range {
        /// Minimum status code.
        min: u16,
        /// Maximum status code.
        max: u16,
    },
    /// One of several codes.
    OneOf(Vec<u16>),
}

impl StatusExpectation {
    /// Check if a status code matches this expectation.
    #[must_use]
    pub fn matches(&self, status: u16) -> bool {
        match self {
            Self::Exact(expected) => status == *expected,
            Self::Range { min, max } => (*min..=*max).contains(&status),
            Self::OneOf(codes) => codes.contains(&status),
        }
    }

    /// Description of the expectation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Exact(code) => format!("= {code}"),
            Self::Range { min, max } => format!("in {min}-{max}"),
            Self::OneOf(codes) => {
                let codes: Vec<_> = codes.iter().map(ToString::to_string).collect();
                format!("in [{}]", codes.join(", "))
            }
        }
    }
}

/// Comparison operators for value assertions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    /// Equal to.
    Equals,
    /// Not equal to.
    NotEquals,
    /// Greater than.
    GreaterThan,
    /// Greater than or equal to.
    GreaterThanOrEqual,
    /// Less than.
    LessThan,
    /// Less than or equal to.
    LessThanOrEqual,
    /// Contains (strings and arrays).
    Contains,
    /// Matches a regex.
    Matches,
}

impl ComparisonOperator {
    /// Symbol for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Contains => "contains",
            Self::Matches => "matches",
        }
    }
}

/// Result of running a single assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// The assertion after operand interpolation.
    pub assertion: Assertion,
    /// Whether it passed.
    pub passed: bool,
    /// Actual value found.
    pub actual: Option<String>,
    /// Failure message.
    pub error: Option<String>,
}

impl AssertionResult {
    /// A passed result.
    #[must_use]
    pub const fn pass(assertion: Assertion) -> Self {
        Self {
            assertion,
            passed: true,
            actual: None,
            error: None,
        }
    }

    /// A passed result with the observed value.
    #[must_use]
    pub fn pass_with_value(assertion: Assertion, actual: impl Into<String>) -> Self {
        Self {
            actual: Some(actual.into()),
            ..Self::pass(assertion)
        }
    }

    /// A failed result.
    #[must_use]
    pub fn fail(assertion: Assertion, error: impl Into<String>) -> Self {
        Self {
            assertion,
            passed: false,
            actual: None,
            error: Some(error.into()),
        }
    }

    /// A failed result with the observed value.
    #[must_use]
    pub fn fail_with_value(
        assertion: Assertion,
        actual: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            actual: Some(actual.into()),
            ..Self::fail(assertion, error)
        }
    }
}
