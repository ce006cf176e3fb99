//! Test recorder: `test`, `expect`, `assert` and `assert_eq`.
//!
//! A failing expectation raises a runtime error whose value is a map with
//! `message`, `actual` and `expected`; `test()` catches it and records the
//! details. Timeouts and operation limits are never caught.

use regex::Regex;
use relay_domain::TestResult;
use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, NativeCallContext, Position};
use serde_json::Value;

use crate::scripting::bridge::{BigNumber, json_equal, render, to_dynamic, to_json};
use crate::scripting::facades::ResponseFacade;
use crate::scripting::session::{RhaiResult, Session};

/// A chainable expectation over one value.
#[derive(Clone)]
pub struct Expectation {
    actual: Dynamic,
    negated: bool,
}

impl Expectation {
    pub const fn new(actual: Dynamic) -> Self {
        Self {
            actual,
            negated: false,
        }
    }

    fn negate(&self) -> Self {
        Self {
            actual: self.actual.clone(),
            negated: !self.negated,
        }
    }

    /// Passes when `holds` differs from `negated`.
    fn verify(&self, holds: bool, verb: &str, expected: Option<&Dynamic>) -> RhaiResult<Self> {
        if holds != self.negated {
            return Ok(self.clone());
        }
        let not = if self.negated { "not " } else { "" };
        let tail = expected.map(|e| format!(" {}", show(e))).unwrap_or_default();
        let message = format!("expected {} to {not}{verb}{tail}", show(&self.actual));
        Err(failure(message, Some(&self.actual), expected))
    }

    fn equal(&self, expected: &Dynamic) -> RhaiResult<Self> {
        self.verify(same(&self.actual, expected), "equal", Some(expected))
    }

    fn compare(&self, bound: &Dynamic, verb: &str, test: fn(f64, f64) -> bool) -> RhaiResult<Self> {
        let holds = match (number(&self.actual), number(bound)) {
            (Some(actual), Some(bound)) => test(actual, bound),
            _ => false,
        };
        self.verify(holds, verb, Some(bound))
    }

    fn include(&self, needle: &Dynamic) -> RhaiResult<Self> {
        let holds = if let Some(haystack) = self.actual.read_lock::<ImmutableString>() {
            haystack.contains(render(needle).as_str())
        } else if let Some(items) = self.actual.read_lock::<Array>() {
            items.iter().any(|item| same(item, needle))
        } else if let Some(entries) = self.actual.read_lock::<Map>() {
            match needle.read_lock::<Map>() {
                Some(subset) => subset
                    .iter()
                    .all(|(k, v)| entries.get(k).is_some_and(|have| same(have, v))),
                None => entries.contains_key(render(needle).as_str()),
            }
        } else {
            false
        };
        self.verify(holds, "include", Some(needle))
    }

    fn of_type(&self, name: &str) -> RhaiResult<Self> {
        let holds = type_name(&self.actual).eq_ignore_ascii_case(name);
        self.verify(holds, "be a", Some(&Dynamic::from(name.to_string())))
    }

    fn ok(&self) -> RhaiResult<Self> {
        self.verify(truthy(&self.actual), "be ok", None)
    }

    #[allow(clippy::cast_precision_loss)]
    fn length_of(&self, expected: &Dynamic) -> RhaiResult<Self> {
        let length = if let Some(s) = self.actual.read_lock::<ImmutableString>() {
            Some(s.chars().count())
        } else if let Some(items) = self.actual.read_lock::<Array>() {
            Some(items.len())
        } else {
            self.actual.read_lock::<Map>().map(|m| m.len())
        };
        let holds = match (length, number(expected)) {
            (Some(length), Some(expected)) => (length as f64 - expected).abs() < f64::EPSILON,
            _ => false,
        };
        self.verify(holds, "have length", Some(expected))
    }

    /// On success the subject becomes the property's value.
    fn property(&self, name: &str) -> RhaiResult<Self> {
        let value = self
            .actual
            .read_lock::<Map>()
            .and_then(|m| m.get(name).cloned());
        let name = Dynamic::from(name.to_string());
        let checked = self.verify(value.is_some(), "have property", Some(&name))?;
        Ok(match value {
            Some(actual) if !self.negated => Self::new(actual),
            _ => checked,
        })
    }

    fn one_of(&self, options: &Array) -> RhaiResult<Self> {
        let holds = options.iter().any(|o| same(&self.actual, o));
        self.verify(holds, "be one of", Some(&Dynamic::from_array(options.clone())))
    }

    fn matches(&self, pattern: &str) -> RhaiResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| failure(format!("invalid pattern: {e}"), None, None))?;
        let holds = regex.is_match(&render(&self.actual));
        self.verify(holds, "match", Some(&Dynamic::from(pattern.to_string())))
    }

    fn status(&self, code: &Dynamic) -> RhaiResult<Self> {
        let status = if let Some(res) = self.actual.read_lock::<ResponseFacade>() {
            Some(Dynamic::from_int(res.status()))
        } else {
            self.actual
                .read_lock::<Map>()
                .and_then(|m| m.get("status").cloned())
        };
        let holds = status.as_ref().is_some_and(|s| same(s, code));
        let subject = Self {
            actual: status.unwrap_or(Dynamic::UNIT),
            negated: self.negated,
        };
        subject.verify(holds, "have status", Some(code))
    }
}

fn show(value: &Dynamic) -> String {
    to_json(value).map_or_else(|| value.type_name().to_string(), |json| json.to_string())
}

fn same(a: &Dynamic, b: &Dynamic) -> bool {
    match (to_json(a), to_json(b)) {
        (Some(a), Some(b)) => json_equal(&a, &b),
        _ => false,
    }
}

#[allow(clippy::cast_precision_loss)]
fn number(value: &Dynamic) -> Option<f64> {
    if let Ok(i) = value.as_int() {
        return Some(i as f64);
    }
    if let Ok(f) = value.as_float() {
        return Some(f);
    }
    value.read_lock::<BigNumber>().and_then(|b| b.0.parse().ok())
}

fn type_name(value: &Dynamic) -> &'static str {
    if value.is_unit() {
        "null"
    } else if value.is_bool() {
        "boolean"
    } else if value.is_int() || value.is_float() || value.is::<BigNumber>() {
        "number"
    } else if value.is_string() || value.is_char() {
        "string"
    } else if value.is_array() {
        "array"
    } else if value.is_map() {
        "object"
    } else {
        "unknown"
    }
}

fn truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Some(n) = number(value) {
        return n.abs() > f64::EPSILON;
    }
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return !s.is_empty();
    }
    true
}

fn failure(message: String, actual: Option<&Dynamic>, expected: Option<&Dynamic>) -> Box<EvalAltResult> {
    let mut map = Map::new();
    map.insert("message".into(), Dynamic::from(message));
    if let Some(actual) = actual {
        map.insert("actual".into(), actual.clone());
    }
    if let Some(expected) = expected {
        map.insert("expected".into(), expected.clone());
    }
    EvalAltResult::ErrorRuntime(Dynamic::from_map(map), Position::NONE).into()
}

/// The innermost error, past function-call and module wrappers.
pub fn root_cause(error: &EvalAltResult) -> &EvalAltResult {
    match error {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => root_cause(inner),
        other => other,
    }
}

/// Whether the error is a resource limit that must end the script.
pub fn is_limit(error: &EvalAltResult) -> bool {
    matches!(
        root_cause(error),
        EvalAltResult::ErrorTerminated(..) | EvalAltResult::ErrorTooManyOperations(..)
    )
}

/// Message plus actual/expected values of a failure.
pub fn failure_details(error: &EvalAltResult) -> (String, Option<Value>, Option<Value>) {
    if let EvalAltResult::ErrorRuntime(value, _) = root_cause(error) {
        if let Some(map) = value.read_lock::<Map>() {
            if let Some(message) = map.get("message") {
                let field = |key: &str| map.get(key).and_then(to_json);
                return (render(message), field("actual"), field("expected"));
            }
        }
        return (render(value), None, None);
    }
    (error.to_string(), None, None)
}

fn record(session: &Session, name: &str, outcome: RhaiResult<Dynamic>) -> RhaiResult<()> {
    match outcome {
        Ok(_) => session.add_result(TestResult::pass(name)),
        Err(error) if is_limit(&error) => return Err(error),
        Err(error) => {
            let (message, actual, expected) = failure_details(&error);
            session.add_result(TestResult::fail(name, message).with_values(actual, expected));
        }
    }
    Ok(())
}

fn assertion_failed(message: String, actual: &Dynamic, expected: &Dynamic) -> RhaiResult<()> {
    Err(failure(message, Some(actual), Some(expected)))
}

pub fn register(engine: &mut Engine, session: &Session) {
    let recorder = session.clone();
    engine.register_fn(
        "test",
        move |ctx: NativeCallContext, name: &str, body: FnPtr| -> RhaiResult<()> {
            let outcome = body.call_within_context::<Dynamic>(&ctx, ());
            record(&recorder, name, outcome)
        },
    );

    engine
        .register_fn("assert", |cond: bool| -> RhaiResult<()> {
            if cond {
                Ok(())
            } else {
                Err(failure("assertion failed".into(), None, None))
            }
        })
        .register_fn("assert", |cond: bool, message: &str| -> RhaiResult<()> {
            if cond {
                Ok(())
            } else {
                Err(failure(message.to_string(), None, None))
            }
        })
        .register_fn("assert_eq", |actual: Dynamic, expected: Dynamic| -> RhaiResult<()> {
            if same(&actual, &expected) {
                return Ok(());
            }
            let message = format!("expected {} to equal {}", show(&actual), show(&expected));
            assertion_failed(message, &actual, &expected)
        })
        .register_fn(
            "assert_eq",
            |actual: Dynamic, expected: Dynamic, message: &str| -> RhaiResult<()> {
                if same(&actual, &expected) {
                    return Ok(());
                }
                assertion_failed(message.to_string(), &actual, &expected)
            },
        );

    engine
        .register_type_with_name::<Expectation>("Expectation")
        .register_fn("expect", Expectation::new);
    for chain in ["to", "be", "been", "have", "that", "and"] {
        engine.register_get(chain, |e: &mut Expectation| e.clone());
    }
    engine
        .register_get("not", |e: &mut Expectation| e.negate())
        .register_get("ok", |e: &mut Expectation| e.ok())
        .register_fn("equal", |e: &mut Expectation, v: Dynamic| e.equal(&v))
        .register_fn("eql", |e: &mut Expectation, v: Dynamic| e.equal(&v))
        .register_fn("above", |e: &mut Expectation, v: Dynamic| {
            e.compare(&v, "be above", |a, b| a > b)
        })
        .register_fn("below", |e: &mut Expectation, v: Dynamic| {
            e.compare(&v, "be below", |a, b| a < b)
        })
        .register_fn("least", |e: &mut Expectation, v: Dynamic| {
            e.compare(&v, "be at least", |a, b| a >= b)
        })
        .register_fn("most", |e: &mut Expectation, v: Dynamic| {
            e.compare(&v, "be at most", |a, b| a <= b)
        })
        .register_fn("include", |e: &mut Expectation, v: Dynamic| e.include(&v))
        .register_fn("contain", |e: &mut Expectation, v: Dynamic| e.include(&v))
        .register_fn("a", |e: &mut Expectation, t: &str| e.of_type(t))
        .register_fn("an", |e: &mut Expectation, t: &str| e.of_type(t))
        .register_fn("lengthOf", |e: &mut Expectation, n: Dynamic| e.length_of(&n))
        .register_fn("property", |e: &mut Expectation, name: &str| e.property(name))
        .register_fn("oneOf", |e: &mut Expectation, options: Array| e.one_of(&options))
        .register_fn("matches", |e: &mut Expectation, pattern: &str| e.matches(pattern))
        .register_fn("status", |e: &mut Expectation, code: Dynamic| e.status(&code));
}
