//! `req`: the outgoing request, writable only before it is sent.

use std::str::FromStr;

use relay_domain::{HttpMethod, KeyValue, MultipartField, RequestBody};
use rhai::{Array, Dynamic, Engine, INT, Map};
use serde_json::Value;

use crate::scripting::bridge::{render, to_dynamic, to_json};
use crate::scripting::session::{RhaiResult, Session, script_error};

/// Script-side `req`.
#[derive(Clone)]
pub struct RequestFacade {
    session: Session,
}

impl RequestFacade {
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    fn writable(&self) -> RhaiResult<()> {
        let phase = self.session.frame().phase;
        if phase.request_is_read_only() {
            return Err(script_error(format!(
                "req is read-only in the {} phase",
                phase.label()
            )));
        }
        Ok(())
    }

    fn url(&self) -> String {
        self.session.state().request.url.clone()
    }

    fn method(&self) -> String {
        self.session.state().request.method.as_str().to_string()
    }

    fn header(&self, name: &str) -> Dynamic {
        self.session
            .state()
            .request
            .headers
            .get(name)
            .map_or(Dynamic::UNIT, |v| Dynamic::from(v.to_string()))
    }

    fn headers(&self) -> Map {
        let state = self.session.state();
        let mut map = Map::new();
        for header in state.request.headers.enabled() {
            map.entry(header.name.as_str().into())
                .or_insert_with(|| Dynamic::from(header.value.clone()));
        }
        map
    }

    fn body(&self) -> Dynamic {
        body_to_dynamic(&self.session.state().request.body)
    }

    fn set_body(&self, value: &Dynamic) -> RhaiResult<()> {
        self.writable()?;
        let mut state = self.session.state_mut();
        state.request.body = body_from_dynamic(&state.request.body, value)?;
        Ok(())
    }
}

fn body_to_dynamic(body: &RequestBody) -> Dynamic {
    match body {
        RequestBody::None => Dynamic::UNIT,
        RequestBody::Json { json } => serde_json::from_str::<Value>(json)
            .map_or_else(|_| Dynamic::from(json.clone()), |v| to_dynamic(&v)),
        RequestBody::Text { text: s } | RequestBody::Xml { xml: s } | RequestBody::Sparql { sparql: s } => {
            Dynamic::from(s.clone())
        }
        RequestBody::FormUrlEncoded { fields } => {
            let map: Map = fields
                .iter()
                .filter(|f| f.enabled)
                .map(|f| (f.name.as_str().into(), Dynamic::from(f.value.clone())))
                .collect();
            Dynamic::from_map(map)
        }
        RequestBody::Multipart { fields } => {
            let parts: Array = fields
                .iter()
                .filter_map(|f| serde_json::to_value(f).ok())
                .map(|v| to_dynamic(&v))
                .collect();
            Dynamic::from_array(parts)
        }
    }
}

/// New body for `value`, keeping the current mode where one is set.
fn body_from_dynamic(current: &RequestBody, value: &Dynamic) -> RhaiResult<RequestBody> {
    let text = || render(value);
    let body = match current {
        RequestBody::Json { .. } => RequestBody::Json { json: text() },
        RequestBody::Text { .. } => RequestBody::Text { text: text() },
        RequestBody::Xml { .. } => RequestBody::Xml { xml: text() },
        RequestBody::Sparql { .. } => RequestBody::Sparql { sparql: text() },
        RequestBody::FormUrlEncoded { .. } => {
            let Some(Value::Object(entries)) = to_json(value) else {
                return Err(script_error("form body must be set from a map"));
            };
            RequestBody::FormUrlEncoded {
                fields: entries
                    .iter()
                    .map(|(k, v)| KeyValue::new(k.clone(), json_text(v)))
                    .collect(),
            }
        }
        RequestBody::Multipart { .. } => {
            let json = to_json(value).unwrap_or(Value::Null);
            let fields: Vec<MultipartField> = serde_json::from_value(json)
                .map_err(|e| script_error(format!("invalid multipart body: {e}")))?;
            RequestBody::Multipart { fields }
        }
        RequestBody::None if value.is_unit() => RequestBody::None,
        RequestBody::None if value.is_string() => RequestBody::Text { text: text() },
        RequestBody::None => RequestBody::Json { json: text() },
    };
    Ok(body)
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn millis(value: INT, what: &str) -> RhaiResult<u64> {
    u64::try_from(value).map_err(|_| script_error(format!("{what} must not be negative")))
}

pub fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<RequestFacade>("Request")
        .register_get("url", |r: &mut RequestFacade| r.url())
        .register_get("method", |r: &mut RequestFacade| r.method())
        .register_get("headers", |r: &mut RequestFacade| r.headers())
        .register_get("body", |r: &mut RequestFacade| r.body())
        .register_fn("getUrl", |r: &mut RequestFacade| r.url())
        .register_fn("setUrl", |r: &mut RequestFacade, url: &str| -> RhaiResult<()> {
            r.writable()?;
            r.session.state_mut().request.url = url.to_string();
            Ok(())
        })
        .register_fn("getMethod", |r: &mut RequestFacade| r.method())
        .register_fn("setMethod", |r: &mut RequestFacade, method: &str| -> RhaiResult<()> {
            r.writable()?;
            let method = HttpMethod::from_str(method).map_err(|e| script_error(e.to_string()))?;
            r.session.state_mut().request.method = method;
            Ok(())
        })
        .register_fn("getHeader", |r: &mut RequestFacade, name: &str| r.header(name))
        .register_fn("getHeaders", |r: &mut RequestFacade| r.headers())
        .register_fn(
            "setHeader",
            |r: &mut RequestFacade, name: &str, value: Dynamic| -> RhaiResult<()> {
                r.writable()?;
                r.session.state_mut().request.headers.set(name, render(&value));
                Ok(())
            },
        )
        .register_fn("setHeaders", |r: &mut RequestFacade, headers: Map| -> RhaiResult<()> {
            r.writable()?;
            let mut state = r.session.state_mut();
            let names: Vec<String> = state
                .request
                .headers
                .all()
                .iter()
                .map(|h| h.name.clone())
                .collect();
            for name in names {
                state.request.headers.remove(&name);
            }
            for (name, value) in &headers {
                state.request.headers.set(name.as_str(), render(value));
            }
            Ok(())
        })
        .register_fn("deleteHeader", |r: &mut RequestFacade, name: &str| -> RhaiResult<()> {
            r.writable()?;
            r.session.state_mut().request.headers.remove(name);
            Ok(())
        })
        .register_fn("getBody", |r: &mut RequestFacade| r.body())
        .register_fn("setBody", |r: &mut RequestFacade, body: Dynamic| r.set_body(&body))
        .register_fn("getTimeout", |r: &mut RequestFacade| {
            r.session
                .state()
                .request
                .timeout_ms
                .and_then(|t| INT::try_from(t).ok())
                .map_or(Dynamic::UNIT, Dynamic::from_int)
        })
        .register_fn("setTimeout", |r: &mut RequestFacade, ms: INT| -> RhaiResult<()> {
            r.writable()?;
            r.session.state_mut().request.timeout_ms = Some(millis(ms, "timeout")?);
            Ok(())
        })
        .register_fn("getMaxRedirects", |r: &mut RequestFacade| {
            r.session
                .state()
                .request
                .max_redirects
                .map_or(Dynamic::UNIT, |n| Dynamic::from_int(INT::from(n)))
        })
        .register_fn("setMaxRedirects", |r: &mut RequestFacade, n: INT| -> RhaiResult<()> {
            r.writable()?;
            let n = u32::try_from(n).map_err(|_| script_error("maxRedirects out of range"))?;
            r.session.state_mut().request.max_redirects = Some(n);
            Ok(())
        })
        .register_fn("getAuthMode", |r: &mut RequestFacade| {
            r.session.state().request.auth_mode.clone()
        });
}
