//! `res`: the final response, read-only.

use std::cell::OnceCell;
use std::rc::Rc;

use relay_domain::ScriptResponse;
use rhai::{Dynamic, Engine, INT, Map};
use serde_json::Value;

use crate::scripting::bridge::to_dynamic;

/// Script-side `res`. The body is parsed as JSON on first access.
#[derive(Clone)]
pub struct ResponseFacade {
    response: Rc<ScriptResponse>,
    parsed: Rc<OnceCell<Option<Value>>>,
}

impl ResponseFacade {
    pub fn new(response: ScriptResponse) -> Self {
        Self {
            response: Rc::new(response),
            parsed: Rc::new(OnceCell::new()),
        }
    }

    pub fn status(&self) -> INT {
        INT::from(self.response.status)
    }

    fn header(&self, name: &str) -> Dynamic {
        self.response
            .headers
            .get(name)
            .map_or(Dynamic::UNIT, |v| Dynamic::from(v.to_string()))
    }

    fn headers(&self) -> Map {
        let mut map = Map::new();
        for header in self.response.headers.enabled() {
            let key = header.name.to_ascii_lowercase();
            map.entry(key.into())
                .or_insert_with(|| Dynamic::from(header.value.clone()));
        }
        map
    }

    /// JSON when the body parses, the raw text otherwise.
    pub fn body(&self) -> Dynamic {
        let parsed = self
            .parsed
            .get_or_init(|| serde_json::from_str(&self.response.body).ok());
        parsed.as_ref().map_or_else(
            || Dynamic::from(self.response.body.clone()),
            to_dynamic,
        )
    }

    fn response_time(&self) -> INT {
        INT::try_from(self.response.response_time_ms).unwrap_or(INT::MAX)
    }
}

pub fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<ResponseFacade>("Response")
        .register_get("status", |r: &mut ResponseFacade| r.status())
        .register_get("statusText", |r: &mut ResponseFacade| r.response.status_text.clone())
        .register_get("headers", |r: &mut ResponseFacade| r.headers())
        .register_get("body", |r: &mut ResponseFacade| r.body())
        .register_get("responseTime", |r: &mut ResponseFacade| r.response_time())
        .register_get("url", |r: &mut ResponseFacade| r.response.url.clone())
        .register_fn("getStatus", |r: &mut ResponseFacade| r.status())
        .register_fn("getStatusText", |r: &mut ResponseFacade| r.response.status_text.clone())
        .register_fn("getHeader", |r: &mut ResponseFacade, name: &str| r.header(name))
        .register_fn("getHeaders", |r: &mut ResponseFacade| r.headers())
        .register_fn("getBody", |r: &mut ResponseFacade| r.body())
        .register_fn("getResponseTime", |r: &mut ResponseFacade| r.response_time())
        .register_fn("getUrl", |r: &mut ResponseFacade| r.response.url.clone());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scripting::bridge::to_json;
    use pretty_assertions::assert_eq;
    use relay_domain::{Header, Headers};
    use serde_json::json;

    fn response(body: &str) -> ResponseFacade {
        let mut headers = Headers::new();
        headers.add(Header::new("Content-Type", "application/json"));
        ResponseFacade::new(ScriptResponse {
            status: 201,
            status_text: "Created".into(),
            headers,
            body: body.into(),
            response_time_ms: 12,
            url: "http://api.test/users".into(),
        })
    }

    #[test]
    fn json_bodies_are_parsed() {
        let res = response(r#"{"id": 7}"#);
        assert_eq!(to_json(&res.body()), Some(json!({"id": 7})));
        assert_eq!(res.status(), 201);
    }

    #[test]
    fn text_bodies_stay_text() {
        let res = response("plain");
        assert_eq!(res.body().into_string().unwrap(), "plain");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let res = response("");
        assert_eq!(res.header("content-type").into_string().unwrap(), "application/json");
        assert!(res.headers().contains_key("content-type"));
    }
}
