//! The `interpolateRequest` stage.

use relay_domain::{MultipartField, RequestBody, RequestItem};

use crate::variable_resolver::{InterpolationOptions, VariableResolver};

/// Resolves every templated field of `item`.
///
/// Returns the resolved item and the placeholders left unresolved in its URL,
/// headers and body, in order of first appearance.
#[must_use]
pub fn interpolate_request(item: &RequestItem, resolver: &VariableResolver) -> (RequestItem, Vec<String>) {
    let mut unresolved = Vec::new();
    let mut resolve = |input: &str, options: InterpolationOptions| {
        let result = resolver.resolve_detailed(input, options);
        for expr in result.unresolved {
            if !unresolved.contains(&expr) {
                unresolved.push(expr);
            }
        }
        result.resolved
    };
    let plain = InterpolationOptions::default();

    let mut resolved = item.clone();
    resolved.url = with_default_scheme(resolve(&item.url, plain).trim());

    for param in &mut resolved.params {
        param.key = resolve(&param.key, plain);
        param.value = resolve(&param.value, plain);
    }
    for header in resolved.headers.iter_mut() {
        header.name = resolve(&header.name, plain);
        header.value = resolve(&header.value, plain);
    }

    resolved.body = match &item.body {
        RequestBody::None => RequestBody::None,
        RequestBody::Json { json } => RequestBody::Json {
            json: resolve(json, InterpolationOptions::json()),
        },
        RequestBody::Text { text } => RequestBody::Text {
            text: resolve(text, plain),
        },
        RequestBody::Xml { xml } => RequestBody::Xml {
            xml: resolve(xml, plain),
        },
        RequestBody::Sparql { sparql } => RequestBody::Sparql {
            sparql: resolve(sparql, plain),
        },
        RequestBody::FormUrlEncoded { fields } => RequestBody::FormUrlEncoded {
            fields: fields
                .iter()
                .map(|f| {
                    let mut field = f.clone();
                    field.name = resolve(&f.name, plain);
                    field.value = resolve(&f.value, plain);
                    field
                })
                .collect(),
        },
        RequestBody::Multipart { fields } => RequestBody::Multipart {
            fields: fields
                .iter()
                .map(|f| match f {
                    MultipartField::Text {
                        name,
                        value,
                        enabled,
                    } => MultipartField::Text {
                        name: resolve(name, plain),
                        value: resolve(value, plain),
                        enabled: *enabled,
                    },
                    MultipartField::File {
                        name,
                        path,
                        enabled,
                    } => MultipartField::File {
                        name: resolve(name, plain),
                        path: resolve(path, plain),
                        enabled: *enabled,
                    },
                })
                .collect(),
        },
    };

    resolved.auth = item.auth.map_fields(|field| resolver.resolve(field));
    (resolved, unresolved)
}

/// Prefixes `http://` when the URL names no scheme.
fn with_default_scheme(url: &str) -> String {
    let has_scheme = url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    if has_scheme || url.is_empty() {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_domain::{AuthConfig, KeyValue, QueryParam, VariableScopes};
    use serde_json::json;

    fn scopes() -> VariableScopes {
        let mut scopes = VariableScopes::new();
        scopes.environment.insert("host".into(), json!("api.test"));
        scopes.environment.insert("token".into(), json!("t0k"));
        scopes.runtime.insert("name".into(), json!("He said \"hi\""));
        scopes
    }

    #[test]
    fn url_gets_a_scheme_when_missing() {
        let resolver = VariableResolver::new(&scopes());
        let item = RequestItem::get("r", "{{host}}/users");
        let (resolved, unresolved) = interpolate_request(&item, &resolver);
        assert_eq!(resolved.url, "http://api.test/users");
        assert!(unresolved.is_empty());

        let item = RequestItem::get("r", "https://{{host}}/users");
        assert_eq!(interpolate_request(&item, &resolver).0.url, "https://api.test/users");
    }

    #[test]
    fn json_bodies_escape_string_values() {
        let resolver = VariableResolver::new(&scopes());
        let mut item = RequestItem::get("r", "http://h");
        item.body = RequestBody::json(r#"{"name":"{{name}}"}"#);

        let (resolved, _) = interpolate_request(&item, &resolver);

        assert_eq!(
            resolved.body,
            RequestBody::json(r#"{"name":"He said \"hi\""}"#)
        );
    }

    #[test]
    fn headers_params_form_and_auth_are_resolved() {
        let resolver = VariableResolver::new(&scopes());
        let mut item = RequestItem::get("r", "http://{{host}}");
        item.params.push(QueryParam::new("q", "{{token}}"));
        item.headers.set("X-Host", "{{host}}");
        item.body = RequestBody::FormUrlEncoded {
            fields: vec![KeyValue::new("name", "{{name}}")],
        };
        item.auth = AuthConfig::bearer("{{token}}");

        let (resolved, _) = interpolate_request(&item, &resolver);

        assert_eq!(resolved.params[0].value, "t0k");
        assert_eq!(resolved.headers.get("x-host"), Some("api.test"));
        assert_eq!(
            resolved.body,
            RequestBody::FormUrlEncoded {
                fields: vec![KeyValue::new("name", "He said \"hi\"")],
            }
        );
        assert_eq!(resolved.auth, AuthConfig::bearer("t0k"));
    }

    #[test]
    fn unresolved_placeholders_are_reported_once() {
        let resolver = VariableResolver::new(&scopes());
        let mut item = RequestItem::get("r", "http://{{missing}}/{{missing}}");
        item.headers.set("X-Other", "{{other}}");

        let (resolved, unresolved) = interpolate_request(&item, &resolver);

        assert_eq!(resolved.url, "http://{{missing}}/{{missing}}");
        assert_eq!(unresolved, vec!["missing".to_string(), "other".to_string()]);
    }
}
