//! The `buildTransportRequest` stage.

use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use relay_domain::{ApiKeyPlacement, AuthConfig, EngineSettings, RequestItem};
use url::Url;

use crate::error::LifecycleError;
use crate::transport::{AwsCredentials, TransportAuth, TransportRequest, encode_body};

/// Turns an interpolated item into the state machine's input.
///
/// Basic, bearer and API-key auth are applied here; Digest and SigV4 are
/// left to the transport. `Content-Type` and `User-Agent` are defaulted when
/// the request sets none.
///
/// # Errors
///
/// Returns `LifecycleError::InvalidRequest` for an unparsable URL and
/// `LifecycleError::Transport` when the body cannot be encoded.
pub async fn build_transport_request(
    item: &RequestItem,
    settings: &EngineSettings,
    root: &Path,
) -> Result<TransportRequest, LifecycleError> {
    let mut url = Url::parse(&item.url)
        .map_err(|e| LifecycleError::InvalidRequest(format!("invalid URL '{}': {e}", item.url)))?;
    if url.host_str().is_none() {
        return Err(LifecycleError::InvalidRequest(format!(
            "URL '{}' has no host",
            item.url
        )));
    }

    let enabled_params: Vec<_> = item.params.iter().filter(|p| p.enabled).collect();
    if !enabled_params.is_empty() {
        let mut query = url.query_pairs_mut();
        for param in enabled_params {
            query.append_pair(&param.key, &param.value);
        }
    }

    let mut headers = item.headers.clone();
    let mut auth = TransportAuth::None;

    match &item.auth {
        AuthConfig::Inherit | AuthConfig::None => {}
        AuthConfig::Basic { username, password } => {
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            headers.set("Authorization", format!("Basic {encoded}"));
        }
        AuthConfig::Bearer { token } => {
            headers.set("Authorization", format!("Bearer {token}"));
        }
        AuthConfig::ApiKey {
            key,
            value,
            placement,
        } => match placement {
            ApiKeyPlacement::Header => headers.set(key.clone(), value.clone()),
            ApiKeyPlacement::QueryParams => {
                url.query_pairs_mut().append_pair(key, value);
            }
        },
        AuthConfig::Digest { username, password } => {
            auth = TransportAuth::Digest {
                username: username.clone(),
                password: password.clone(),
            };
        }
        AuthConfig::AwsV4 {
            access_key_id,
            secret_access_key,
            session_token,
            service,
            region,
        } => {
            auth = TransportAuth::AwsV4(AwsCredentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                session_token: session_token.clone(),
                service: service.clone(),
                region: region.clone(),
            });
        }
    }

    let body = match encode_body(&item.body, root).await? {
        Some(encoded) => {
            if !headers.contains("content-type") {
                headers.set("Content-Type", encoded.content_type);
            }
            Some(encoded.bytes)
        }
        None => None,
    };

    if !headers.contains("user-agent") && !settings.user_agent.is_empty() {
        headers.set("User-Agent", settings.user_agent.clone());
    }

    Ok(TransportRequest {
        uid: item.uid.clone(),
        method: item.method,
        url,
        headers,
        body,
        timeout: item
            .settings
            .timeout_ms
            .or(settings.default_timeout_ms)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis),
        max_redirects: item
            .settings
            .max_redirects
            .unwrap_or(settings.default_max_redirects),
        auth,
    })
}
