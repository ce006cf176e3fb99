//! AWS Signature Version 4.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use relay_domain::{Headers, HttpMethod};
use sha2::{Digest, Sha256};
use url::Url;

use super::request::AwsCredentials;
use crate::ports::TransportError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Headers never covered by the signature.
const UNSIGNED_HEADERS: &[&str] = &[
    "authorization",
    "user-agent",
    "connection",
    "expect",
    "x-amzn-trace-id",
];

/// Signs a prepared request in place.
///
/// Replaces any previous `authorization` / `x-amz-date`, adds
/// `x-amz-security-token` when a session token is set and
/// `x-amz-content-sha256` for S3. `headers` must already carry `host`.
///
/// # Errors
///
/// Returns `TransportError::Signing` when the HMAC key is rejected.
pub fn sign_request(
    method: HttpMethod,
    url: &Url,
    headers: &mut Headers,
    body: &[u8],
    credentials: &AwsCredentials,
    now: DateTime<Utc>,
) -> Result<(), TransportError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let payload_hash = hex::encode(Sha256::digest(body));
    let is_s3 = credentials.service == "s3";

    headers.remove("authorization");
    headers.set("x-amz-date", amz_date.clone());
    if let Some(token) = credentials.session_token.as_deref().filter(|t| !t.is_empty()) {
        headers.set("x-amz-security-token", token);
    }
    if is_s3 {
        headers.set("x-amz-content-sha256", payload_hash.clone());
    }

    let (canonical_headers, signed_headers) = canonical_headers(headers);
    let canonical_request = format!(
        "{}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        method.as_str(),
        canonical_path(url, is_s3),
        canonical_query(url),
    );

    let scope = format!(
        "{date}/{}/{}/aws4_request",
        credentials.region, credentials.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let mut key = hmac(
        format!("AWS4{}", credentials.secret_access_key).as_bytes(),
        date.as_bytes(),
    )?;
    for part in [
        credentials.region.as_str(),
        credentials.service.as_str(),
        "aws4_request",
    ] {
        key = hmac(&key, part.as_bytes())?;
    }
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    headers.set(
        "authorization",
        format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
    );
    Ok(())
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| TransportError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Each segment is encoded once for S3 and twice for every other service.
fn canonical_path(url: &Url, is_s3: bool) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| {
            if is_s3 {
                let decoded = urlencoding::decode(segment)
                    .map_or_else(|_| segment.to_string(), |d| d.into_owned());
                urlencoding::encode(&decoded).into_owned()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect();
    encoded.join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lower-cased, sorted, trimmed; duplicates joined by `,`.
fn canonical_headers(headers: &Headers) -> (String, String) {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for header in headers.enabled() {
        let name = header.name.trim().to_ascii_lowercase();
        if UNSIGNED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        let value = header.value.split_whitespace().collect::<Vec<_>>().join(" ");
        grouped.entry(name).or_default().push(value);
    }

    let canonical = grouped
        .iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect::<String>();
    let signed = grouped.keys().cloned().collect::<Vec<_>>().join(";");
    (canonical, signed)
}
