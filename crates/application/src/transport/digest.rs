//! HTTP Digest response computation.

use md5::Md5;
use relay_domain::{DigestAlgorithm, DigestChallenge, HttpMethod};
use sha2::{Digest, Sha256, Sha512};

/// Nonce count of the single retry.
const NONCE_COUNT: &str = "00000001";

/// A fresh client nonce.
#[must_use]
pub fn generate_cnonce() -> String {
    format!("{:016x}", rand::random::<u64>())
}

fn hash(algorithm: DigestAlgorithm, input: &str) -> String {
    match algorithm {
        DigestAlgorithm::Md5 => hex::encode(Md5::digest(input.as_bytes())),
        DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
        DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(input.as_bytes())),
    }
}

/// `response` value for qop `auth`.
fn response_hash(
    challenge: &DigestChallenge,
    username: &str,
    password: &str,
    method: HttpMethod,
    uri: &str,
    cnonce: &str,
) -> String {
    let algorithm = challenge.algorithm;
    let ha1 = hash(
        algorithm,
        &format!("{username}:{}:{password}", challenge.realm),
    );
    let ha2 = hash(algorithm, &format!("{}:{uri}", method.as_str()));
    hash(
        algorithm,
        &format!("{ha1}:{}:{NONCE_COUNT}:{cnonce}:auth:{ha2}", challenge.nonce),
    )
}

/// Builds the `Authorization: Digest ...` value answering `challenge`.
#[must_use]
pub fn authorization_header(
    challenge: &DigestChallenge,
    username: &str,
    password: &str,
    method: HttpMethod,
    uri: &str,
    cnonce: &str,
) -> String {
    let response = response_hash(challenge, username, password, method, uri, cnonce);
    let mut header = format!(
        "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", qop=auth, algorithm={}, response=\"{response}\", nc=\"{NONCE_COUNT}\", cnonce=\"{cnonce}\"",
        challenge.realm,
        challenge.nonce,
        challenge.algorithm.as_str(),
    );
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    header
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rfc_challenge() -> DigestChallenge {
        DigestChallenge::parse(
            r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
        .unwrap()
    }

    #[test]
    fn md5_response_matches_rfc_2617_example() {
        let response = response_hash(
            &rfc_challenge(),
            "Mufasa",
            "Circle Of Life",
            HttpMethod::Get,
            "/dir/index.html",
            "0a4f113b",
        );
        assert_eq!(response, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn header_carries_every_field() {
        let header = authorization_header(
            &rfc_challenge(),
            "Mufasa",
            "Circle Of Life",
            HttpMethod::Get,
            "/dir/index.html",
            "0a4f113b",
        );
        assert!(header.starts_with("Digest username=\"Mufasa\""));
        assert!(header.contains("realm=\"testrealm@host.com\""));
        assert!(header.contains("nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\""));
        assert!(header.contains("uri=\"/dir/index.html\""));
        assert!(header.contains(", qop=auth, "));
        assert!(!header.contains("qop=\"auth\""));
        assert!(header.contains("algorithm=MD5"));
        assert!(header.contains("response=\"6629fae49393a05397450978507c4ef1\""));
        assert!(header.contains("nc=\"00000001\""));
        assert!(header.contains("cnonce=\"0a4f113b\""));
        assert!(header.ends_with("opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""));
    }

    #[test]
    fn sha256_changes_the_hash_length() {
        let mut challenge = rfc_challenge();
        challenge.algorithm = DigestAlgorithm::Sha256;
        let response = response_hash(&challenge, "u", "p", HttpMethod::Get, "/", "c");
        assert_eq!(response.len(), 64);
    }

    #[test]
    fn cnonces_are_fresh() {
        let a = generate_cnonce();
        assert_eq!(a.len(), 16);
        assert_ne!(a, generate_cnonce());
    }
}
