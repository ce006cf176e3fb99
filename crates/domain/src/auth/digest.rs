//! Digest challenge parsing.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Hash negotiated by a Digest challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// MD5 (default when absent).
    #[default]
    Md5,
    /// SHA-256.
    Sha256,
    /// SHA-512-256 and SHA-512 are both answered with SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// Parses the `algorithm` parameter; `-sess` variants map to their base hash.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let normalized = value
            .trim()
            .to_ascii_uppercase()
            .trim_end_matches("-SESS")
            .to_string();
        match normalized.as_str() {
            "SHA-256" | "SHA256" => Self::Sha256,
            "SHA-512" | "SHA512" | "SHA-512-256" => Self::Sha512,
            _ => Self::Md5,
        }
    }

    /// The token echoed back in the `Authorization` header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestChallenge {
    /// Negotiated hash.
    pub algorithm: DigestAlgorithm,
    /// Protection realm.
    pub realm: String,
    /// Server nonce.
    pub nonce: String,
    /// Opaque value to echo back.
    pub opaque: Option<String>,
    /// Offered quality-of-protection values.
    pub qop: Option<String>,
}

impl DigestChallenge {
    /// Parses a challenge header value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidDigestChallenge` when the scheme is not
    /// `Digest` or `realm`/`nonce` are missing.
    pub fn parse(header: &str) -> DomainResult<Self> {
        let header = header.trim();
        let Some(params) = strip_scheme(header) else {
            return Err(DomainError::InvalidDigestChallenge(header.to_string()));
        };

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop = None;
        let mut algorithm = DigestAlgorithm::default();

        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop = Some(value),
                "algorithm" => algorithm = DigestAlgorithm::parse(&value),
                _ => {}
            }
        }

        match (realm, nonce) {
            (Some(realm), Some(nonce)) => Ok(Self {
                algorithm,
                realm,
                nonce,
                opaque,
                qop,
            }),
            _ => Err(DomainError::InvalidDigestChallenge(header.to_string())),
        }
    }
}

/// Whether a `WWW-Authenticate` value is a Digest challenge.
#[must_use]
pub fn is_digest_challenge(header: &str) -> bool {
    strip_scheme(header.trim()).is_some()
}

fn strip_scheme(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(char::is_whitespace)?;
    scheme.eq_ignore_ascii_case("digest").then_some(rest)
}

/// Splits `k=v, k2="v, 2"` honouring quotes.
fn split_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.trim().is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut escaped = false;
            for c in chars.by_ref() {
                match c {
                    '\\' if !escaped => escaped = true,
                    '"' if !escaped => break,
                    _ => {
                        escaped = false;
                        value.push(c);
                    }
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
            value = value.trim().to_string();
        }
        params.push((key.trim().to_string(), value));
    }

    params
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_quoted_and_bare_params() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="x", nonce="y", algorithm=MD5, qop="auth,auth-int", opaque="o""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "x");
        assert_eq!(challenge.nonce, "y");
        assert_eq!(challenge.algorithm, DigestAlgorithm::Md5);
        assert_eq!(challenge.qop.as_deref(), Some("auth,auth-int"));
        assert_eq!(challenge.opaque.as_deref(), Some("o"));
    }

    #[test]
    fn algorithm_variants() {
        assert_eq!(DigestAlgorithm::parse("SHA-256"), DigestAlgorithm::Sha256);
        assert_eq!(DigestAlgorithm::parse("sha-512-256"), DigestAlgorithm::Sha512);
        assert_eq!(DigestAlgorithm::parse("MD5-sess"), DigestAlgorithm::Md5);
    }

    #[test]
    fn rejects_other_schemes_and_missing_nonce() {
        assert!(DigestChallenge::parse(r#"Basic realm="x""#).is_err());
        assert!(DigestChallenge::parse(r#"Digest realm="x""#).is_err());
        assert!(is_digest_challenge(r#"digest realm="x", nonce="n""#));
        assert!(!is_digest_challenge("Bearer"));
    }
}
