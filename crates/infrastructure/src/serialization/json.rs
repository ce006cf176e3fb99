//! JSON serialization helpers for deterministic output.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// JSON deserialization failed.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value to pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Same as `to_json_stable`, as bytes for direct file writing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    to_json_stable(value).map(String::into_bytes)
}

/// Deserializes JSON from a string.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    serde_json::from_str(json).map_err(SerializationError::Deserialize)
}

/// Deserializes JSON from bytes.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Deserialize)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_domain::{Collection, EngineSettings};

    #[test]
    fn stable_output_is_indented_with_trailing_newline() {
        let json = to_json_stable(&EngineSettings::default()).expect("serialization should work");
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\n  \"defaultMaxRedirects\": 25"));
    }

    #[test]
    fn field_order_follows_declaration() {
        let json = to_json_stable(&EngineSettings::default()).expect("serialization should work");
        let redirects = json.find("defaultMaxRedirects").expect("field present");
        let agent = json.find("userAgent").expect("field present");
        assert!(redirects < agent);
    }

    #[test]
    fn collections_survive_a_round_trip() {
        let original = Collection::new("api", "/srv/api");
        let json = to_json_stable(&original).expect("serialization should work");
        let restored: Collection = from_json(&json).expect("deserialization should work");
        assert_eq!(original, restored);
    }

    #[test]
    fn big_integers_keep_their_digits() {
        let value: serde_json::Value =
            from_json_bytes(br#"{"id": 123456789012345678901234567890}"#).expect("valid json");
        let json = to_json_stable(&value).expect("serialization should work");
        assert!(json.contains("123456789012345678901234567890"));
    }

    #[test]
    fn invalid_json_is_a_deserialize_error() {
        let result: Result<EngineSettings, _> = from_json("{\"defaultMaxRedirects\": }");
        assert!(matches!(result, Err(SerializationError::Deserialize(_))));
    }
}
