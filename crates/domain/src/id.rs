//! ID generation utilities.

use uuid::Uuid;

/// Generates a new time-ordered identifier (UUID v7) as a string.
///
/// Used for request uids, test result ids and console entries.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

/// Generates a random identifier (UUID v4) without dashes.
///
/// Suitable as a multipart boundary or a client nonce seed.
#[must_use]
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_generate_id_uniqueness() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_generate_token_has_no_dashes() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(!token.contains('-'));
    }
}
