//! Daraja request credentials
//!
//! Timestamp and password derivation for STK push payloads, plus the Basic
//! authorization header used by the OAuth endpoint.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Local;

/// `YYYYMMDDHHmmss`, the only timestamp layout Daraja accepts.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Current local time as a 14-digit Daraja timestamp.
pub fn current_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Base64 of `shortcode ++ passkey ++ timestamp`.
///
/// The same timestamp must be sent in the payload's `Timestamp` field or
/// Daraja rejects the password.
pub fn derive_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}

/// `Basic base64(consumer_key:consumer_secret)`
pub fn basic_auth_header(consumer_key: &str, consumer_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", consumer_key, consumer_secret))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORTCODE: &str = "174379";
    const PASSKEY: &str = "bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919";

    #[test]
    fn test_timestamp_is_fourteen_digits() {
        let pattern = regex::Regex::new(r"^\d{14}$").unwrap();
        let timestamp = current_timestamp();
        assert!(
            pattern.is_match(&timestamp),
            "unexpected timestamp: {}",
            timestamp
        );
    }

    #[test]
    fn test_password_matches_known_value() {
        let password = derive_password(SHORTCODE, PASSKEY, "20231005142030");
        assert_eq!(
            password,
            "MTc0Mzc5YmZiMjc5ZjlhYTliZGJjZjE1OGU5N2RkNzFhNDY3Y2QyZTBjODkzMDU5YjEwZjc4ZTZiNzJhZGExZWQyYzkxOTIwMjMxMDA1MTQyMDMw"
        );
    }

    #[test]
    fn test_password_is_deterministic() {
        let first = derive_password(SHORTCODE, PASSKEY, "20240101000000");
        let second = derive_password(SHORTCODE, PASSKEY, "20240101000000");
        assert_eq!(first, second);

        let other = derive_password(SHORTCODE, PASSKEY, "20240101000001");
        assert_ne!(first, other);
    }

    #[test]
    fn test_password_decodes_to_concatenation() {
        let timestamp = current_timestamp();
        let password = derive_password(SHORTCODE, PASSKEY, &timestamp);
        let decoded = String::from_utf8(STANDARD.decode(password).unwrap()).unwrap();
        assert_eq!(decoded, format!("{}{}{}", SHORTCODE, PASSKEY, timestamp));
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(basic_auth_header("key", "secret"), "Basic a2V5OnNlY3JldA==");
    }
}
