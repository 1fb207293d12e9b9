//! QR identity payload codec
//!
//! Wire format: `first_name|last_name|email|registration_id|token`
//! (five pipe-delimited fields). This is the contract between the QR
//! generation step and the decoder; it must round-trip byte-for-byte for
//! ASCII content.

use serde::{Deserialize, Serialize};

/// Decoded identity payload from a QR marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_id: i64,
    pub token: String,
}

impl IdentityPayload {
    /// Encode into the pipe-delimited wire string
    pub fn encode(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.first_name, self.last_name, self.email, self.registration_id, self.token
        )
    }

    /// Decode a raw QR string.
    ///
    /// Returns `None` unless exactly 5 non-empty fields are present and the
    /// registration id parses as an integer. Fields are trimmed; the email is
    /// lowercased to tolerate camera/screen re-encoding quirks.
    pub fn decode(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split('|').collect();
        if parts.len() != 5 {
            return None;
        }

        let first_name = parts[0].trim();
        let last_name = parts[1].trim();
        let email = parts[2].trim().to_lowercase();
        let id_field = parts[3].trim();
        let token = parts[4].trim();

        if first_name.is_empty()
            || last_name.is_empty()
            || email.is_empty()
            || id_field.is_empty()
            || token.is_empty()
        {
            return None;
        }

        let registration_id: i64 = id_field.parse().ok()?;

        Some(Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email,
            registration_id,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IdentityPayload {
        IdentityPayload {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: "john@example.com".to_string(),
            registration_id: 123,
            token: "a1b2c3d4-e5f6".to_string(),
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let payload = sample();
        let wire = payload.encode();
        assert_eq!(wire, "John|Doe|john@example.com|123|a1b2c3d4-e5f6");
        assert_eq!(IdentityPayload::decode(&wire), Some(payload));
    }

    #[test]
    fn decode_rejects_wrong_arity() {
        assert!(IdentityPayload::decode("John|Doe|john@example.com|123").is_none());
        assert!(IdentityPayload::decode("John|Doe|john@example.com|123|tok|extra").is_none());
        assert!(IdentityPayload::decode("").is_none());
    }

    #[test]
    fn decode_rejects_empty_fields() {
        assert!(IdentityPayload::decode("John||john@example.com|123|tok").is_none());
        assert!(IdentityPayload::decode("John|Doe|john@example.com|123|  ").is_none());
    }

    #[test]
    fn decode_rejects_non_numeric_id() {
        assert!(IdentityPayload::decode("John|Doe|john@example.com|abc|tok").is_none());
    }

    #[test]
    fn decode_trims_and_lowercases_email() {
        let payload = IdentityPayload::decode(" John | Doe | John@Example.COM | 5 | tok ").unwrap();
        assert_eq!(payload.first_name, "John");
        assert_eq!(payload.email, "john@example.com");
        assert_eq!(payload.registration_id, 5);
    }
}
