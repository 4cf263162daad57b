//! QR payload codec: canonicalize, HMAC-sign, verify, base64-encode.
//!
//! A QR image carries a single URL-safe base64 string. Decoding it yields a
//! compact JSON object whose `hmac` field is an HMAC-SHA256 digest over a
//! fixed-order canonical string, keyed with the issuing business's secret.
//! Only the server can verify a payload; the string is opaque to clients.
//!
//! # Canonical signing input
//!
//! ```text
//! v={v}&tid={tid}&sid={sid}&bid={bid}&slot={slot}&iat={iat}
//! ```
//!
//! No whitespace, no escaping; the field order is part of the contract.
//! Changing any field (including `iat` by one second) invalidates the
//! signature.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// The only payload version this codec understands.
pub const PAYLOAD_VERSION: i32 = 1;

/// Errors produced by the codec.
///
/// The ticket engine maps all decode failures to a single
/// "invalid QR payload" response; the distinction here is for logs and
/// tests.
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    /// Signing requires a non-empty key.
    #[error("signing key cannot be empty")]
    EmptyKey,

    /// The encoded string is not valid URL-safe base64.
    #[error("invalid base64 encoding")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not the expected JSON object (this also covers
    /// `tid`/`sid`/`bid` values that are not well-formed UUIDs).
    #[error("invalid payload JSON")]
    Json(#[from] serde_json::Error),

    /// The payload declares a version this codec does not understand.
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(i32),
}

/// The signed QR payload (version 1).
///
/// Serialized field names are the short keys carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    #[serde(rename = "v")]
    pub version: i32,

    #[serde(rename = "tid")]
    pub ticket_id: Uuid,

    #[serde(rename = "sid")]
    pub service_id: Uuid,

    #[serde(rename = "bid")]
    pub business_id: Uuid,

    #[serde(rename = "slot")]
    pub slot_number: i32,

    /// Issue time, seconds since epoch.
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Lowercase hex HMAC-SHA256 digest; empty until [`QrPayload::sign`] runs.
    #[serde(rename = "hmac", default)]
    pub hmac: String,
}

impl QrPayload {
    /// Build an unsigned version-1 payload.
    pub fn new(
        ticket_id: Uuid,
        service_id: Uuid,
        business_id: Uuid,
        slot_number: i32,
        issued_at: i64,
    ) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            ticket_id,
            service_id,
            business_id,
            slot_number,
            issued_at,
            hmac: String::new(),
        }
    }

    /// The fixed-order byte string the HMAC is computed over.
    fn canonical_string(&self) -> String {
        format!(
            "v={}&tid={}&sid={}&bid={}&slot={}&iat={}",
            self.version,
            self.ticket_id,
            self.service_id,
            self.business_id,
            self.slot_number,
            self.issued_at,
        )
    }

    /// Compute the HMAC over the canonical string and fill in `hmac`.
    ///
    /// # Errors
    ///
    /// Fails if `key` is empty.
    pub fn sign(&mut self, key: &str) -> Result<(), QrError> {
        if key.is_empty() {
            return Err(QrError::EmptyKey);
        }

        let mut mac =
            HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC key length is valid");
        mac.update(self.canonical_string().as_bytes());
        self.hmac = hex::encode(mac.finalize().into_bytes());
        Ok(())
    }

    /// Recompute the digest and compare it to `hmac` in constant time.
    ///
    /// Returns `false` for an empty key, an unsigned payload, a digest that
    /// is not valid hex, or a digest that does not match. Constant-time
    /// comparison comes from `Mac::verify_slice`.
    pub fn verify(&self, key: &str) -> bool {
        if key.is_empty() || self.hmac.is_empty() {
            return false;
        }

        let Ok(expected) = hex::decode(&self.hmac) else {
            return false;
        };

        let mut mac =
            HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC key length is valid");
        mac.update(self.canonical_string().as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    /// Serialize the full payload (including `hmac`) to compact JSON and
    /// base64url-encode it. This is the string carried by the QR image.
    pub fn encode(&self) -> Result<String, QrError> {
        let data = serde_json::to_vec(self)?;
        Ok(URL_SAFE.encode(data))
    }
}

/// Decode a base64url string back into a payload.
///
/// Rejects malformed base64, malformed JSON (including identifiers that are
/// not well-formed UUIDs), and any version other than 1. Unknown future
/// versions must be rejected, not have their fields ignored.
pub fn decode(encoded: &str) -> Result<QrPayload, QrError> {
    let data = URL_SAFE.decode(encoded)?;
    let payload: QrPayload = serde_json::from_slice(&data)?;

    if payload.version != PAYLOAD_VERSION {
        return Err(QrError::UnsupportedVersion(payload.version));
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn sample() -> QrPayload {
        QrPayload::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            7,
            1_750_000_000,
        )
    }

    #[test]
    fn sign_fills_lowercase_hex_digest() {
        let mut payload = sample();
        payload.sign(KEY).unwrap();

        assert_eq!(payload.hmac.len(), 64);
        assert!(payload.hmac.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(payload.hmac, payload.hmac.to_lowercase());
    }

    #[test]
    fn sign_rejects_empty_key() {
        let mut payload = sample();
        assert!(matches!(payload.sign(""), Err(QrError::EmptyKey)));
    }

    #[test]
    fn signing_is_deterministic_per_key() {
        let mut a = sample();
        let mut b = a.clone();
        a.sign(KEY).unwrap();
        b.sign(KEY).unwrap();
        assert_eq!(a.hmac, b.hmac);

        let mut c = a.clone();
        c.sign("a different key").unwrap();
        assert_ne!(a.hmac, c.hmac);
    }

    #[test]
    fn verify_accepts_signed_payload() {
        let mut payload = sample();
        payload.sign(KEY).unwrap();
        assert!(payload.verify(KEY));
    }

    #[test]
    fn verify_rejects_wrong_key_unsigned_and_garbage_digest() {
        let mut payload = sample();
        payload.sign(KEY).unwrap();
        assert!(!payload.verify("another key"));
        assert!(!payload.verify(""));

        let unsigned = sample();
        assert!(!unsigned.verify(KEY));

        let mut garbled = payload.clone();
        garbled.hmac = "not-hex".to_string();
        assert!(!garbled.verify(KEY));
    }

    #[test]
    fn tampering_any_field_invalidates_signature() {
        let mut payload = sample();
        payload.sign(KEY).unwrap();

        let mut tampered = payload.clone();
        tampered.version = 2;
        assert!(!tampered.verify(KEY));

        let mut tampered = payload.clone();
        tampered.ticket_id = Uuid::new_v4();
        assert!(!tampered.verify(KEY));

        let mut tampered = payload.clone();
        tampered.service_id = Uuid::new_v4();
        assert!(!tampered.verify(KEY));

        let mut tampered = payload.clone();
        tampered.business_id = Uuid::new_v4();
        assert!(!tampered.verify(KEY));

        let mut tampered = payload.clone();
        tampered.slot_number += 1;
        assert!(!tampered.verify(KEY));

        // Shifting iat by a single second must break the signature.
        let mut tampered = payload.clone();
        tampered.issued_at += 1;
        assert!(!tampered.verify(KEY));
    }

    #[test]
    fn encode_decode_round_trip_is_identity() {
        let mut payload = sample();
        payload.sign(KEY).unwrap();

        let encoded = payload.encode().unwrap();
        let decoded = decode(&encoded).unwrap();

        assert_eq!(decoded, payload);
        assert!(decoded.verify(KEY));
    }

    #[test]
    fn decode_rejects_malformed_base64() {
        assert!(matches!(decode("!!! not base64 !!!"), Err(QrError::Base64(_))));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let encoded = URL_SAFE.encode(b"this is not json");
        assert!(matches!(decode(&encoded), Err(QrError::Json(_))));
    }

    #[test]
    fn decode_rejects_non_uuid_identifiers() {
        let encoded = URL_SAFE.encode(
            br#"{"v":1,"tid":"not-a-uuid","sid":"also-bad","bid":"nope","slot":1,"iat":0,"hmac":""}"#,
        );
        assert!(matches!(decode(&encoded), Err(QrError::Json(_))));
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let mut payload = sample();
        payload.sign(KEY).unwrap();
        payload.version = 2;

        let encoded = payload.encode().unwrap();
        assert!(matches!(decode(&encoded), Err(QrError::UnsupportedVersion(2))));
    }

    #[test]
    fn wire_format_uses_short_keys() {
        let mut payload = sample();
        payload.sign(KEY).unwrap();

        let encoded = payload.encode().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE.decode(encoded).unwrap()).unwrap();

        for key in ["v", "tid", "sid", "bid", "slot", "iat", "hmac"] {
            assert!(json.get(key).is_some(), "missing wire key {key}");
        }
    }
}
