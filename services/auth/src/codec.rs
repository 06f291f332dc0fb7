//! Signed token codec
//!
//! A token is `base64url(payload_json) + "." + base64url(hmac_sha256(encoded_payload))`.
//! The MAC covers the encoded payload exactly as transmitted, so any change to
//! those bytes without re-signing fails verification. The codec knows nothing
//! about session kinds; typed payloads live in [`crate::sessions`].

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use common::Settings;
use hmac::{Hmac, Mac};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Key used when `SESSION_SECRET` is unset outside production
pub const DEV_FALLBACK_SECRET: &str = "turnstile-dev-secret-not-for-production";

/// Decode failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Not exactly two non-empty dot-separated parts
    #[error("token is malformed")]
    Malformed,

    /// Signature does not match the payload
    #[error("token signature is invalid")]
    BadSignature,

    /// Payload is not a base64url JSON object
    #[error("token payload is invalid")]
    InvalidPayload,
}

/// Process-wide signing secret
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
    dev_fallback: bool,
}

impl SigningKey {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            bytes: secret.as_ref().to_vec(),
            dev_fallback: false,
        }
    }

    /// Pick the signing key from settings
    ///
    /// A missing secret falls back to [`DEV_FALLBACK_SECRET`] in development
    /// (insecure, logged) and is refused in production.
    pub fn resolve(settings: &Settings) -> Result<Self, AuthError> {
        let configured = settings
            .session_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty());

        match configured {
            Some(secret) => Ok(Self::new(secret)),
            None if settings.is_production() => Err(AuthError::MisconfiguredSecret),
            None => {
                warn!(
                    "SESSION_SECRET is not set; signing sessions with the development fallback key. \
                     Sessions are forgeable by anyone who knows it."
                );
                Ok(Self {
                    bytes: DEV_FALLBACK_SECRET.as_bytes().to_vec(),
                    dev_fallback: true,
                })
            }
        }
    }

    pub fn is_dev_fallback(&self) -> bool {
        self.dev_fallback
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("dev_fallback", &self.dev_fallback)
            .finish_non_exhaustive()
    }
}

/// Encodes and verifies signed tokens
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl TokenCodec {
    pub fn new(key: &SigningKey) -> Result<Self, AuthError> {
        let mac = HmacSha256::new_from_slice(&key.bytes).map_err(|_| AuthError::MisconfiguredSecret)?;
        Ok(Self { mac })
    }

    /// Sign a payload
    ///
    /// The payload must serialize to a JSON object.
    pub fn encode<T: Serialize>(&self, payload: &T) -> Result<String, CodecError> {
        let value = serde_json::to_value(payload).map_err(|_| CodecError::InvalidPayload)?;
        if !value.is_object() {
            return Err(CodecError::InvalidPayload);
        }
        let json = serde_json::to_vec(&value).map_err(|_| CodecError::InvalidPayload)?;

        let encoded_payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(encoded_payload.as_bytes()));

        Ok(format!("{}.{}", encoded_payload, signature))
    }

    /// Verify a token and return its payload object
    pub fn decode(&self, token: &str) -> Result<Map<String, Value>, CodecError> {
        let mut parts = token.split('.');
        let (encoded_payload, encoded_signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(payload), Some(signature), None) if !payload.is_empty() && !signature.is_empty() => {
                (payload, signature)
            }
            _ => return Err(CodecError::Malformed),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(encoded_signature)
            .map_err(|_| CodecError::BadSignature)?;

        // verify_slice checks the length first and compares in constant time.
        let mut mac = self.mac.clone();
        mac.update(encoded_payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CodecError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(encoded_payload)
            .map_err(|_| CodecError::InvalidPayload)?;

        match serde_json::from_slice::<Value>(&json) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(CodecError::InvalidPayload),
        }
    }

    /// Verify a token and deserialize its payload into `T`
    pub fn decode_as<T: DeserializeOwned>(&self, token: &str) -> Result<T, CodecError> {
        let map = self.decode(token)?;
        serde_json::from_value(Value::Object(map)).map_err(|_| CodecError::InvalidPayload)
    }

    fn sign(&self, encoded_payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(encoded_payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCodec(**redacted**)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AppEnvironment;
    use serde_json::json;

    fn codec() -> TokenCodec {
        TokenCodec::new(&SigningKey::new("test-secret")).expect("codec")
    }

    #[test]
    fn test_round_trip_preserves_payload() {
        let codec = codec();
        let payloads = [
            json!({}),
            json!({"u": "alice", "k": "admin", "iat": 1000, "exp": 44200}),
            json!({"stationId": "st_1", "eventId": "ev_9", "iat": 0}),
            json!({"role": "superadmin", "oid": null, "iat": 17}),
            json!({"name": "Zoë ✓", "n": -3, "f": 1.5}),
        ];

        for payload in payloads {
            let token = codec.encode(&payload).expect("encode");
            let decoded = codec.decode(&token).expect("decode");
            assert_eq!(Value::Object(decoded), payload);
        }
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = codec()
            .encode(&json!({"blob": "???>>>~~~", "iat": 1}))
            .expect("encode");

        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        );
        assert_eq!(token.matches('.').count(), 1);
    }

    #[test]
    fn test_single_bit_flip_in_payload_is_rejected() {
        let codec = codec();
        let token = codec
            .encode(&json!({"u": "alice", "k": "admin", "iat": 1000, "exp": 2000}))
            .expect("encode");
        let dot = token.find('.').expect("dot");

        for index in 0..dot {
            let mut bytes = token.clone().into_bytes();
            bytes[index] ^= 0x01;
            let tampered = String::from_utf8(bytes).expect("ascii");

            assert_eq!(
                codec.decode(&tampered),
                Err(CodecError::BadSignature),
                "flip at {index} was accepted"
            );
        }
    }

    #[test]
    fn test_other_key_is_rejected() {
        let token = codec().encode(&json!({"iat": 1})).expect("encode");
        let other = TokenCodec::new(&SigningKey::new("another-secret")).expect("codec");

        assert_eq!(other.decode(&token), Err(CodecError::BadSignature));
    }

    #[test]
    fn test_malformed_shapes() {
        let codec = codec();
        for token in ["", ".", "abc", "abc.", ".abc", "a.b.c", "a..b"] {
            assert_eq!(codec.decode(token), Err(CodecError::Malformed), "{token:?}");
        }
    }

    #[test]
    fn test_non_object_payload_is_invalid() {
        let codec = codec();
        let encoded = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        let signature = URL_SAFE_NO_PAD.encode(codec.sign(encoded.as_bytes()));
        let token = format!("{}.{}", encoded, signature);

        assert_eq!(codec.decode(&token), Err(CodecError::InvalidPayload));
        assert_eq!(codec.encode(&json!([1, 2])), Err(CodecError::InvalidPayload));
    }

    #[test]
    fn test_signed_garbage_is_invalid_payload() {
        let codec = codec();
        let encoded = URL_SAFE_NO_PAD.encode(b"{not json");
        let signature = URL_SAFE_NO_PAD.encode(codec.sign(encoded.as_bytes()));

        assert_eq!(
            codec.decode(&format!("{}.{}", encoded, signature)),
            Err(CodecError::InvalidPayload)
        );
    }

    #[test]
    fn test_resolve_uses_dev_fallback_outside_production() {
        let key = SigningKey::resolve(&Settings::default()).expect("dev fallback");
        assert!(key.is_dev_fallback());

        let blank = Settings {
            session_secret: Some("   ".to_string()),
            ..Settings::default()
        };
        assert!(SigningKey::resolve(&blank).expect("dev fallback").is_dev_fallback());
    }

    #[test]
    fn test_resolve_refuses_missing_secret_in_production() {
        let settings = Settings {
            environment: AppEnvironment::Production,
            ..Settings::default()
        };
        assert!(matches!(
            SigningKey::resolve(&settings),
            Err(AuthError::MisconfiguredSecret)
        ));

        let configured = Settings {
            environment: AppEnvironment::Production,
            session_secret: Some("prod-secret".to_string()),
            ..Settings::default()
        };
        assert!(!SigningKey::resolve(&configured).expect("key").is_dev_fallback());
    }
}
