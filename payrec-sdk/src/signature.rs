//! HMAC signing and verification for Payrec payloads.
//!
//! Two flows share the same scheme:
//!
//! * inbound gateway result submissions, verified with the configured
//!   gateway HMAC key;
//! * outbound shop notifications, signed with the shop secret.
//!
//! The wire format for the header is:
//!
//! ```text
//! Payrec-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! where the signature is `HMAC-SHA256("{timestamp}.{json_body}", secret)`.

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "Payrec-Signature";

/// Maximum allowed age of a signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Marker trait for types that can participate in body signing via
/// [`SignedObject`].
pub trait Signature: for<'de> serde::Deserialize<'de> + serde::Serialize {}

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// A signed payload carrying its typed body, timestamp, raw JSON, and
/// HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject<T: Signature> {
    pub body: T,
    pub timestamp: i64,
    pub json: String,
    pub signature: Box<[u8]>,
}

impl<T: Signature> SignedObject<T> {
    /// Serialize `body` to JSON and sign it with `key`.
    pub fn new(body: T, key: &[u8]) -> Result<Self, serde_json::Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let json = serde_json::to_string(&body)?;
        let data = format!("{now}.{json}");
        let signature = ring::hmac::sign(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
            data.as_bytes(),
        );
        let signature = signature.as_ref().to_owned().into_boxed_slice();
        Ok(Self {
            body,
            timestamp: now,
            json,
            signature,
        })
    }

    /// Reconstruct a [`SignedObject`] from a raw `Payrec-Signature` header
    /// value and the JSON request body string.
    ///
    /// This parses the header and deserializes the body but does **not**
    /// verify the HMAC — call [`verify`](Self::verify) for that.
    pub fn from_header_and_body(
        header_value: &str,
        body_json: String,
    ) -> Result<Self, SignatureError> {
        let (timestamp, signature) = parse_signature_header(header_value)?;
        let body: T = serde_json::from_str(&body_json)?;
        Ok(Self {
            body,
            timestamp,
            json: body_json,
            signature,
        })
    }

    /// Verify the HMAC signature and timestamp freshness, consuming `self`
    /// and returning the authenticated payload.
    pub fn verify(self, key: &[u8]) -> Result<T, SignatureError> {
        let data = format!("{}.{}", self.timestamp, self.json);
        ring::hmac::verify(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
            data.as_bytes(),
            self.signature.as_ref(),
        )?;
        check_timestamp(self.timestamp)?;
        Ok(self.body)
    }

    /// Format the full `Payrec-Signature` header value (`{timestamp}.{b64}`).
    pub fn to_header(&self) -> String {
        format_signature_header(self.timestamp, &self.signature)
    }
}

/// Parse a `Payrec-Signature` header value (`{timestamp}.{base64}`) into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let dot_pos = value.find('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = value[..dot_pos]
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(&value[dot_pos + 1..])
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a header value from a timestamp and raw signature bytes.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{timestamp}.{}",
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

/// Verify a `Payrec-Signature` header against a raw (untyped) request body.
///
/// Used where the receiver wants to authenticate the bytes before
/// deserializing them.
pub fn verify_raw_body(
    header_value: &str,
    body: &[u8],
    key: &[u8],
) -> Result<(), SignatureError> {
    let (timestamp, signature) = parse_signature_header(header_value)?;
    let body = std::str::from_utf8(body).map_err(|_| SignatureError::InvalidFormat)?;
    let data = format!("{timestamp}.{body}");
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
        signature.as_ref(),
    )?;
    check_timestamp(timestamp)
}

/// Reject timestamps older than [`MAX_SIGNATURE_AGE`].
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now - timestamp > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Payload {
        transaction_id: String,
        state: String,
    }

    impl Signature for Payload {}

    const KEY: &[u8] = b"test-secret-key";

    #[test]
    fn test_sign_and_verify_round_trip() {
        let payload = Payload {
            transaction_id: "t-1".to_string(),
            state: "paid".to_string(),
        };
        let signed = SignedObject::new(payload.clone(), KEY).unwrap();
        let header = signed.to_header();
        let parsed =
            SignedObject::<Payload>::from_header_and_body(&header, signed.json.clone()).unwrap();
        assert_eq!(parsed.verify(KEY).unwrap(), payload);
    }

    #[test]
    fn test_wrong_key_fails() {
        let payload = Payload {
            transaction_id: "t-1".to_string(),
            state: "paid".to_string(),
        };
        let signed = SignedObject::new(payload, KEY).unwrap();
        let header = signed.to_header();
        let parsed =
            SignedObject::<Payload>::from_header_and_body(&header, signed.json.clone()).unwrap();
        assert!(matches!(
            parsed.verify(b"other-key"),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_tampered_body_fails() {
        let payload = Payload {
            transaction_id: "t-1".to_string(),
            state: "paid".to_string(),
        };
        let signed = SignedObject::new(payload, KEY).unwrap();
        let header = signed.to_header();
        let tampered = signed.json.replace("paid", "open");
        let parsed = SignedObject::<Payload>::from_header_and_body(&header, tampered).unwrap();
        assert!(parsed.verify(KEY).is_err());
    }

    #[test]
    fn test_header_format_parsing() {
        let (timestamp, signature) =
            parse_signature_header(&format_signature_header(1700000000, b"abc")).unwrap();
        assert_eq!(timestamp, 1700000000);
        assert_eq!(signature.as_ref(), b"abc");

        assert!(matches!(
            parse_signature_header("no-dot-here"),
            Err(SignatureError::InvalidFormat)
        ));
        assert!(matches!(
            parse_signature_header("123.!!!"),
            Err(SignatureError::InvalidBase64)
        ));
    }

    #[test]
    fn test_verify_raw_body_matches_signed_object() {
        let payload = Payload {
            transaction_id: "t-9".to_string(),
            state: "failed".to_string(),
        };
        let signed = SignedObject::new(payload, KEY).unwrap();
        assert!(verify_raw_body(&signed.to_header(), signed.json.as_bytes(), KEY).is_ok());
        assert!(verify_raw_body(&signed.to_header(), b"{}", KEY).is_err());
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        assert!(matches!(
            check_timestamp(
                time::OffsetDateTime::now_utc().unix_timestamp() - MAX_SIGNATURE_AGE - 1
            ),
            Err(SignatureError::Expired)
        ));
        assert!(check_timestamp(time::OffsetDateTime::now_utc().unix_timestamp()).is_ok());
    }
}
