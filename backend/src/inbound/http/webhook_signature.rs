//! Mercado Pago webhook signature verification.
//!
//! The `x-signature` header has the form `ts=<unix>,v1=<hex>` where `v1` is
//! the HMAC-SHA256 of the manifest `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`
//! keyed with the webhook secret. Manifest parts whose value is absent are
//! left out, as the provider does.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing x-signature header")]
    Missing,
    #[error("malformed x-signature header")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
}

impl From<SignatureError> for Error {
    fn from(value: SignatureError) -> Self {
        Error::unauthorized(format!("invalid webhook signature: {value}"))
            .with_details(serde_json::json!({ "code": "invalid_signature" }))
    }
}

/// Verifies notification signatures when a secret is configured.
#[derive(Clone, Default)]
pub struct WebhookVerifier {
    secret: Option<String>,
}

struct ParsedSignature<'a> {
    ts: &'a str,
    v1: Vec<u8>,
}

fn parse_header(header: &str) -> Result<ParsedSignature<'_>, SignatureError> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ts" => ts = Some(value.trim()),
            "v1" => v1 = Some(value.trim()),
            _ => {}
        }
    }
    let (Some(ts), Some(v1)) = (ts, v1) else {
        return Err(SignatureError::Malformed);
    };
    let v1 = hex::decode(v1).map_err(|_| SignatureError::Malformed)?;
    Ok(ParsedSignature { ts, v1 })
}

fn manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id {
        // Alphanumeric ids are signed in lower case.
        manifest.push_str(&format!("id:{};", id.to_ascii_lowercase()));
    }
    if let Some(request_id) = request_id {
        manifest.push_str(&format!("request-id:{request_id};"));
    }
    manifest.push_str(&format!("ts:{ts};"));
    manifest
}

fn mac_for(secret: &str, manifest: &str) -> Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())?;
    mac.update(manifest.as_bytes());
    Ok(mac)
}

impl WebhookVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|secret| !secret.trim().is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Check the signature of one notification.
    ///
    /// Always succeeds when no secret is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the header is missing, malformed or
    /// does not match the manifest.
    pub fn verify(
        &self,
        signature: Option<&str>,
        request_id: Option<&str>,
        data_id: Option<&str>,
    ) -> Result<(), SignatureError> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(());
        };
        let parsed = parse_header(signature.ok_or(SignatureError::Missing)?)?;
        mac_for(secret, &manifest(data_id, request_id, parsed.ts))
            .map_err(|_| SignatureError::Mismatch)?
            .verify_slice(&parsed.v1)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Header value a provider would send for these inputs.
    #[cfg(test)]
    pub(crate) fn sign(&self, request_id: Option<&str>, data_id: Option<&str>, ts: &str) -> String {
        let secret = self.secret.as_deref().unwrap_or_default();
        let digest = mac_for(secret, &manifest(data_id, request_id, ts))
            .expect("HMAC accepts keys of any length")
            .finalize()
            .into_bytes();
        format!("ts={ts},v1={}", hex::encode(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const TS: &str = "1704908010";
    const REQUEST_ID: &str = "bb56a2f1-6aae-46ac-982e-9dcd3581d08e";

    #[fixture]
    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(Some("webhook-secret".to_owned()))
    }

    #[rstest]
    fn builds_provider_manifest() {
        assert_eq!(
            manifest(Some("123456"), Some(REQUEST_ID), TS),
            format!("id:123456;request-id:{REQUEST_ID};ts:{TS};")
        );
        assert_eq!(manifest(None, None, TS), format!("ts:{TS};"));
    }

    #[rstest]
    fn accepts_a_valid_signature(verifier: WebhookVerifier) {
        let header = verifier.sign(Some(REQUEST_ID), Some("123456"), TS);
        assert_eq!(
            verifier.verify(Some(&header), Some(REQUEST_ID), Some("123456")),
            Ok(())
        );
    }

    #[rstest]
    fn header_parts_may_be_spaced_and_reordered(verifier: WebhookVerifier) {
        let header = verifier.sign(Some(REQUEST_ID), Some("123456"), TS);
        let (ts, v1) = header.split_once(',').expect("two parts");
        let reordered = format!("{v1} , {ts}");
        assert_eq!(
            verifier.verify(Some(&reordered), Some(REQUEST_ID), Some("123456")),
            Ok(())
        );
    }

    #[rstest]
    #[case::other_payment(Some("999"), Some(REQUEST_ID))]
    #[case::other_request(Some("123456"), Some("another-request"))]
    #[case::no_request_id(Some("123456"), None)]
    fn rejects_a_tampered_manifest(
        verifier: WebhookVerifier,
        #[case] data_id: Option<&str>,
        #[case] request_id: Option<&str>,
    ) {
        let header = verifier.sign(Some(REQUEST_ID), Some("123456"), TS);
        assert_eq!(
            verifier.verify(Some(&header), request_id, data_id),
            Err(SignatureError::Mismatch)
        );
    }

    #[rstest]
    #[case::missing(None, SignatureError::Missing)]
    #[case::no_hash(Some("ts=1704908010"), SignatureError::Malformed)]
    #[case::not_hex(Some("ts=1704908010,v1=zz"), SignatureError::Malformed)]
    fn rejects_bad_headers(
        verifier: WebhookVerifier,
        #[case] header: Option<&str>,
        #[case] expected: SignatureError,
    ) {
        assert_eq!(
            verifier.verify(header, Some(REQUEST_ID), Some("1")),
            Err(expected)
        );
    }

    #[rstest]
    #[case::none(None)]
    #[case::blank(Some("  ".to_owned()))]
    fn without_a_secret_everything_passes(#[case] secret: Option<String>) {
        let verifier = WebhookVerifier::new(secret);
        assert!(!verifier.is_enabled());
        assert_eq!(verifier.verify(None, None, None), Ok(()));
    }

    #[test]
    fn errors_map_to_unauthorised() {
        let error: Error = SignatureError::Mismatch.into();
        assert_eq!(error.code(), crate::domain::ErrorCode::Unauthorized);
    }
}
