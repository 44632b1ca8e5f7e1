//! Building and signing proof requests.

use serde::Serialize;
use std::fmt;

use reval_crypto::hmac_sha256_hex;
use reval_types::{Timestamp, VerificationLink};

use crate::ProofRequest;

/// The application's registration with the proof service.
///
/// Holds the application secret; it is only ever used to sign requests on
/// the server and is redacted from `Debug` output.
#[derive(Clone)]
pub struct ProofApp {
    pub app_id: String,
    app_secret: String,
    /// Category of proof required from members (e.g. a GitHub account).
    pub provider_id: String,
}

/// The document the signature covers, in canonical (sorted-key) order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedPayload<'a> {
    provider_id: &'a str,
    timestamp: &'a str,
}

impl ProofApp {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            provider_id: provider_id.into(),
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Canonical JSON covered by the request signature.
    pub fn signed_payload(&self, timestamp: &str) -> String {
        let payload = SignedPayload {
            provider_id: &self.provider_id,
            timestamp,
        };
        // Two string fields always serialize.
        serde_json::to_string(&payload).unwrap_or_default()
    }

    /// Sign the canonical payload for `timestamp` with the app secret.
    pub fn sign(&self, timestamp: &str) -> String {
        hmac_sha256_hex(
            self.app_secret.as_bytes(),
            self.signed_payload(timestamp).as_bytes(),
        )
    }

    /// Build a signed request for the given verification link.
    pub fn build_request(
        &self,
        link: &VerificationLink,
        redirect_url: String,
        callback_url: Option<String>,
        now: Timestamp,
    ) -> ProofRequest {
        let timestamp = now.as_secs().to_string();
        ProofRequest {
            app_id: self.app_id.clone(),
            provider_id: self.provider_id.clone(),
            signature: self.sign(&timestamp),
            timestamp,
            context: link.to_string(),
            redirect_url,
            callback_url,
        }
    }
}

impl fmt::Debug for ProofApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofApp")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("provider_id", &self.provider_id)
            .finish()
    }
}
