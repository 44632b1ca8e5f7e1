//! Proof-session types and their wire formats.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::ProofError;

/// Identifier of one proof session, issued by the proof service.
///
/// Session ids come back to us through a redirect query string and are
/// spliced into the status URL path, so only `[A-Za-z0-9_-]` is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub const MAX_LEN: usize = 128;

    pub fn parse(raw: impl Into<String>) -> Result<Self, ProofError> {
        let s = raw.into();
        let valid = !s.is_empty()
            && s.len() <= Self::MAX_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(s))
        } else {
            Err(ProofError::InvalidSessionId(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ProofError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// A signed request to open a proof session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub app_id: String,
    pub provider_id: String,
    /// Unix seconds, rendered as a string like the signed payload.
    pub timestamp: String,
    /// Hex HMAC over the canonical `{providerId, timestamp}` document.
    pub signature: String,
    /// Value the proof's claim context must carry: the verification link.
    pub context: String,
    /// Where the member's browser returns after the proof flow;
    /// `{sessionId}` is substituted by the proof service.
    pub redirect_url: String,
    /// Where the proof service posts the finished proof in callback mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// An opened proof session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: SessionId,
    /// URL the member opens to produce the proof.
    pub request_url: String,
    /// URL that reports this session's status.
    pub status_url: String,
}

/// Observed state of a proof session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionStatus {
    Pending,
    Successful(Value),
    Failed(String),
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

/// `POST /api/sdk/init/session` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitSessionResponse {
    pub session_id: String,
    pub request_url: String,
}

/// `GET /api/sdk/session/{id}` response.
///
/// The service has spelled the success status both `SUCCESSFUL` and
/// `SUCCESFULL`; both are accepted.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub proof: Option<Value>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl StatusResponse {
    pub(crate) fn into_status(self) -> SessionStatus {
        let status = self.status.to_ascii_uppercase();
        match (status.as_str(), self.proof) {
            ("SUCCESSFUL" | "SUCCESFULL", Some(proof)) => SessionStatus::Successful(proof),
            ("FAILED", _) => SessionStatus::Failed(
                self.reason
                    .unwrap_or_else(|| "proof session failed".to_string()),
            ),
            _ => SessionStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(v: Value) -> SessionStatus {
        serde_json::from_value::<StatusResponse>(v)
            .unwrap()
            .into_status()
    }

    #[test]
    fn success_requires_a_proof() {
        assert_eq!(
            status(json!({ "status": "SUCCESSFUL", "proof": { "id": 1 } })),
            SessionStatus::Successful(json!({ "id": 1 }))
        );
        assert_eq!(
            status(json!({ "status": "SUCCESFULL", "proof": { "id": 2 } })),
            SessionStatus::Successful(json!({ "id": 2 }))
        );
        assert_eq!(status(json!({ "status": "SUCCESSFUL" })), SessionStatus::Pending);
    }

    #[test]
    fn failure_carries_reason() {
        assert_eq!(
            status(json!({ "status": "FAILED", "reason": "user declined" })),
            SessionStatus::Failed("user declined".into())
        );
        assert!(matches!(
            status(json!({ "status": "failed" })),
            SessionStatus::Failed(_)
        ));
    }

    #[test]
    fn unknown_statuses_are_pending() {
        for s in ["SESSION_STARTED", "PROOF_GENERATION_STARTED", ""] {
            assert_eq!(status(json!({ "status": s })), SessionStatus::Pending);
        }
    }

    #[test]
    fn session_id_rejects_path_segments() {
        assert!(SessionId::parse("abc-123_X").is_ok());
        assert!(SessionId::parse("../admin").is_err());
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("a/b").is_err());
    }

    #[test]
    fn request_serializes_camel_case_and_skips_missing_callback() {
        let req = ProofRequest {
            app_id: "app".into(),
            provider_id: "prov".into(),
            timestamp: "1".into(),
            signature: "sig".into(),
            context: "abc123".into(),
            redirect_url: "https://gate.example/abc123?sessionId={sessionId}".into(),
            callback_url: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["appId"], "app");
        assert_eq!(v["redirectUrl"], "https://gate.example/abc123?sessionId={sessionId}");
        assert!(v.get("callbackUrl").is_none());
    }
}
