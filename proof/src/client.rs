//! HTTP client for the proof service.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ProofError;
use crate::types::{InitSessionResponse, StatusResponse};
use crate::{ProofRequest, SessionHandle, SessionId, SessionStatus};

/// Default timeout for proof-service requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Operations the gate needs from the proof protocol.
#[async_trait]
pub trait ProofService: Send + Sync {
    /// Open a session for a signed request.
    async fn create_session(&self, request: &ProofRequest) -> Result<SessionHandle, ProofError>;

    /// Query the current status of a session.
    async fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus, ProofError>;

    /// URL reporting the status of `session_id`.
    fn status_url(&self, session_id: &SessionId) -> String;
}

/// Client for a proof service reachable over HTTP.
///
/// `POST {base}/api/sdk/init/session` opens a session;
/// `GET {base}/api/sdk/session/{id}` reports its status.
pub struct ProofHttpClient {
    base_url: String,
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
}

impl ProofHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ProofService for ProofHttpClient {
    async fn create_session(&self, request: &ProofRequest) -> Result<SessionHandle, ProofError> {
        let url = format!("{}/api/sdk/init/session", self.base_url);
        let response = self.http_client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(ProofError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let init: InitSessionResponse = response.json().await.map_err(|e| {
            ProofError::InvalidResponse(format!("failed to parse session response: {e}"))
        })?;
        let session_id = SessionId::parse(init.session_id)?;
        tracing::debug!(session = %session_id, context = %request.context, "proof session opened");

        Ok(SessionHandle {
            status_url: self.status_url(&session_id),
            session_id,
            request_url: init.request_url,
        })
    }

    async fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus, ProofError> {
        let url = self.status_url(session_id);
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ProofError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let status: StatusResponse = response.json().await.map_err(|e| {
            ProofError::InvalidResponse(format!("failed to parse status response: {e}"))
        })?;
        Ok(status.into_status())
    }

    fn status_url(&self, session_id: &SessionId) -> String {
        format!("{}/api/sdk/session/{}", self.base_url, session_id)
    }
}
