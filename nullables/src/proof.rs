//! Nullable proof service: scripted session statuses.

use async_trait::async_trait;
use reval_proof::{ProofError, ProofRequest, ProofService, SessionHandle, SessionId, SessionStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A test [`ProofService`] that answers status queries from a script.
///
/// Each query pops the next scripted answer; once the script is exhausted
/// every query reports `Pending`.
#[derive(Default)]
pub struct NullProofService {
    script: Mutex<VecDeque<Result<SessionStatus, ProofError>>>,
    requests: Mutex<Vec<ProofRequest>>,
    queries: AtomicUsize,
    fail_create: AtomicBool,
}

impl NullProofService {
    pub const BASE_URL: &'static str = "https://proof.null";

    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose status queries return `statuses` in order.
    pub fn scripted(statuses: impl IntoIterator<Item = SessionStatus>) -> Self {
        let service = Self::new();
        for status in statuses {
            service.push_status(status);
        }
        service
    }

    pub fn push_status(&self, status: SessionStatus) {
        self.script.lock().unwrap().push_back(Ok(status));
    }

    /// Queue a transient query failure.
    pub fn push_error(&self, error: ProofError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Number of status queries made so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Session requests received, in order.
    pub fn requests(&self) -> Vec<ProofRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProofService for NullProofService {
    async fn create_session(&self, request: &ProofRequest) -> Result<SessionHandle, ProofError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ProofError::Unreachable("null proof service set to fail".into()));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let session_id = SessionId::parse(format!("null-session-{}", requests.len()))?;
        Ok(SessionHandle {
            request_url: format!("{}/verify/{}", Self::BASE_URL, session_id),
            status_url: self.status_url(&session_id),
            session_id,
        })
    }

    async fn session_status(&self, _session_id: &SessionId) -> Result<SessionStatus, ProofError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(SessionStatus::Pending))
    }

    fn status_url(&self, session_id: &SessionId) -> String {
        format!("{}/api/sdk/session/{}", Self::BASE_URL, session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn plays_script_then_pends() {
        let proof = NullProofService::scripted([SessionStatus::Successful(json!({}))]);
        let id = SessionId::parse("x").unwrap();
        assert!(matches!(
            proof.session_status(&id).await,
            Ok(SessionStatus::Successful(_))
        ));
        assert!(matches!(
            proof.session_status(&id).await,
            Ok(SessionStatus::Pending)
        ));
        assert_eq!(proof.queries(), 2);
    }
}
