//! Marks a record verified and admits the member.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use reval_chat::ChatService;
use reval_proof::ProofVerifier;
use reval_store::VerificationStore;
use reval_types::{VerificationLink, VerificationRecord};

use crate::{GateError, GateMetrics};

/// Retry schedule for join approvals: `max_attempts` tries, waiting
/// `base_delay`, then twice that, and so on between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// The single place where a record transitions to verified.
///
/// Order of operations:
/// 1. look the record up (`NotFound`)
/// 2. refuse verified records (`AlreadyVerified`)
/// 3. check the proof, when one is supplied (`InvalidProof`)
/// 4. compare-and-set the status in the store
/// 5. approve the join request, retrying with backoff
///
/// The record is marked before approval so that approval runs at most once
/// per record. If every approval attempt fails the record stays verified and
/// the call reports `Upstream`.
pub struct CompletionHandler {
    store: Arc<dyn VerificationStore>,
    chat: Arc<dyn ChatService>,
    verifier: Arc<dyn ProofVerifier>,
    retry: RetryPolicy,
    metrics: Arc<GateMetrics>,
}

impl CompletionHandler {
    pub fn new(
        store: Arc<dyn VerificationStore>,
        chat: Arc<dyn ChatService>,
        verifier: Arc<dyn ProofVerifier>,
        retry: RetryPolicy,
        metrics: Arc<GateMetrics>,
    ) -> Self {
        Self {
            store,
            chat,
            verifier,
            retry,
            metrics,
        }
    }

    /// Whether the record behind `link` has already been completed.
    pub fn is_verified(&self, link: &VerificationLink) -> bool {
        self.store
            .get_by_link(link)
            .map(|record| record.verification_status)
            .unwrap_or(false)
    }

    pub async fn complete(
        &self,
        link: &VerificationLink,
        proof: Option<&Value>,
    ) -> Result<VerificationRecord, GateError> {
        let result = self.try_complete(link, proof).await;
        if let Err(
            GateError::NotFound(_) | GateError::AlreadyVerified(_) | GateError::InvalidProof(_),
        ) = &result
        {
            self.metrics.completion_rejections.inc();
        }
        result
    }

    async fn try_complete(
        &self,
        link: &VerificationLink,
        proof: Option<&Value>,
    ) -> Result<VerificationRecord, GateError> {
        let record = self.store.get_by_link(link)?;
        if record.verification_status {
            return Err(GateError::AlreadyVerified(link.to_string()));
        }

        if let Some(proof) = proof {
            self.verifier.verify(link, proof).map_err(|e| {
                tracing::warn!(%link, verifier = self.verifier.name(), error = %e, "proof rejected");
                GateError::from(e)
            })?;
        }

        let record = self.store.mark_verified(link)?;
        self.metrics.completions.inc();
        tracing::info!(
            %link,
            group = %record.group_id,
            member = %record.member_id,
            "verification record marked verified"
        );

        self.approve_with_retry(&record).await?;
        Ok(record)
    }

    async fn approve_with_retry(&self, record: &VerificationRecord) -> Result<(), GateError> {
        let mut last_error = None;
        for attempt in 1..=self.retry.max_attempts {
            match self
                .chat
                .approve_join_request(&record.group_id, &record.member_id)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        group = %record.group_id,
                        member = %record.member_id,
                        attempt,
                        "join request approved"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        group = %record.group_id,
                        member = %record.member_id,
                        attempt,
                        error = %e,
                        "join approval failed"
                    );
                    last_error = Some(e);
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        self.metrics.approval_failures.inc();
        tracing::error!(
            link = %record.verification_link,
            "record verified but join approval failed after all retries"
        );
        Err(last_error
            .map(GateError::from)
            .unwrap_or_else(|| GateError::Upstream("join approval failed".into())))
    }
}
