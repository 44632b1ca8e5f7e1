//! Learning the outcome of a proof session.
//!
//! In [`DeliveryMode::Callback`] the proof service posts the proof to us and
//! the HTTP layer hands it straight to the completion handler. A
//! [`StatusPoller`] task queries the session status on a fixed interval until
//! it reaches a terminal state, the timeout cap expires, or it is cancelled.
//! In [`DeliveryMode::Poll`] it is the only delivery path; in callback mode it
//! runs as a fallback and stops as soon as the callback has completed the
//! record. [`PollRegistry`] keeps one such task per link.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use reval_proof::{ProofService, SessionId, SessionStatus};
use reval_types::VerificationLink;

use crate::{CompletionHandler, GateError, GateMetrics};

/// How proof outcomes reach the gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// The proof service posts the proof to `/api/callback/<link>`.
    Callback,
    /// The gate polls the session status.
    #[default]
    Poll,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "callback" => Ok(DeliveryMode::Callback),
            "poll" => Ok(DeliveryMode::Poll),
            other => Err(format!("unknown delivery mode: {other}")),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::Callback => f.write_str("callback"),
            DeliveryMode::Poll => f.write_str("poll"),
        }
    }
}

/// Latest known state of a link's status poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollState {
    InProgress,
    /// The proof arrived and the record was completed.
    Succeeded,
    /// The proof session failed; the member may retry.
    Failed(String),
    TimedOut,
    /// A proof arrived but completion refused or failed.
    CompletionFailed(String),
    Cancelled,
}

impl PollState {
    pub fn is_running(&self) -> bool {
        matches!(self, PollState::InProgress)
    }

    /// Whether the member should be offered a fresh attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PollState::Failed(_) | PollState::TimedOut | PollState::Cancelled
        )
    }
}

/// Polls one proof session until it resolves.
pub struct StatusPoller {
    proof: Arc<dyn ProofService>,
    completion: Arc<CompletionHandler>,
    interval: Duration,
    timeout: Duration,
}

impl StatusPoller {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    pub fn new(
        proof: Arc<dyn ProofService>,
        completion: Arc<CompletionHandler>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            proof,
            completion,
            interval,
            timeout,
        }
    }

    /// Wait one interval, query, repeat.
    ///
    /// Query errors are logged and polling continues. The first successful
    /// status triggers completion exactly once.
    pub async fn poll(
        &self,
        link: &VerificationLink,
        session_id: &SessionId,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> PollState {
        let deadline = Instant::now() + self.timeout;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    tracing::debug!(%link, session = %session_id, "status poll stopped by shutdown");
                    return PollState::Cancelled;
                }
            }
            if Instant::now() > deadline {
                tracing::info!(%link, session = %session_id, "status poll timed out");
                return PollState::TimedOut;
            }
            if self.completion.is_verified(link) {
                tracing::debug!(%link, session = %session_id, "record completed elsewhere");
                return PollState::Succeeded;
            }

            match self.proof.session_status(session_id).await {
                Ok(SessionStatus::Pending) => {
                    tracing::trace!(%link, session = %session_id, "proof still pending");
                }
                Ok(SessionStatus::Successful(proof)) => {
                    return match self.completion.complete(link, Some(&proof)).await {
                        Ok(_) | Err(GateError::AlreadyVerified(_)) => PollState::Succeeded,
                        Err(e) => PollState::CompletionFailed(e.to_string()),
                    };
                }
                Ok(SessionStatus::Failed(reason)) => {
                    tracing::info!(%link, session = %session_id, %reason, "proof session failed");
                    return PollState::Failed(reason);
                }
                Err(e) => {
                    tracing::warn!(%link, session = %session_id, error = %e, "status query failed");
                }
            }
        }
    }
}

struct PollEntry {
    session_id: SessionId,
    state: PollState,
    handle: Option<JoinHandle<()>>,
    /// Set when the entry leaves `InProgress`.
    finished_at: Option<Instant>,
}

impl PollEntry {
    fn stop(&mut self, state: PollState) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.state = state;
        self.finished_at = Some(Instant::now());
    }
}

/// One status-poll task per link, plus the last state each one reached.
///
/// Terminal entries are kept for [`PollRegistry::RETENTION`] so the status
/// page can show the outcome, then evicted on the next start or finish.
#[derive(Clone)]
pub struct PollRegistry {
    entries: Arc<Mutex<HashMap<String, PollEntry>>>,
    metrics: Arc<GateMetrics>,
}

impl PollRegistry {
    pub const RETENTION: Duration = Duration::from_secs(600);

    pub fn new(metrics: Arc<GateMetrics>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            metrics,
        }
    }

    /// Start polling `session_id` for `link` unless that exact session is
    /// already being polled. A different session replaces a running poll.
    ///
    /// Returns `false` when nothing new was started.
    pub fn start(
        &self,
        link: &VerificationLink,
        session_id: SessionId,
        poller: Arc<StatusPoller>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> bool {
        let mut entries = self.lock();
        Self::evict_expired(&mut entries);
        if let Some(entry) = entries.get_mut(link.as_str()) {
            if entry.session_id == session_id {
                return false;
            }
            if entry.state.is_running() {
                entry.stop(PollState::Cancelled);
                self.metrics.active_polls.dec();
                tracing::info!(%link, old = %entry.session_id, new = %session_id, "replacing status poll");
            }
        }

        self.metrics.polls_started.inc();
        self.metrics.active_polls.inc();

        let registry = self.clone();
        let task_link = link.clone();
        let task_session = session_id.clone();
        let handle = tokio::spawn(async move {
            let state = poller.poll(&task_link, &task_session, &mut shutdown).await;
            registry.finish(&task_link, &task_session, state);
        });

        entries.insert(
            link.to_string(),
            PollEntry {
                session_id,
                state: PollState::InProgress,
                handle: Some(handle),
                finished_at: None,
            },
        );
        true
    }

    /// Abort the running poll for `link`. Returns whether one was running.
    pub fn cancel(&self, link: &VerificationLink) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(link.as_str()) {
            Some(entry) if entry.state.is_running() => {
                entry.stop(PollState::Cancelled);
                self.metrics.active_polls.dec();
                tracing::info!(%link, session = %entry.session_id, "status poll cancelled");
                true
            }
            _ => false,
        }
    }

    /// Abort every running poll.
    pub fn cancel_all(&self) {
        let mut entries = self.lock();
        for entry in entries.values_mut().filter(|e| e.state.is_running()) {
            entry.stop(PollState::Cancelled);
            self.metrics.active_polls.dec();
        }
    }

    pub fn state(&self, link: &VerificationLink) -> Option<PollState> {
        self.lock().get(link.as_str()).map(|e| e.state.clone())
    }

    pub fn session(&self, link: &VerificationLink) -> Option<SessionId> {
        self.lock().get(link.as_str()).map(|e| e.session_id.clone())
    }

    pub fn running(&self) -> usize {
        self.lock().values().filter(|e| e.state.is_running()).count()
    }

    /// Entries currently held, running or terminal.
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    fn finish(&self, link: &VerificationLink, session_id: &SessionId, state: PollState) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(link.as_str()) {
            if &entry.session_id == session_id && entry.state.is_running() {
                tracing::debug!(%link, session = %session_id, state = ?state, "status poll finished");
                entry.handle = None;
                entry.stop(state);
                self.metrics.polls_finished.inc();
                self.metrics.active_polls.dec();
            }
        }
        Self::evict_expired(&mut entries);
    }

    fn evict_expired(entries: &mut HashMap<String, PollEntry>) {
        let before = entries.len();
        entries.retain(|_, entry| match entry.finished_at {
            Some(at) => at.elapsed() < Self::RETENTION,
            None => true,
        });
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted finished status polls");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PollEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
