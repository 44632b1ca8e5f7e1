//! The assembled workflow.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use reval_chat::{parse_update, ChatService, JoinRequestEvent};
use reval_proof::{ProofApp, ProofService, ProofVerifier, SessionId};
use reval_store::VerificationStore;
use reval_types::{Clock, VerificationLink, VerificationRecord};

use crate::{
    CompletionHandler, DeliveryMode, GateError, GateMetrics, JoinOutcome, JoinRequestListener,
    LinkBuilder, PollRegistry, PollState, RetryPolicy, SessionInitiator, StartedSession,
    StatusPoller,
};

/// External collaborators, shared as trait objects.
pub struct GateDeps {
    pub store: Arc<dyn VerificationStore>,
    pub chat: Arc<dyn ChatService>,
    pub proof: Arc<dyn ProofService>,
    pub verifier: Arc<dyn ProofVerifier>,
    pub clock: Arc<dyn Clock>,
}

pub struct GateSettings {
    pub base_url: String,
    pub app: ProofApp,
    pub mode: DeliveryMode,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub retry: RetryPolicy,
}

impl GateSettings {
    pub fn new(base_url: impl Into<String>, app: ProofApp) -> Self {
        Self {
            base_url: base_url.into(),
            app,
            mode: DeliveryMode::default(),
            poll_interval: StatusPoller::DEFAULT_INTERVAL,
            poll_timeout: StatusPoller::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Entry point for every inbound event: chat updates, page loads, API calls.
pub struct Gate {
    store: Arc<dyn VerificationStore>,
    links: LinkBuilder,
    provider_id: String,
    mode: DeliveryMode,
    accepts_unproven: bool,
    metrics: Arc<GateMetrics>,
    listener: JoinRequestListener,
    initiator: SessionInitiator,
    completion: Arc<CompletionHandler>,
    poller: Arc<StatusPoller>,
    polls: PollRegistry,
    shutdown: broadcast::Sender<()>,
}

impl Gate {
    pub fn new(deps: GateDeps, settings: GateSettings) -> Self {
        let metrics = Arc::new(GateMetrics::new());
        let links = LinkBuilder::new(settings.base_url);
        let accepts_unproven = deps.verifier.name() == "trust";
        let provider_id = settings.app.provider_id().to_string();

        let listener = JoinRequestListener::new(
            deps.store.clone(),
            deps.chat.clone(),
            links.clone(),
            metrics.clone(),
        );
        let initiator = SessionInitiator::new(
            deps.store.clone(),
            deps.proof.clone(),
            settings.app,
            links.clone(),
            settings.mode,
            deps.clock,
            metrics.clone(),
        );
        let completion = Arc::new(CompletionHandler::new(
            deps.store.clone(),
            deps.chat,
            deps.verifier,
            settings.retry,
            metrics.clone(),
        ));
        let poller = Arc::new(StatusPoller::new(
            deps.proof,
            completion.clone(),
            settings.poll_interval,
            settings.poll_timeout,
        ));
        let (shutdown, _) = broadcast::channel(1);

        Self {
            store: deps.store,
            links,
            provider_id,
            mode: settings.mode,
            accepts_unproven,
            polls: PollRegistry::new(metrics.clone()),
            metrics,
            listener,
            initiator,
            completion,
            poller,
            shutdown,
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Proof provider members verify with.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Whether proof-less completion is allowed (trust verification only).
    pub fn accepts_unproven(&self) -> bool {
        self.accepts_unproven
    }

    /// Handle a raw chat-platform update. Updates other than join requests
    /// are ignored.
    pub async fn handle_update(&self, body: &[u8]) -> Result<Option<JoinOutcome>, GateError> {
        match parse_update(body)? {
            Some(event) => self.handle_join_request(&event).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn handle_join_request(
        &self,
        event: &JoinRequestEvent,
    ) -> Result<JoinOutcome, GateError> {
        self.listener.handle(event).await
    }

    pub fn record(&self, link: &VerificationLink) -> Result<VerificationRecord, GateError> {
        Ok(self.store.get_by_link(link)?)
    }

    pub async fn start_session(&self, link: &VerificationLink) -> Result<StartedSession, GateError> {
        self.initiator.start(link).await
    }

    /// Complete with a proof, from the page, the API, or a callback.
    pub async fn complete(
        &self,
        link: &VerificationLink,
        proof: &Value,
    ) -> Result<VerificationRecord, GateError> {
        self.completion.complete(link, Some(proof)).await
    }

    /// Legacy completion without a proof.
    pub async fn complete_unproven(
        &self,
        link: &VerificationLink,
    ) -> Result<VerificationRecord, GateError> {
        if !self.accepts_unproven {
            return Err(GateError::ProofRequired(link.to_string()));
        }
        self.completion.complete(link, None).await
    }

    pub fn update_status_url(
        &self,
        link: &VerificationLink,
        url: &str,
    ) -> Result<VerificationRecord, GateError> {
        let record = self.store.set_status_url(link, url)?;
        tracing::debug!(%link, "status URL updated");
        Ok(record)
    }

    /// Start polling a session. Returns whether a new poll started; repeated
    /// calls for the same session are no-ops.
    ///
    /// Callback mode polls too, so a callback that never arrives still ends
    /// in a terminal state under the timeout cap.
    pub fn watch(&self, link: &VerificationLink, session_id: SessionId) -> bool {
        self.polls.start(
            link,
            session_id,
            self.poller.clone(),
            self.shutdown.subscribe(),
        )
    }

    pub fn poll_state(&self, link: &VerificationLink) -> Option<PollState> {
        self.polls.state(link)
    }

    pub fn cancel_poll(&self, link: &VerificationLink) -> bool {
        self.polls.cancel(link)
    }

    /// Stop every running poll.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
        self.polls.cancel_all();
        tracing::info!("gate shut down");
    }
}
