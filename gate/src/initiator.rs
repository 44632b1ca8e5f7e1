//! Opens proof sessions for pending records.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use reval_proof::{ProofApp, ProofService, SessionId};
use reval_store::VerificationStore;
use reval_types::{Clock, VerificationLink};

use crate::{DeliveryMode, GateError, GateMetrics, LinkBuilder};

/// A freshly opened proof session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartedSession {
    pub session_id: SessionId,
    /// Where to send the member to produce the proof.
    pub request_url: String,
    pub status_url: String,
}

/// Links with a session start in progress.
#[derive(Clone, Default)]
struct InFlight {
    links: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    fn try_acquire(&self, link: &VerificationLink) -> Option<InFlightGuard> {
        let mut links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        links.insert(link.to_string()).then(|| InFlightGuard {
            links: self.links.clone(),
            link: link.to_string(),
        })
    }
}

/// Releases the link when the start attempt ends, however it ends.
struct InFlightGuard {
    links: Arc<Mutex<HashSet<String>>>,
    link: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.links
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.link);
    }
}

pub struct SessionInitiator {
    store: Arc<dyn VerificationStore>,
    proof: Arc<dyn ProofService>,
    app: ProofApp,
    links: LinkBuilder,
    mode: DeliveryMode,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
    metrics: Arc<GateMetrics>,
}

impl SessionInitiator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn VerificationStore>,
        proof: Arc<dyn ProofService>,
        app: ProofApp,
        links: LinkBuilder,
        mode: DeliveryMode,
        clock: Arc<dyn Clock>,
        metrics: Arc<GateMetrics>,
    ) -> Self {
        Self {
            store,
            proof,
            app,
            links,
            mode,
            clock,
            in_flight: InFlight::default(),
            metrics,
        }
    }

    /// Open a proof session bound to `link` and remember its status URL.
    ///
    /// Only one start per link may be in progress at a time; a concurrent
    /// attempt fails with `SessionInFlight`.
    pub async fn start(&self, link: &VerificationLink) -> Result<StartedSession, GateError> {
        let record = self.store.get_by_link(link)?;
        if record.verification_status {
            return Err(GateError::AlreadyVerified(link.to_string()));
        }

        let _guard = self
            .in_flight
            .try_acquire(link)
            .ok_or_else(|| GateError::SessionInFlight(link.to_string()))?;

        let callback_url = match self.mode {
            DeliveryMode::Callback => Some(self.links.callback_url(link)),
            DeliveryMode::Poll => None,
        };
        let request = self.app.build_request(
            link,
            self.links.redirect_url(link),
            callback_url,
            self.clock.now(),
        );

        let handle = self.proof.create_session(&request).await.map_err(|e| {
            tracing::warn!(%link, error = %e, "could not open proof session");
            GateError::ProofFailure(e.to_string())
        })?;
        self.store.set_status_url(link, &handle.status_url)?;
        self.metrics.sessions_started.inc();

        tracing::info!(%link, session = %handle.session_id, mode = ?self.mode, "proof session started");
        Ok(StartedSession {
            session_id: handle.session_id,
            request_url: handle.request_url,
            status_url: handle.status_url,
        })
    }
}
