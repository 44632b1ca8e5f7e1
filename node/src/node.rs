//! The gate process: wires storage, clients and the HTTP server together.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use reval_chat::TelegramChat;
use reval_gate::{Gate, GateDeps, GateSettings};
use reval_proof::{AttestorVerifier, ProofApp, ProofHttpClient, ProofVerifier, TrustVerifier};
use reval_rpc::{AppState, RpcServer};
use reval_store::VerificationStore;
use reval_store_lmdb::{check_integrity, LmdbEnvironment};
use reval_types::{Clock, SystemClock};

use crate::config::{GateConfig, ProofConfig, ProofVerification};
use crate::error::NodeError;
use crate::shutdown::ShutdownController;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running gate.
pub struct GateNode {
    pub config: GateConfig,
    pub gate: Arc<Gate>,
    pub shutdown: Arc<ShutdownController>,
    chat: Arc<TelegramChat>,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl GateNode {
    /// Validate the configuration, open storage and build the gate.
    ///
    /// Refuses to start on a database that fails its integrity check.
    pub async fn new(config: GateConfig) -> Result<Self, NodeError> {
        config.validate()?;

        let environment = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)?;
        let report = check_integrity(&environment)?;
        if !report.is_healthy() {
            for error in &report.errors {
                tracing::error!(%error, "integrity check");
            }
            return Err(NodeError::Integrity(format!(
                "{} problems found in {}",
                report.errors.len(),
                config.data_dir.display()
            )));
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn VerificationStore> =
            Arc::new(environment.verification_store(clock.clone()));
        tracing::info!(
            records = report.records,
            live = report.live_records,
            data_dir = %config.data_dir.display(),
            "verification store opened"
        );

        let chat = Arc::new(TelegramChat::new(config.bot_token.expose()));
        let proof = Arc::new(ProofHttpClient::new(config.proof.api_base_url.clone()));
        let verifier = build_verifier(&config.proof)?;

        let settings = GateSettings {
            base_url: config.base_url.clone(),
            app: ProofApp::new(
                config.proof.app_id.clone(),
                config.proof.app_secret.expose(),
                config.proof.provider_id.clone(),
            ),
            mode: config.proof.delivery_mode,
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            retry: config.retry_policy(),
        };
        let gate = Arc::new(Gate::new(
            GateDeps {
                store,
                chat: chat.clone(),
                proof,
                verifier,
                clock,
            },
            settings,
        ));

        Ok(Self {
            config,
            gate,
            shutdown: Arc::new(ShutdownController::new()),
            chat,
            task_handles: Vec::new(),
        })
    }

    /// Register the webhook if configured, serve HTTP, and block until a
    /// shutdown signal arrives.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let addr = self.config.socket_addr()?;
        let server = RpcServer::bind(addr, AppState::new(self.gate.clone())).await?;

        if self.config.register_webhook {
            let url = self.gate.links().webhook_url();
            self.chat.register_webhook(&url).await?;
            tracing::info!(%url, "telegram webhook registered");
        }

        let shutdown_signal = self.shutdown.signalled();
        let shutdown = self.shutdown.clone();
        let server_handle = tokio::spawn(async move {
            if let Err(e) = server.serve(shutdown_signal).await {
                tracing::error!(error = %e, "HTTP server failed");
                shutdown.shutdown();
            }
        });
        self.task_handles.push(server_handle);

        tracing::info!(
            %addr,
            base_url = %self.config.base_url,
            mode = %self.config.proof.delivery_mode,
            verifier = ?self.config.proof.proof_verification,
            "ReVal gate started"
        );

        self.shutdown.wait_for_signal().await;
        Ok(())
    }

    /// Stop polls, drain the HTTP server and wait for background tasks.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("ReVal gate stopping");
        self.shutdown.shutdown();
        self.gate.shutdown();

        let handles = std::mem::take(&mut self.task_handles);
        let wait_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background task ended abnormally");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}): some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        tracing::info!("ReVal gate stopped");
        Ok(())
    }
}

/// Build the proof verifier selected by configuration.
pub fn build_verifier(config: &ProofConfig) -> Result<Arc<dyn ProofVerifier>, NodeError> {
    match config.proof_verification {
        ProofVerification::Trust => {
            tracing::warn!("proof verification disabled: every submitted proof is accepted");
            Ok(Arc::new(TrustVerifier))
        }
        ProofVerification::Attestor => Ok(Arc::new(AttestorVerifier::from_hex_keys(
            config.provider_id.clone(),
            &config.attestor_keys,
            config.min_attestor_signatures,
        )?)),
    }
}
