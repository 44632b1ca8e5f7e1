//! Router and server.

use axum::routing::{delete, get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use reval_gate::Gate;

use crate::handlers;
use crate::RpcError;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
}

impl AppState {
    pub fn new(gate: Arc<Gate>) -> Self {
        Self { gate }
    }
}

/// Build the full router.
///
/// `/api/verify` completes without a proof; unless the gate runs with trust
/// verification it answers 400 "Proof required".
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/bot", post(handlers::bot_webhook))
        .route(
            "/api/completeVerification",
            post(handlers::complete_verification),
        )
        .route("/api/updateStatusUrl", post(handlers::update_status_url))
        .route("/api/session", post(handlers::start_session))
        .route("/api/session/:link", delete(handlers::cancel_session))
        .route("/api/callback/:link", post(handlers::proof_callback))
        .route("/api/verify", post(handlers::verify))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/:link", get(handlers::status_page))
        .route("/:link/start", post(handlers::start_from_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// An HTTP server bound to its listening socket.
pub struct RpcServer {
    listener: tokio::net::TcpListener,
    state: AppState,
}

impl RpcServer {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr, state: AppState) -> Result<Self, RpcError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| RpcError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "HTTP server listening");
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
