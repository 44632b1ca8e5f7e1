//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use reval_gate::GateError;

/// Server lifecycle failures.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// A failed API call, rendered as `{"error": "..."}`.
///
/// Bodies carry fixed messages; internal details only go to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Gate(e) => match e {
                GateError::NotFound(_) => StatusCode::NOT_FOUND,
                GateError::AlreadyVerified(_)
                | GateError::InvalidProof(_)
                | GateError::ProofRequired(_) => StatusCode::BAD_REQUEST,
                GateError::SessionInFlight(_) => StatusCode::CONFLICT,
                GateError::ProofFailure(_) => StatusCode::BAD_GATEWAY,
                GateError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn public_message(&self) -> &str {
        match self {
            ApiError::Gate(e) => match e {
                GateError::NotFound(_) => "Verification not found",
                GateError::AlreadyVerified(_) => "Already verified",
                GateError::InvalidProof(_) => "Invalid proof",
                GateError::ProofRequired(_) => "Proof required",
                GateError::SessionInFlight(_) => "Verification already in progress",
                GateError::ProofFailure(_) => "Proof service unavailable",
                GateError::Upstream(_) => "Internal server error",
            },
            ApiError::InvalidRequest(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
