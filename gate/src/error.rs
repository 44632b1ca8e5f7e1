use thiserror::Error;

use reval_chat::ChatError;
use reval_proof::ProofError;
use reval_store::StoreError;

/// Workflow failures, one variant per outward-facing outcome.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("verification record not found: {0}")]
    NotFound(String),

    #[error("already verified: {0}")]
    AlreadyVerified(String),

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("proof required for {0}")]
    ProofRequired(String),

    #[error("a verification session is already being started for {0}")]
    SessionInFlight(String),

    #[error("proof service failure: {0}")]
    ProofFailure(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<StoreError> for GateError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(link) => GateError::NotFound(link),
            StoreError::AlreadyVerified(link) => GateError::AlreadyVerified(link),
            other => GateError::Upstream(other.to_string()),
        }
    }
}

impl From<ChatError> for GateError {
    fn from(e: ChatError) -> Self {
        GateError::Upstream(e.to_string())
    }
}

impl From<ProofError> for GateError {
    fn from(e: ProofError) -> Self {
        match e {
            ProofError::Rejected(reason) => GateError::InvalidProof(reason),
            other => GateError::ProofFailure(other.to_string()),
        }
    }
}

impl From<reval_crypto::CryptoError> for GateError {
    fn from(e: reval_crypto::CryptoError) -> Self {
        GateError::Upstream(e.to_string())
    }
}
