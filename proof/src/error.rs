use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("proof service unreachable: {0}")]
    Unreachable(String),

    #[error("proof service request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from proof service: {0}")]
    InvalidResponse(String),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("proof rejected: {0}")]
    Rejected(String),

    #[error("proof configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ProofError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProofError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            ProofError::Unreachable(format!("connection failed: {e}"))
        } else if e.is_decode() {
            ProofError::InvalidResponse(e.to_string())
        } else {
            ProofError::RequestFailed(e.to_string())
        }
    }
}
