use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid chat identifier: {0}")]
    InvalidId(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid update payload: {0}")]
    InvalidUpdate(String),

    #[error("chat API request failed: {0}")]
    RequestFailed(String),
}

impl From<teloxide::RequestError> for ChatError {
    fn from(e: teloxide::RequestError) -> Self {
        ChatError::RequestFailed(e.to_string())
    }
}
