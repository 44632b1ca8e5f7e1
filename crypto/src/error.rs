use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("OS random source unavailable: {0}")]
    Entropy(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
