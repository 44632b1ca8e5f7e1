use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Store(#[from] reval_store_lmdb::LmdbError),

    #[error("database integrity check failed: {0}")]
    Integrity(String),

    #[error("chat error: {0}")]
    Chat(#[from] reval_chat::ChatError),

    #[error("proof configuration error: {0}")]
    Proof(#[from] reval_proof::ProofError),

    #[error("HTTP server error: {0}")]
    Rpc(#[from] reval_rpc::RpcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
