//! The ReVal gate process.
//!
//! [`GateNode`] opens storage, builds the Telegram and proof-service clients
//! from [`GateConfig`], assembles the [`reval_gate::Gate`] and serves it over
//! HTTP until a shutdown signal arrives.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod shutdown;

pub use config::{ApprovalConfig, GateConfig, ProofConfig, ProofVerification, Secret};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::GateNode;
pub use shutdown::ShutdownController;
