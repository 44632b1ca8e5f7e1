//! HTTP surface of the join gate.
//!
//! One axum router serves the Telegram webhook, the verification JSON API,
//! proof callbacks, the member-facing status page, health and metrics.

pub mod error;
pub mod handlers;
pub mod page;
pub mod server;

pub use error::{ApiError, RpcError};
pub use server::{router, AppState, RpcServer};
