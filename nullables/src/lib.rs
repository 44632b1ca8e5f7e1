//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the gate (clock, storage, chat platform,
//! proof service) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be scripted and inspected programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chat;
pub mod clock;
pub mod proof;
pub mod store;

pub use chat::{NullChat, SentMessage};
pub use clock::NullClock;
pub use proof::NullProofService;
pub use store::NullVerificationStore;
