//! Abstract storage traits for the ReVal join gate.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod verification;

pub use error::StoreError;
pub use verification::VerificationStore;
