//! LMDB storage backend for the ReVal join gate.
//!
//! Implements the storage traits from `reval-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more LMDB databases within a
//! single environment.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod schema;
pub mod verification;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_integrity, IntegrityReport};
pub use verification::LmdbVerificationStore;
