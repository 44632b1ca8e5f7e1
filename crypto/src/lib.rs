//! Cryptographic primitives for the ReVal join gate.
//!
//! - **Link tokens**: 20 bytes of OS entropy, hex-encoded
//! - **HMAC-SHA256** for signing proof requests with the application secret
//! - **SHA-256** for claim identifiers
//! - **Ed25519** for attestor signatures on proofs

pub mod error;
pub mod hash;
pub mod mac;
pub mod sign;
pub mod token;

pub use error::CryptoError;
pub use hash::{sha256, sha256_hex};
pub use mac::{hmac_sha256_hex, verify_hmac_sha256_hex};
pub use sign::{parse_public_key_hex, sign_message_hex, verify_signature_hex};
pub use token::{generate_link, LINK_ENTROPY_BYTES};
