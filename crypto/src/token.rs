//! Verification link generation.

use reval_types::VerificationLink;

use crate::CryptoError;

/// Bytes of entropy in a freshly generated verification link.
pub const LINK_ENTROPY_BYTES: usize = 20;

/// Generate an unguessable verification link from the OS random source.
pub fn generate_link() -> Result<VerificationLink, CryptoError> {
    let mut bytes = [0u8; LINK_ENTROPY_BYTES];
    getrandom::getrandom(&mut bytes).map_err(|e| CryptoError::Entropy(e.to_string()))?;
    // Hex output is always a valid link.
    VerificationLink::parse(hex::encode(bytes)).map_err(|e| CryptoError::Entropy(e.to_string()))
}
