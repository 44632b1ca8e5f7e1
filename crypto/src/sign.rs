//! Ed25519 signatures over proof claim identifiers.
//!
//! Keys and signatures travel as hex strings in configuration and in proof
//! payloads, so the helpers here speak hex.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::CryptoError;

/// Parse a 32-byte Ed25519 public key from hex.
pub fn parse_public_key_hex(key_hex: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(key_hex.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&arr).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Sign a message with a 32-byte seed, returning the signature as hex.
pub fn sign_message_hex(message: &[u8], seed: &[u8; 32]) -> String {
    let signing_key = SigningKey::from_bytes(seed);
    hex::encode(signing_key.sign(message).to_bytes())
}

/// Verify a hex signature against a message and public key.
///
/// Returns `false` for malformed hex or wrong-length signatures.
pub fn verify_signature_hex(message: &[u8], signature_hex: &str, key: &VerifyingKey) -> bool {
    let Ok(bytes) = hex::decode(signature_hex.trim_start_matches("0x")) else {
        return false;
    };
    let Ok(arr) = <[u8; 64]>::try_from(bytes.as_slice()) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(&arr)).is_ok()
}
