//! Checking proofs before the gate trusts them.
//!
//! A proof reaches the gate either from the status endpoint or from a POST
//! to the callback URL. The callback is reachable by anyone, so the gate
//! never approves on the strength of "some JSON arrived"; it asks a
//! [`ProofVerifier`].

use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use reval_crypto::{parse_public_key_hex, sha256_hex, verify_signature_hex};
use reval_types::VerificationLink;

use crate::ProofError;

/// Decides whether a proof payload is authentic for a verification link.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, link: &VerificationLink, proof: &Value) -> Result<(), ProofError>;

    /// Short name for logs and configuration.
    fn name(&self) -> &'static str;
}

/// A proof as produced by the proof protocol.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub identifier: String,
    pub claim_data: ClaimData,
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub witnesses: Vec<Witness>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    pub provider: String,
    pub parameters: String,
    pub context: String,
    pub identifier: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub timestamp_s: u64,
    #[serde(default)]
    pub epoch: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Witness {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

/// Hex SHA-256 of `provider \n parameters \n context`.
pub fn claim_identifier(provider: &str, parameters: &str, context: &str) -> String {
    sha256_hex(format!("{provider}\n{parameters}\n{context}").as_bytes())
}

/// Accepts every proof.
///
/// Only for deployments where the callback endpoint is not exposed, or for
/// tests. Keeps the legacy `/api/verify` route enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustVerifier;

impl ProofVerifier for TrustVerifier {
    fn verify(&self, _link: &VerificationLink, _proof: &Value) -> Result<(), ProofError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "trust"
    }
}

/// Verifies a proof's claim against configured attestor keys.
///
/// A proof passes when:
/// 1. it is for the configured provider
/// 2. its claim context is exactly the verification link
/// 3. the identifier matches the hash of its claim
/// 4. at least `min_signatures` distinct configured attestors signed the
///    identifier
pub struct AttestorVerifier {
    provider_id: String,
    keys: Vec<VerifyingKey>,
    min_signatures: usize,
}

impl AttestorVerifier {
    pub fn new(
        provider_id: impl Into<String>,
        keys: Vec<VerifyingKey>,
        min_signatures: usize,
    ) -> Result<Self, ProofError> {
        if min_signatures == 0 {
            return Err(ProofError::Config(
                "min_attestor_signatures must be at least 1".into(),
            ));
        }
        if keys.len() < min_signatures {
            return Err(ProofError::Config(format!(
                "{} attestor keys configured but {} signatures required",
                keys.len(),
                min_signatures
            )));
        }
        Ok(Self {
            provider_id: provider_id.into(),
            keys,
            min_signatures,
        })
    }

    /// Build from hex-encoded Ed25519 public keys.
    pub fn from_hex_keys(
        provider_id: impl Into<String>,
        keys_hex: &[String],
        min_signatures: usize,
    ) -> Result<Self, ProofError> {
        let keys = keys_hex
            .iter()
            .map(|k| {
                parse_public_key_hex(k)
                    .map_err(|e| ProofError::Config(format!("attestor key {k}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(provider_id, keys, min_signatures)
    }

    fn count_attestors(&self, message: &[u8], signatures: &[String]) -> usize {
        let mut seen = HashSet::new();
        for (idx, key) in self.keys.iter().enumerate() {
            if seen.contains(key.as_bytes()) {
                continue;
            }
            if signatures
                .iter()
                .any(|sig| verify_signature_hex(message, sig, key))
            {
                seen.insert(*key.as_bytes());
                tracing::trace!(attestor = idx, "attestor signature accepted");
            }
        }
        seen.len()
    }
}

impl ProofVerifier for AttestorVerifier {
    fn verify(&self, link: &VerificationLink, proof: &Value) -> Result<(), ProofError> {
        let proof: Proof = serde_json::from_value(proof.clone())
            .map_err(|e| ProofError::Rejected(format!("malformed proof: {e}")))?;
        let claim = &proof.claim_data;

        if claim.provider != self.provider_id {
            return Err(ProofError::Rejected(format!(
                "proof is for provider {}, expected {}",
                claim.provider, self.provider_id
            )));
        }
        if claim.context != link.as_str() {
            return Err(ProofError::Rejected(
                "proof context does not match verification link".into(),
            ));
        }

        let expected = claim_identifier(&claim.provider, &claim.parameters, &claim.context);
        let identifier = proof.identifier.trim_start_matches("0x").to_ascii_lowercase();
        let claimed = claim.identifier.trim_start_matches("0x").to_ascii_lowercase();
        if identifier != expected || claimed != expected {
            return Err(ProofError::Rejected("claim identifier mismatch".into()));
        }

        let message = hex::decode(&expected)
            .map_err(|e| ProofError::Rejected(format!("claim identifier: {e}")))?;
        let have = self.count_attestors(&message, &proof.signatures);
        if have < self.min_signatures {
            return Err(ProofError::Rejected(format!(
                "insufficient attestor signatures: have {have}, need {}",
                self.min_signatures
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "attestor"
    }
}
