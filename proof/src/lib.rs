//! Client side of the third-party proof protocol.
//!
//! The protocol itself is external. From the gate's point of view it offers
//! two calls:
//! - `POST /api/sdk/init/session` with a signed [`ProofRequest`], answered by
//!   a session id and the URL the member has to open
//! - `GET /api/sdk/session/{sessionId}`, answered by the session status and,
//!   once successful, the proof
//!
//! Proofs arriving from either path are checked by a [`ProofVerifier`]
//! before the gate trusts them.

pub mod client;
pub mod error;
pub mod request;
pub mod types;
pub mod verifier;

pub use client::{ProofHttpClient, ProofService};
pub use error::ProofError;
pub use request::ProofApp;
pub use types::{ProofRequest, SessionHandle, SessionId, SessionStatus};
pub use verifier::{claim_identifier, AttestorVerifier, Proof, ProofVerifier, TrustVerifier};
