//! End-to-end workflow over the nullable collaborators.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use reval_chat::JoinRequestEvent;
use reval_crypto::sign_message_hex;
use reval_gate::{DeliveryMode, Gate, GateDeps, GateError, GateSettings, PollState};
use reval_nullables::{NullChat, NullClock, NullProofService, NullVerificationStore};
use reval_proof::{
    claim_identifier, AttestorVerifier, ProofApp, ProofVerifier, SessionStatus, TrustVerifier,
};
use reval_store::VerificationStore;
use reval_types::{GroupId, MemberId};

const PROVIDER: &str = "github-username";
const ATTESTOR_SEED: [u8; 32] = [11u8; 32];

struct World {
    gate: Gate,
    store: Arc<NullVerificationStore>,
    chat: Arc<NullChat>,
    proof: Arc<NullProofService>,
}

fn world(mode: DeliveryMode, verifier: Arc<dyn ProofVerifier>, proof: NullProofService) -> World {
    let clock = Arc::new(NullClock::default());
    let store = Arc::new(NullVerificationStore::with_clock(clock.clone()));
    let chat = Arc::new(NullChat::new());
    let proof = Arc::new(proof);
    let mut settings = GateSettings::new(
        "https://gate.example",
        ProofApp::new("app", "secret", PROVIDER),
    );
    settings.mode = mode;
    let gate = Gate::new(
        GateDeps {
            store: store.clone(),
            chat: chat.clone(),
            proof: proof.clone(),
            verifier,
            clock,
        },
        settings,
    );
    World {
        gate,
        store,
        chat,
        proof,
    }
}

fn attestor() -> Arc<dyn ProofVerifier> {
    let key = ed25519_dalek::SigningKey::from_bytes(&ATTESTOR_SEED).verifying_key();
    Arc::new(AttestorVerifier::new(PROVIDER, vec![key], 1).unwrap())
}

fn signed_proof(context: &str) -> Value {
    let params = r#"{"username":"octocat"}"#;
    let id = claim_identifier(PROVIDER, params, context);
    let sig = sign_message_hex(&hex::decode(&id).unwrap(), &ATTESTOR_SEED);
    json!({
        "identifier": id,
        "claimData": {
            "provider": PROVIDER,
            "parameters": params,
            "context": context,
            "identifier": id
        },
        "signatures": [sig]
    })
}

fn join_update() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "update_id": 1,
        "chat_join_request": {
            "chat": { "id": -100123, "type": "supergroup", "title": "Gated" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ada" },
            "user_chat_id": 42,
            "date": 1_700_000_000
        }
    }))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn poll_mode_admits_member() {
    let w = world(
        DeliveryMode::Poll,
        attestor(),
        NullProofService::new(),
    );

    let outcome = w.gate.handle_update(&join_update()).await.unwrap().unwrap();
    let link = outcome.record.verification_link.clone();
    assert_eq!(w.chat.messages().len(), 1);

    let session = w.gate.start_session(&link).await.unwrap();
    w.proof.push_status(SessionStatus::Pending);
    w.proof
        .push_status(SessionStatus::Successful(signed_proof(link.as_str())));

    assert!(w.gate.watch(&link, session.session_id.clone()));
    assert!(!w.gate.watch(&link, session.session_id.clone()));
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(w.gate.poll_state(&link), Some(PollState::Succeeded));
    assert!(w.store.get_by_link(&link).unwrap().verification_status);
    assert_eq!(
        w.chat.approvals(),
        vec![(GroupId::from("-100123"), MemberId::from("42"))]
    );
}

#[tokio::test(start_paused = true)]
async fn forged_proof_is_not_admitted_by_poller() {
    let w = world(DeliveryMode::Poll, attestor(), NullProofService::new());
    let outcome = w
        .gate
        .handle_join_request(&JoinRequestEvent {
            group_id: GroupId::from("G"),
            member_id: MemberId::from("M"),
        })
        .await
        .unwrap();
    let link = outcome.record.verification_link;
    let session = w.gate.start_session(&link).await.unwrap();
    w.proof
        .push_status(SessionStatus::Successful(signed_proof("someone-else")));

    w.gate.watch(&link, session.session_id);
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(matches!(
        w.gate.poll_state(&link),
        Some(PollState::CompletionFailed(_))
    ));
    assert!(!w.store.get_by_link(&link).unwrap().verification_status);
    assert_eq!(w.chat.approval_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn callback_mode_completes_once() {
    let w = world(DeliveryMode::Callback, attestor(), NullProofService::new());
    let outcome = w
        .gate
        .handle_join_request(&JoinRequestEvent {
            group_id: GroupId::from("G"),
            member_id: MemberId::from("M"),
        })
        .await
        .unwrap();
    let link = outcome.record.verification_link;

    let session = w.gate.start_session(&link).await.unwrap();
    assert!(w.gate.watch(&link, session.session_id));
    assert!(w.proof.requests()[0].callback_url.is_some());

    let proof = signed_proof(link.as_str());
    w.gate.complete(&link, &proof).await.unwrap();
    assert!(matches!(
        w.gate.complete(&link, &proof).await,
        Err(GateError::AlreadyVerified(_))
    ));

    // The fallback poll notices the completed record without querying.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(w.gate.poll_state(&link), Some(PollState::Succeeded));
    assert_eq!(w.proof.queries(), 0);
    assert_eq!(w.chat.approvals().len(), 1);
}

#[tokio::test]
async fn unproven_completion_needs_trust_mode() {
    let strict = world(DeliveryMode::Poll, attestor(), NullProofService::new());
    assert!(!strict.gate.accepts_unproven());

    let event = JoinRequestEvent {
        group_id: GroupId::from("G"),
        member_id: MemberId::from("M"),
    };
    let link = strict
        .gate
        .handle_join_request(&event)
        .await
        .unwrap()
        .record
        .verification_link;
    assert!(matches!(
        strict.gate.complete_unproven(&link).await,
        Err(GateError::ProofRequired(_))
    ));

    let trusting = world(DeliveryMode::Poll, Arc::new(TrustVerifier), NullProofService::new());
    let link = trusting
        .gate
        .handle_join_request(&event)
        .await
        .unwrap()
        .record
        .verification_link;
    trusting.gate.complete_unproven(&link).await.unwrap();
    assert!(trusting.store.get_by_link(&link).unwrap().verification_status);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_polls() {
    let w = world(DeliveryMode::Poll, attestor(), NullProofService::new());
    let link = w
        .gate
        .handle_join_request(&JoinRequestEvent {
            group_id: GroupId::from("G"),
            member_id: MemberId::from("M"),
        })
        .await
        .unwrap()
        .record
        .verification_link;
    let session = w.gate.start_session(&link).await.unwrap();
    w.gate.watch(&link, session.session_id);

    w.gate.shutdown();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(w.gate.poll_state(&link), Some(PollState::Cancelled));
    assert_eq!(w.proof.queries(), 0);
}

#[tokio::test]
async fn non_join_updates_are_ignored() {
    let w = world(DeliveryMode::Poll, attestor(), NullProofService::new());
    let update = serde_json::to_vec(&json!({
        "update_id": 2,
        "message": {
            "message_id": 1,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Ada" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ada" },
            "text": "/start"
        }
    }))
    .unwrap();
    assert!(w.gate.handle_update(&update).await.unwrap().is_none());
    assert_eq!(w.store.record_count().unwrap(), 0);
}
