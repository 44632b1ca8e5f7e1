//! Router-level tests over the nullable collaborators.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use ed25519_dalek::SigningKey;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use reval_chat::JoinRequestEvent;
use reval_gate::{DeliveryMode, Gate, GateDeps, GateSettings};
use reval_nullables::{NullChat, NullClock, NullProofService, NullVerificationStore};
use reval_proof::{
    AttestorVerifier, ProofApp, ProofVerifier, SessionId, SessionStatus, TrustVerifier,
};
use reval_rpc::{router, AppState};
use reval_store::VerificationStore;
use reval_types::{GroupId, MemberId, VerificationLink};

struct Harness {
    app: Router,
    gate: Arc<Gate>,
    store: Arc<NullVerificationStore>,
    chat: Arc<NullChat>,
    proof: Arc<NullProofService>,
}

fn harness(verifier: Arc<dyn ProofVerifier>, mode: DeliveryMode) -> Harness {
    let clock = Arc::new(NullClock::default());
    let store = Arc::new(NullVerificationStore::with_clock(clock.clone()));
    let chat = Arc::new(NullChat::new());
    let proof = Arc::new(NullProofService::new());
    let mut settings =
        GateSettings::new("https://gate.example", ProofApp::new("app", "secret", "github"));
    settings.mode = mode;
    let gate = Arc::new(Gate::new(
        GateDeps {
            store: store.clone(),
            chat: chat.clone(),
            proof: proof.clone(),
            verifier,
            clock,
        },
        settings,
    ));
    Harness {
        app: router(AppState::new(gate.clone())),
        gate,
        store,
        chat,
        proof,
    }
}

fn trusting() -> Harness {
    harness(Arc::new(TrustVerifier), DeliveryMode::Poll)
}

fn strict() -> Harness {
    let key = SigningKey::from_bytes(&[5u8; 32]).verifying_key();
    harness(
        Arc::new(AttestorVerifier::new("github", vec![key], 1).unwrap()),
        DeliveryMode::Poll,
    )
}

async fn seed(h: &Harness) -> VerificationLink {
    h.gate
        .handle_join_request(&JoinRequestEvent {
            group_id: GroupId::from("-100123"),
            member_id: MemberId::from("42"),
        })
        .await
        .unwrap()
        .record
        .verification_link
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn json_of(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn health_reports_service() {
    let h = trusting();
    let (status, body) = send(&h.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "ok": true, "service": "reval" }));
}

#[tokio::test]
async fn complete_twice_then_already_verified() {
    let h = trusting();
    let link = seed(&h).await;
    let req = json!({ "verificationLink": link.as_str(), "proof": { "any": 1 } });

    let (status, body) = send(&h.app, Method::POST, "/api/completeVerification", Some(req.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["message"], "Verification completed successfully");

    let (status, body) = send(&h.app, Method::POST, "/api/completeVerification", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&body)["error"], "Already verified");
    assert_eq!(h.chat.approvals().len(), 1);
}

#[tokio::test]
async fn unknown_link_is_404_without_writes() {
    let h = trusting();
    let writes = h.store.writes();
    let req = json!({ "verificationLink": "nope", "proof": {} });
    let (status, body) = send(&h.app, Method::POST, "/api/completeVerification", Some(req)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_of(&body)["error"], "Verification not found");
    assert_eq!(h.store.writes(), writes);
}

#[tokio::test]
async fn forged_proof_is_400_in_attestor_mode() {
    let h = strict();
    let link = seed(&h).await;
    let req = json!({ "verificationLink": link.as_str(), "proof": { "identifier": "x" } });
    let (status, body) = send(&h.app, Method::POST, "/api/completeVerification", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&body)["error"], "Invalid proof");
    assert!(!h.store.get_by_link(&link).unwrap().verification_status);
}

#[tokio::test]
async fn legacy_verify_only_in_trust_mode() {
    let h = strict();
    let link = seed(&h).await;
    let req = json!({ "verificationLink": link.as_str() });
    let (status, body) = send(&h.app, Method::POST, "/api/verify", Some(req.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&body)["error"], "Proof required");
    assert!(!h.store.get_by_link(&link).unwrap().verification_status);

    let h = trusting();
    let link = seed(&h).await;
    let req = json!({ "verificationLink": link.as_str() });
    let (status, body) = send(&h.app, Method::POST, "/api/verify", Some(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["message"], "Verification successful");
}

#[tokio::test]
async fn update_status_url() {
    let h = trusting();
    let link = seed(&h).await;
    let req = json!({ "verificationLink": link.as_str(), "statusUrl": "https://status.example/1" });
    let (status, _) = send(&h.app, Method::POST, "/api/updateStatusUrl", Some(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.store.get_by_link(&link).unwrap().reclaim_status_url.as_deref(),
        Some("https://status.example/1")
    );

    let req = json!({ "verificationLink": "missing", "statusUrl": "x" });
    let (status, _) = send(&h.app, Method::POST, "/api/updateStatusUrl", Some(req)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_400() {
    let h = trusting();
    let (status, body) = send(&h.app, Method::POST, "/api/completeVerification", Some(json!({ "proof": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_of(&body)["error"].is_string());
}

#[tokio::test]
async fn webhook_always_answers_200() {
    let h = trusting();
    let update = json!({
        "update_id": 1,
        "chat_join_request": {
            "chat": { "id": -100123, "type": "supergroup", "title": "Gated" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ada" },
            "user_chat_id": 42,
            "date": 1_700_000_000
        }
    });
    let (status, body) = send(&h.app, Method::POST, "/api/bot", Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["message"], "Success");
    assert_eq!(h.chat.messages().len(), 1);
    assert_eq!(h.store.record_count().unwrap(), 1);

    let (status, body) = send(&h.app, Method::POST, "/api/bot", Some(json!({ "junk": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["error"], "Failed to process update");
}

#[tokio::test]
async fn session_api_starts_session() {
    let h = trusting();
    let link = seed(&h).await;
    let req = json!({ "verificationLink": link.as_str() });
    let (status, body) = send(&h.app, Method::POST, "/api/session", Some(req)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_of(&body);
    assert!(body["sessionId"].as_str().unwrap().starts_with("null-session-"));
    assert!(h.store.get_by_link(&link).unwrap().reclaim_status_url.is_some());
}

#[tokio::test]
async fn proof_service_outage_is_502() {
    let h = trusting();
    h.proof.set_fail_create(true);
    let link = seed(&h).await;
    let req = json!({ "verificationLink": link.as_str() });
    let (status, _) = send(&h.app, Method::POST, "/api/session", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn status_page_variants() {
    let h = trusting();
    let (status, body) = send(&h.app, Method::GET, "/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("not found or expired"));

    let link = seed(&h).await;
    let (status, body) = send(&h.app, Method::GET, &format!("/{link}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Verify with Reclaim"));
    assert!(body.contains("Group ID: -100123"));
}

#[tokio::test(start_paused = true)]
async fn status_page_drives_polling() {
    let h = trusting();
    let link = seed(&h).await;
    h.proof.push_status(SessionStatus::Successful(json!({})));

    let uri = format!("/{link}?sessionId=s-1");
    let (_, body) = send(&h.app, Method::GET, &uri, None).await;
    assert!(body.contains("Verification in progress"));

    tokio::time::sleep(std::time::Duration::from_secs(6)).await;
    let (_, body) = send(&h.app, Method::GET, &uri, None).await;
    assert!(body.contains("Verification successful"));
    assert_eq!(h.proof.queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn callback_mode_page_offers_retry_when_session_fails() {
    let h = harness(Arc::new(TrustVerifier), DeliveryMode::Callback);
    let link = seed(&h).await;
    h.proof.push_status(SessionStatus::Failed("declined".into()));

    let uri = format!("/{link}?sessionId=s-1");
    let (_, body) = send(&h.app, Method::GET, &uri, None).await;
    assert!(body.contains("Verification in progress"));

    tokio::time::sleep(std::time::Duration::from_secs(6)).await;
    let (_, body) = send(&h.app, Method::GET, &uri, None).await;
    assert!(body.contains("Retry Verification"));
    assert!(!body.contains("http-equiv=\"refresh\""));
    assert_eq!(h.proof.queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn callback_mode_page_times_out_without_callback() {
    let h = harness(Arc::new(TrustVerifier), DeliveryMode::Callback);
    let link = seed(&h).await;

    let uri = format!("/{link}?sessionId=s-1");
    send(&h.app, Method::GET, &uri, None).await;
    tokio::time::sleep(std::time::Duration::from_secs(700)).await;

    let (_, body) = send(&h.app, Method::GET, &uri, None).await;
    assert!(body.contains("Verification timed out"));
    assert!(body.contains("Retry Verification"));
}

#[tokio::test]
async fn status_page_names_configured_provider() {
    let h = trusting();
    let link = seed(&h).await;
    let (status, body) = send(&h.app, Method::GET, &format!("/{link}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Verification Type: via github"));
}

#[tokio::test]
async fn page_button_redirects_to_proof_flow() {
    let h = trusting();
    let link = seed(&h).await;
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/{link}/start"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with(NullProofService::BASE_URL));
}

#[tokio::test]
async fn cancel_session_endpoint() {
    let h = harness(Arc::new(TrustVerifier), DeliveryMode::Poll);
    let link = seed(&h).await;
    h.gate.watch(&link, SessionId::parse("s-9").unwrap());
    let (status, body) = send(&h.app, Method::DELETE, &format!("/api/session/{link}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["cancelled"], true);

    let (status, _) = send(&h.app, Method::DELETE, "/api/session/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_exposes_counters() {
    let h = trusting();
    seed(&h).await;
    let (status, body) = send(&h.app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("reval_records_created_total 1"));
}
