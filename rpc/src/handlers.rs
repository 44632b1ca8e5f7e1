//! Request handlers.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use reval_gate::{parse_link, GateError};
use reval_proof::SessionId;

use crate::page::{self, Phase};
use crate::{ApiError, AppState};

// ── Request bodies ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteVerificationRequest {
    pub verification_link: String,
    #[serde(default)]
    pub proof: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub verification_link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusUrlRequest {
    pub verification_link: String,
    pub status_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub verification_link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub session_id: Option<String>,
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: String,
    pub request_url: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::InvalidRequest(e.body_text()))
}

// ── Webhook ──────────────────────────────────────────────────────────────

/// `POST /api/bot`. Always answers 200 so Telegram does not redeliver.
pub async fn bot_webhook(State(state): State<AppState>, raw: Bytes) -> Json<Value> {
    match state.gate.handle_update(&raw).await {
        Ok(_) => Json(json!({ "message": "Success" })),
        Err(e) => {
            tracing::error!(error = %e, "failed to process update");
            Json(json!({ "error": "Failed to process update", "details": e.to_string() }))
        }
    }
}

// ── Verification API ─────────────────────────────────────────────────────

/// `POST /api/completeVerification`
pub async fn complete_verification(
    State(state): State<AppState>,
    payload: Result<Json<CompleteVerificationRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = body(payload)?;
    let link = parse_link(&req.verification_link)?;
    state.gate.complete(&link, &req.proof).await?;
    Ok(Json(MessageResponse {
        message: "Verification completed successfully",
    }))
}

/// `POST /api/verify`, proof-less completion; refused unless in trust mode.
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = body(payload)?;
    let link = parse_link(&req.verification_link)?;
    state.gate.complete_unproven(&link).await?;
    Ok(Json(MessageResponse {
        message: "Verification successful",
    }))
}

/// `POST /api/updateStatusUrl`
pub async fn update_status_url(
    State(state): State<AppState>,
    payload: Result<Json<UpdateStatusUrlRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = body(payload)?;
    let link = parse_link(&req.verification_link)?;
    state.gate.update_status_url(&link, &req.status_url)?;
    Ok(Json(MessageResponse {
        message: "Status URL updated successfully",
    }))
}

/// `POST /api/session`
pub async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<StartSessionRequest>, JsonRejection>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let req = body(payload)?;
    let link = parse_link(&req.verification_link)?;
    let session = state.gate.start_session(&link).await?;
    Ok(Json(StartSessionResponse {
        session_id: session.session_id.to_string(),
        request_url: session.request_url,
    }))
}

/// `DELETE /api/session/:link`
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let link = parse_link(&raw)?;
    state.gate.record(&link)?;
    Ok(Json(CancelResponse {
        cancelled: state.gate.cancel_poll(&link),
    }))
}

/// `POST /api/callback/:link`, proof delivery in callback mode.
pub async fn proof_callback(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let proof = body(payload)?;
    let link = parse_link(&raw)?;
    tracing::debug!(%link, "proof callback received");
    state.gate.complete(&link, &proof).await?;
    Ok(Json(MessageResponse {
        message: "Verification completed successfully",
    }))
}

// ── Status page ──────────────────────────────────────────────────────────

/// `GET /:link`
pub async fn status_page(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let Ok(link) = parse_link(&raw) else {
        return not_found_page();
    };
    let record = match state.gate.record(&link) {
        Ok(record) => record,
        Err(GateError::NotFound(_)) => return not_found_page(),
        Err(e) => return error_page(e),
    };

    let phase = if record.verification_status {
        Phase::Succeeded
    } else {
        match query.session_id {
            None => Phase::Ready,
            Some(raw_session) => match SessionId::parse(raw_session) {
                Err(_) => Phase::Failed("Verification failed. Please try again.".into()),
                Ok(session_id) => {
                    state.gate.watch(&link, session_id);
                    state
                        .gate
                        .poll_state(&link)
                        .map(|s| Phase::from_poll(&s))
                        .unwrap_or(Phase::InProgress)
                }
            },
        }
    };

    Html(page::render(&record, state.gate.provider_id(), &phase)).into_response()
}

/// `POST /:link/start`, the page's Verify/Retry button.
pub async fn start_from_page(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let Ok(link) = parse_link(&raw) else {
        return not_found_page();
    };
    match state.gate.start_session(&link).await {
        Ok(session) => Redirect::to(&session.request_url).into_response(),
        Err(GateError::NotFound(_)) => not_found_page(),
        Err(GateError::AlreadyVerified(_)) => Redirect::to(&format!("/{link}")).into_response(),
        Err(e) => {
            let status = ApiError::from(e).status_code();
            match state.gate.record(&link) {
                Ok(record) => {
                    let phase = Phase::Failed(
                        "Could not start verification. Please try again.".into(),
                    );
                    (status, Html(page::render(&record, state.gate.provider_id(), &phase))).into_response()
                }
                Err(e) => error_page(e),
            }
        }
    }
}

fn not_found_page() -> Response {
    (StatusCode::NOT_FOUND, Html(page::render_not_found())).into_response()
}

fn error_page(e: GateError) -> Response {
    tracing::error!(error = %e, "status page failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Html(page::render_error())).into_response()
}

// ── Operations ───────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "reval" }))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.gate.metrics().encode(),
    )
}
