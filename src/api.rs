//! HTTP API endpoints.
//!
//! Sessions created here behave exactly like WebSocket sessions, minus the
//! countdown, which needs a push channel.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::dispenser::DispenseError;
use crate::state::{AppState, ProviderHealth};
use crate::types::{Challenge, ChallengeMode, PoolStats, SessionId};
use crate::ws;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub stats: PoolStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeResponse {
    pub challenge: Challenge,
    pub mode: ChallengeMode,
    pub stats: PoolStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub msg: String,
}

fn error_response(status: StatusCode, code: &'static str, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { code, msg: msg.into() })).into_response()
}

fn session_not_found(id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "SESSION_NOT_FOUND",
        format!("No session {}", id),
    )
}

/// All routes except static files
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/sessions/{id}/next", post(next_challenge))
        .route("/api/sessions/{id}/stats", get(session_stats))
        .route("/api/providers/health", get(providers_health))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Act or Draw server is running",
    })
}

/// Create a session and assemble its first pool.
///
/// POST /api/sessions
pub async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionCreated>) {
    let session = state.create_session().await;
    let stats = session.prime().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id.clone(),
            stats,
        }),
    )
}

/// POST /api/sessions/{id}/next
pub async fn next_challenge(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(session) = state.get_session(&id).await else {
        return session_not_found(&id);
    };

    match session.next_challenge().await {
        Ok(dispensed) => Json(ChallengeResponse {
            challenge: dispensed.challenge,
            mode: dispensed.mode,
            stats: dispensed.stats,
        })
        .into_response(),
        Err(e @ DispenseError::NoChallengesAvailable) => {
            tracing::warn!("Session {}: {}", id, e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, "NO_CHALLENGES", e.to_string())
        }
    }
}

/// Pool counters plus the loading flag. Answers immediately during a refill.
///
/// GET /api/sessions/{id}/stats
pub async fn session_stats(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.get_session(&id).await {
        Some(session) => Json(session.status().await).into_response(),
        None => session_not_found(&id),
    }
}

/// DELETE /api/sessions/{id}
pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if state.remove_session(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        session_not_found(&id)
    }
}

/// Connectivity report for every configured remote upstream.
///
/// GET /api/providers/health
pub async fn providers_health(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderHealth>> {
    Json(state.provider_health().await)
}
