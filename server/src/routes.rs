//! HTTP route handlers for the game API.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use serde::Serialize;
use tracing::warn;

use everwhen::persist::LeaderboardEntry;
use everwhen::session::{Action, Event};
use everwhen::store::StoreError;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(remove_session))
        .route("/sessions/{id}/actions", post(dispatch_action))
        .route("/leaderboard", get(get_leaderboard))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct CreatedSession {
    session_id: String,
}

/// POST /api/sessions - register a new session.
async fn create_session(State(state): State<AppState>) -> Json<CreatedSession> {
    let session_id = state.store.create();
    Json(CreatedSession { session_id })
}

/// DELETE /api/sessions/:id - drop a session and its event channel.
async fn remove_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state.drop_channel(&id);
    if state.store.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// POST /api/sessions/:id/actions - apply one action.
///
/// The turn pipeline blocks on the narrator call, so dispatch runs on the
/// blocking pool. Events are returned in the response and mirrored onto the
/// session's SSE stream.
async fn dispatch_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(action): Json<Action>,
) -> Result<Json<Vec<Event>>, StatusCode> {
    let store = state.store.clone();
    let session_id = id.clone();
    let result = tokio::task::spawn_blocking(move || store.dispatch(&session_id, &action))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match result {
        Ok(events) => {
            crate::sse::broadcast_events(&state.channel(&id), &events);
            Ok(Json(events))
        }
        Err(StoreError::UnknownSession) => Err(StatusCode::NOT_FOUND),
        Err(StoreError::Busy) => Err(StatusCode::CONFLICT),
    }
}

/// GET /api/leaderboard - top scores without a session.
async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, StatusCode> {
    match state.store.top_scores(25) {
        Ok(entries) => Ok(Json(entries)),
        Err(err) => {
            warn!(error = %err, "leaderboard read failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
