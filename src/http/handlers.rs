use super::state::AppState;
use crate::error::ChatError;
use crate::session::{Action, SettingsUpdate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaRequest {
    /// Path of a local image or video file
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Replaces the draft before sending when present
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    pub enabled: Option<bool>,
    pub voice: Option<String>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn status_for(error: &ChatError) -> StatusCode {
    match error {
        ChatError::Validation(_) | ChatError::Io(_) => StatusCode::BAD_REQUEST,
        ChatError::Connection(_) | ChatError::Synthesis(_) => StatusCode::BAD_GATEWAY,
        ChatError::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Respond with the updated view, or the error
fn respond(state: &AppState, result: Result<(), ChatError>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(state.session.view())).into_response(),
        Err(e) => {
            warn!("Request rejected: {}", e);
            (
                status_for(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn dispatch(state: &AppState, action: Action) -> Response {
    let result = state.session.dispatch(action).await;
    respond(state, result)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /view
pub async fn get_view(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.view())
}

/// GET /frame
pub async fn get_frame(State(state): State<AppState>) -> impl IntoResponse {
    state.session.frame()
}

/// POST /session/username
pub async fn set_username(
    State(state): State<AppState>,
    Json(req): Json<UsernameRequest>,
) -> Response {
    info!("Joining as {}", req.username.trim());
    dispatch(&state, Action::SetUsername(req.username)).await
}

/// PUT /compose/draft
pub async fn edit_draft(State(state): State<AppState>, Json(req): Json<DraftRequest>) -> Response {
    dispatch(&state, Action::EditDraft(req.text)).await
}

/// POST /compose/media
pub async fn attach_media(
    State(state): State<AppState>,
    Json(req): Json<MediaRequest>,
) -> Response {
    let result = state.session.upload_media(&req.path).await;
    respond(&state, result)
}

/// DELETE /compose/media
pub async fn remove_media(State(state): State<AppState>) -> Response {
    dispatch(&state, Action::RemoveMedia).await
}

/// POST /messages
/// Send the current draft, or `text` when given
pub async fn send_message(
    State(state): State<AppState>,
    req: Option<Json<SendRequest>>,
) -> Response {
    let result = match req.and_then(|Json(req)| req.text) {
        Some(text) => state.session.send_text(text).await,
        None => state.session.dispatch(Action::SendMessage).await,
    };
    respond(&state, result)
}

/// POST /messages/:message_id/copy
pub async fn copy_code(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Response {
    dispatch(&state, Action::CopyCode(message_id)).await
}

/// PUT /settings
/// Apply every field that is present; a rejected field leaves all unchanged
pub async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<SettingsRequest>,
) -> Response {
    let update = SettingsUpdate {
        enabled: req.enabled,
        voice: req.voice,
        rate: req.rate,
        pitch: req.pitch,
        volume: req.volume,
    };
    dispatch(&state, Action::UpdateSettings(update)).await
}

/// POST /settings/toggle
pub async fn toggle_settings(State(state): State<AppState>) -> Response {
    dispatch(&state, Action::ToggleSettings).await
}

/// POST /voices/refresh
pub async fn refresh_voices(State(state): State<AppState>) -> Response {
    dispatch(&state, Action::RefreshVoices).await
}
