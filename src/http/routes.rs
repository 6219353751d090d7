use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // View
        .route("/view", get(handlers::get_view))
        .route("/frame", get(handlers::get_frame))
        // Session
        .route("/session/username", post(handlers::set_username))
        // Compose
        .route("/compose/draft", put(handlers::edit_draft))
        .route(
            "/compose/media",
            post(handlers::attach_media).delete(handlers::remove_media),
        )
        // Messages
        .route("/messages", post(handlers::send_message))
        .route("/messages/:message_id/copy", post(handlers::copy_code))
        // Settings
        .route("/settings", put(handlers::update_settings))
        .route("/settings/toggle", post(handlers::toggle_settings))
        .route("/voices/refresh", post(handlers::refresh_voices))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // Local control API; any origin may drive it
        .layer(CorsLayer::permissive())
        .with_state(state)
}
