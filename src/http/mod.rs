//! HTTP control API for a running chat session
//!
//! This module exposes the session's actions over a local REST API:
//! - GET /health - Health check
//! - GET /view - Current view state (JSON)
//! - GET /frame - Current rendered frame (text)
//! - POST /session/username - Join with a username
//! - PUT /compose/draft - Replace the draft
//! - POST /compose/media - Stage a local file as attachment
//! - DELETE /compose/media - Discard the attachment
//! - POST /messages - Send the draft (or the given text)
//! - POST /messages/:id/copy - Copy a code block
//! - PUT /settings - Update speech settings
//! - POST /settings/toggle - Toggle the settings panel
//! - POST /voices/refresh - Reload the voice list

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
