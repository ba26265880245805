use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::session::SessionState;
use crate::state::AppState;

/// GET /health
/// Returns service status plus whether the startup session check has finished.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let session = match state.session.snapshot() {
        SessionState::Initializing => "initializing",
        SessionState::Anonymous => "anonymous",
        SessionState::Authenticated { .. } => "authenticated",
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jobhunt-api",
        "session": session
    }))
}
