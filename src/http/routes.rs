//! HTTP route definitions

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::game::SessionSummary;
use crate::util::time::uptime_secs;

/// Build the status router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", get(sessions_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    online_players: usize,
    queue_size: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
        online_players: state.matchmaker.online_players(),
        queue_size: state.matchmaker.queue_size(),
    })
}

// ============================================================================
// Session listing
// ============================================================================

async fn sessions_handler(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.sessions.summaries())
}
