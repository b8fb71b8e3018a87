//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `POST /submit` -- hand a submission to the engine
/// - `GET /stats` -- current epoch snapshot
/// - `GET /winner` -- current winner
/// - `POST /reset` -- start a new epoch
/// - `GET /health` -- liveness probe
/// - `GET /ws/events` -- `WebSocket` notification stream
///
/// Any other method on a known path answers 405.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/submit", post(handlers::submit))
        .route("/stats", get(handlers::stats))
        .route("/winner", get(handlers::winner))
        .route("/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .route("/ws/events", get(ws::ws_events))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
