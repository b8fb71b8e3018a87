//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/submit` | Hand one submission to the engine |
//! | `GET` | `/stats` | Current epoch snapshot |
//! | `GET` | `/winner` | Current winner (404 when none) |
//! | `POST` | `/reset` | Start a new epoch |
//! | `GET` | `/health` | Liveness and shutdown flag |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use buzzer_types::{StatsSnapshot, SubmitResponse, Submission};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{AppState, PROGRESS_LOG_EVERY};

// ---------------------------------------------------------------------------
// POST /submit
// ---------------------------------------------------------------------------

/// Decode a submission and hand it to the engine.
///
/// The body is parsed regardless of `Content-Type`. `is_winner` in the
/// reply reflects the winner slot at hand-off time, which may not yet
/// include this very record.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    let record: Submission = serde_json::from_slice(&body)?;
    let count = state.record_received();
    let user_id = record.participant_id;

    let is_winner = state.engine.submit(record);

    if count.checked_rem(PROGRESS_LOG_EVERY) == Some(0) {
        info!(received = count, "Processed responses");
    }

    Ok(Json(SubmitResponse {
        received: true,
        user_id,
        is_winner,
        response_count: count,
    }))
}

// ---------------------------------------------------------------------------
// GET /stats
// ---------------------------------------------------------------------------

/// Return a consistent snapshot of the current epoch.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.engine.get_stats())
}

// ---------------------------------------------------------------------------
// GET /winner
// ---------------------------------------------------------------------------

/// Body of a successful `GET /winner`.
#[derive(Debug, Serialize)]
pub struct WinnerResponse {
    /// The winning record.
    pub winner: Submission,
}

/// Return the winning record, or 404 while the round is undecided.
pub async fn winner(State(state): State<Arc<AppState>>) -> Result<Json<WinnerResponse>, ApiError> {
    state
        .engine
        .get_winner()
        .map(|winner| Json(WinnerResponse { winner }))
        .ok_or_else(|| ApiError::NotFound(String::from("no winner yet")))
}

// ---------------------------------------------------------------------------
// POST /reset
// ---------------------------------------------------------------------------

/// Close the current epoch and return the fresh snapshot.
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    let summary = state.engine.reset();
    debug!(previous_epoch = %summary.epoch_id, "Reset via API");
    Json(state.engine.get_stats())
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server answers.
    pub status: &'static str,
    /// Whether the engine has been shut down.
    pub shut_down: bool,
    /// Submissions received since process start.
    pub received: u64,
}

/// Liveness probe.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        shut_down: state.engine.is_shut_down(),
        received: state.received(),
    })
}
