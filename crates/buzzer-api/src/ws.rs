//! `GET /ws/events`: live view of the current round.
//!
//! A new client first receives a `snapshot` frame carrying the current
//! [`StatsSnapshot`], then one frame per [`EngineNotification`]. The
//! subscription is taken before the snapshot is read, so no transition
//! falls between the two. A client that falls behind skips the lagged
//! notifications; the next snapshot it needs can be read from `/stats`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use buzzer_types::{EngineNotification, StatsSnapshot};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Greeting frame sent once per connection.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "snapshot")]
struct SnapshotFrame<'a> {
    stats: &'a StatsSnapshot,
}

/// Encode the greeting frame for `stats`.
pub fn snapshot_frame(stats: &StatsSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(&SnapshotFrame { stats })
}

/// Encode one notification frame.
pub fn notification_frame(note: &EngineNotification) -> serde_json::Result<String> {
    serde_json::to_string(note)
}

/// Upgrade to a `WebSocket` and stream the round to the client.
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_round(socket, state))
}

async fn stream_round(mut socket: WebSocket, state: Arc<AppState>) {
    let mut notes = state.engine.subscribe();
    let greeting = snapshot_frame(&state.engine.get_stats());
    if !send_frame(&mut socket, greeting).await {
        return;
    }
    debug!("Event stream opened");

    loop {
        let keep_going = tokio::select! {
            note = notes.recv() => match note {
                Ok(note) => send_frame(&mut socket, notification_frame(&note)).await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event stream lagged");
                    true
                }
                Err(RecvError::Closed) => false,
            },
            incoming = socket.recv() => answer_client(&mut socket, incoming).await,
        };
        if !keep_going {
            break;
        }
    }

    debug!("Event stream closed");
}

/// Send an encoded frame. `false` means the connection is done.
async fn send_frame(socket: &mut WebSocket, frame: serde_json::Result<String>) -> bool {
    match frame {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Dropping unencodable event frame");
            true
        }
    }
}

/// React to a client frame. Only pings and closes matter.
async fn answer_client(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, axum::Error>>,
) -> bool {
    match incoming {
        Some(Ok(Message::Ping(payload))) => socket.send(Message::Pong(payload)).await.is_ok(),
        Some(Ok(Message::Close(_)) | Err(_)) | None => false,
        Some(Ok(_)) => true,
    }
}
