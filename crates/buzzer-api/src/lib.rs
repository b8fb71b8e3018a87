//! HTTP and `WebSocket` boundary for the buzzer engine.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Submission endpoint** (`POST /submit`) that decodes a JSON record
//!   and hands it to the shared [`Engine`](buzzer_core::Engine)
//! - **Control endpoints** for reading stats and the winner, resetting
//!   the epoch, and health checks
//! - **`WebSocket` endpoint** (`/ws/events`) streaming winner and reset
//!   notifications via [`tokio::sync::broadcast`]
//!
//! Malformed input is rejected here with 400 and never reaches the
//! engine.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, bind, serve};
pub use state::AppState;
