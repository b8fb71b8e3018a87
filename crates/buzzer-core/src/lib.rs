//! Event ingestion and first-correct-answer arbitration for buzzer.
//!
//! Submissions flow through a bounded FIFO queue into a single
//! arbitration loop that counts them and claims the winner slot once per
//! epoch. When the queue is full the submitter arbitrates its own record
//! inline, so nothing is ever dropped.
//!
//! # Modules
//!
//! - [`arbiter`] -- The locked game state, the arbitration step, and the
//!   loop that drains the queue.
//! - [`config`] -- Configuration loading from `buzzer-config.yaml` into
//!   strongly-typed structs.
//! - [`engine`] -- [`Engine`], the handle collaborators hold.
//! - [`lifecycle`] -- Stop signal and ownership of background tasks.
//! - [`queue`] -- The bounded event queue with non-blocking enqueue.
//! - [`state`] -- Per-epoch game state and its invariants.
//!
//! [`Engine`]: engine::Engine

pub mod arbiter;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod queue;
mod reporter;
pub mod state;

pub use config::{BuzzerConfig, ConfigError, EngineConfig};
pub use engine::Engine;
pub use state::{ArbitrationPath, EpochSummary, Phase};
