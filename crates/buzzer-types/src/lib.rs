//! Shared type definitions for the buzzer engine.
//!
//! This crate is the single source of truth for the values that cross
//! crate boundaries: the submission record producers hand to the engine,
//! the statistics snapshot readers get back, and the notifications pushed
//! to live subscribers. Types flow downstream to `TypeScript` via `ts-rs`
//! for dashboard clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for epoch identifiers
//! - [`submission`] -- The submission record and HTTP response shape
//! - [`stats`] -- Point-in-time statistics snapshot
//! - [`notification`] -- Engine notifications for live subscribers

pub mod ids;
pub mod notification;
pub mod stats;
pub mod submission;

// Re-export all public types at crate root for convenience.
pub use ids::EpochId;
pub use notification::EngineNotification;
pub use stats::{StatsSnapshot, WinnerSummary, correct_percentage};
pub use submission::{SubmitResponse, Submission};
